//! Typed configuration surface for every option enumerated in the engine's
//! external interface. Each knob is a tagged enum or a plain numeric field —
//! never a runtime string — per the "configurable enumerations" design note.

use std::collections::HashSet;

use crate::grammar::RuleId;

/// Argument-filling order for a rule's `tofill` list. For binary rules all
/// four orderings degenerate to a choice of which argument is filled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrdering {
  KeyDriven,
  LeftToRight,
  RightToLeft,
  HeadDriven,
}

impl Default for KeyOrdering {
  fn default() -> Self {
    KeyOrdering::KeyDriven
  }
}

/// Decoded form of the `packing` bitmask option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackingMode {
  pub equivalence: bool,
  pub proactive: bool,
  pub retroactive: bool,
  pub selective_unpack: bool,
  pub no_unpack: bool,
}

impl PackingMode {
  pub const EQUIVALENCE: u32 = 1 << 0;
  pub const PROACTIVE: u32 = 1 << 1;
  pub const RETROACTIVE: u32 = 1 << 2;
  pub const SELECTIVE_UNPACK: u32 = 1 << 3;
  pub const NO_UNPACK: u32 = 1 << 7;

  pub fn from_bits(bits: u32) -> Self {
    Self {
      equivalence: bits & Self::EQUIVALENCE != 0,
      proactive: bits & Self::PROACTIVE != 0,
      retroactive: bits & Self::RETROACTIVE != 0,
      selective_unpack: bits & Self::SELECTIVE_UNPACK != 0,
      no_unpack: bits & Self::NO_UNPACK != 0,
    }
  }

  pub fn none() -> Self {
    Self::default()
  }

  /// True if any packing action (equivalence/proactive/retroactive) is on.
  pub fn packing_enabled(&self) -> bool {
    self.equivalence || self.proactive || self.retroactive
  }
}

/// All recognised parser options, with the defaults the engine falls back
/// to when a grammar or caller leaves a field unset.
#[derive(Debug, Clone)]
pub struct Options {
  /// Packing bitmask, decoded.
  pub packing: PackingMode,
  /// Stop after N trees in non-packing mode. 0 = unlimited.
  /// `opt_packing` overrides this and forces exhaustive parsing (§9).
  pub nsolutions: usize,
  /// Enable hyperactive active-edge scheduling.
  pub hyper: bool,
  /// Rules for which hyperactive scheduling is disabled even if `hyper` is
  /// on globally (the `depressive-rules` override).
  pub depressive_rules: HashSet<RuleId>,
  /// Length of the unification quickcheck vector. 0 disables it.
  pub nqc_unif: usize,
  /// Length of the subsumption quickcheck vector. 0 disables it.
  pub nqc_subs: usize,
  pub key: KeyOrdering,
  /// Enable the shaping filter (remaining-arity-fits-the-chart check).
  pub shaping: bool,
  pub pedgelimit: Option<usize>,
  pub memlimit: Option<usize>,
  pub timeout: Option<std::time::Duration>,
  /// Grandparent depth for selective-unpacking scoring.
  pub gplevel: usize,
  /// Treat input as a word lattice: enforce path-set compatibility.
  pub lattice: bool,
  /// Enable the rule filter.
  pub filter: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      packing: PackingMode::none(),
      nsolutions: 0,
      hyper: true,
      depressive_rules: HashSet::new(),
      nqc_unif: 0,
      nqc_subs: 0,
      key: KeyOrdering::default(),
      shaping: true,
      pedgelimit: None,
      memlimit: None,
      timeout: None,
      gplevel: 3,
      lattice: false,
      filter: true,
    }
  }
}

impl Options {
  pub fn hyperactive_for_rule(&self, rule: RuleId) -> bool {
    self.hyper && !self.depressive_rules.contains(&rule)
  }

  /// §9 open question: `opt_packing` forces exhaustive parsing regardless of
  /// `nsolutions`, so the non-packing result-limit check never applies once
  /// any packing action is enabled.
  pub fn nsolutions_applies(&self) -> bool {
    !self.packing.packing_enabled()
  }
}
