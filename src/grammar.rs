//! The `Grammar` external interface (§3, §6) and the plain data describing
//! one grammar rule.
//!
//! Everything that actually builds a grammar — parsing a rule file,
//! constructing the type hierarchy, computing GLBs — is out of scope here;
//! this module only describes the shape a grammar must expose so the
//! parsing engine can drive it.

use crate::config::KeyOrdering;
use crate::fs::{AttrId, QcVector, TypeId};
use crate::model::StochasticModel;

/// Stable non-negative integer code for a rule, supplied by the grammar.
pub type RuleId = u32;

/// Which class of rule this is; determines which items it may combine with
/// (item.rs's `compatible_with_rule`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTrait {
  Infl,
  Lex,
  Syntax,
}

/// One grammar rule: its arity, argument-filling order, and the
/// precomputed quickcheck vectors for each of its own arguments.
///
/// Rules never hold a feature-structure handle directly — `ty` is the type
/// code of the rule's own template; a session instantiates it into an
/// actual `Fs` via `FeatureStructure::instantiate` when it needs one, since
/// `Fs` handles only make sense inside a particular session's arena.
#[derive(Debug, Clone)]
pub struct Rule {
  pub id: RuleId,
  pub ty: TypeId,
  pub trait_: RuleTrait,
  pub arity: usize,
  /// Canonical argument-filling order, e.g. `[1, 0, 2]` to fill the second
  /// argument first. Always a permutation of `0..arity`.
  pub tofill: Vec<usize>,
  pub hyperactive: bool,
  pub spanning_only: bool,
  /// `qc_unif[i]` is the quickcheck vector of this rule's own `i`-th
  /// argument, computed once when the grammar is built.
  pub qc_unif: Vec<QcVector>,
  /// If set, results built from this rule are restricted to this type
  /// before being used as a packing key (the rule-level override of
  /// `Grammar::packing_restrictor`).
  pub packing_restrict: Option<TypeId>,
}

impl Rule {
  /// Next (unfilled) argument position in `tofill`'s order, if any are left
  /// after `nfilled` have already been combined.
  pub fn next_arg(&self, nfilled: usize) -> Option<usize> {
    self.tofill.get(nfilled).copied()
  }

  /// First argument position in filling order; used by the spanning-only
  /// start/end checks (§4.A).
  pub fn first_arg(&self) -> Option<usize> {
    self.tofill.first().copied()
  }

  pub fn last_arg(&self) -> Option<usize> {
    self.tofill.last().copied()
  }

  /// Whether an active item built from this rule extends to the left
  /// (consumes passives before its current `start`, shrinking `start` as it
  /// fills) or to the right (consumes passives after its current `end`).
  /// Filling the rightmost syntactic argument first leaves the item's known
  /// span on the right, still needing daughters to its left; filling the
  /// leftmost argument first is the mirror case.
  ///
  /// Assumes `tofill` is monotonic in the argument index, true of all four
  /// configured key orderings for unary and binary rules. A head-driven
  /// rule whose head sits strictly between the first and last argument of a
  /// ternary-or-higher rule has no single extension direction and is out of
  /// scope here (see DESIGN.md).
  pub fn left_extending(&self) -> bool {
    match (self.tofill.first(), self.tofill.last()) {
      (Some(first), Some(last)) => first > last,
      _ => false,
    }
  }
}

/// Compute the canonical `tofill` order for a rule of the given arity under
/// a key ordering. `head_index` is consulted only for `HeadDriven`; for the
/// other three orderings it is ignored.
pub fn tofill_order(key: KeyOrdering, arity: usize, head_index: Option<usize>) -> Vec<usize> {
  match key {
    KeyOrdering::LeftToRight => (0..arity).collect(),
    KeyOrdering::RightToLeft => (0..arity).rev().collect(),
    KeyOrdering::KeyDriven | KeyOrdering::HeadDriven => {
      let head = head_index.unwrap_or(0).min(arity.saturating_sub(1));
      let mut order = vec![head];
      order.extend((0..arity).filter(|&i| i != head));
      order
    }
  }
}

/// Which rule classes a caller wants to iterate over — used by lexical
/// processing to run only inflectional rules, or only lexical ones, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleActivation {
  InflOnly,
  LexAndInfl,
  SyntaxOnly,
  All,
}

impl RuleActivation {
  pub fn admits(&self, t: RuleTrait) -> bool {
    match self {
      RuleActivation::InflOnly => t == RuleTrait::Infl,
      RuleActivation::LexAndInfl => t == RuleTrait::Infl || t == RuleTrait::Lex,
      RuleActivation::SyntaxOnly => t == RuleTrait::Syntax,
      RuleActivation::All => true,
    }
  }
}

/// The external grammar interface (§6). `F` is the feature-structure engine
/// this grammar's rules are expressed over.
pub trait Grammar<F: crate::fs::FeatureStructure> {
  /// Iterate over rules admitted by `activation`.
  fn rules(&self, activation: RuleActivation) -> Box<dyn Iterator<Item = &Rule> + '_>;

  fn rule(&self, id: RuleId) -> &Rule;

  /// Rule filter: can `daughter`'s result ever unify into `mother`'s `arg`-th
  /// argument? Precomputed at grammar build time.
  fn filter_compatible(&self, mother: RuleId, arg: usize, daughter: RuleId) -> bool;

  /// Subsumption-filter variant of the above: can the result of `a` ever
  /// subsume (or be subsumed by) the result of `b`, in each direction?
  fn subsumption_filter_compatible(&self, a: RuleId, b: RuleId) -> (bool, bool);

  /// Attributes deleted from the surviving structure when a passive result
  /// is built (`unify_restrict`'s `del_attrs`, §4.D).
  fn deleted_daughters(&self) -> &[AttrId];

  /// Default type results are restricted to before use as a packing key,
  /// when a rule does not declare its own override.
  fn packing_restrictor(&self) -> Option<TypeId>;

  /// Types a spanning item's fs must unify with to count as a parse.
  fn root_types(&self) -> &[TypeId];

  /// The log-linear scoring model, if one is loaded.
  fn stochastic_model(&self) -> Option<&dyn StochasticModel<F>>;
}
