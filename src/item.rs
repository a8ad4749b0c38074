//! The item model (§3, §4.A): input, lexical, and phrasal chart items.
//!
//! All three variants share one set of bookkeeping fields (id, span,
//! activity, packing/blocking state, cached quickcheck vectors) and differ
//! only in what they carry as payload — so, unlike the class hierarchy this
//! is grounded on, `Item` is one struct with an enum payload rather than a
//! trait object hierarchy. Items never own other items directly: daughters
//! and parents are [`ItemId`] handles into the owning [`crate::session::Session`]'s
//! arena, so the item graph can be cyclic (`parents` vs. `daughters`)
//! without any reference counting.
//!
//! Lexical processing — tokenizing, tagging, lexicon lookup, and any
//! multi-word stem bookkeeping — is out of scope (§1): by the time a
//! lexical item reaches this crate it is already a complete, passive item
//! ready to be postulated against.

use std::collections::HashSet;

use crate::config::Options;
use crate::fs::{FeatureStructure, TypeId};
use crate::grammar::{Grammar, Rule, RuleId, RuleTrait};
use crate::fs::QcVector;

pub type ItemId = u32;

/// Combine two items' lattice path-id sets the way a new derivation built
/// from both should: an empty set means "unconstrained", so it defers to
/// the other side; two non-empty sets narrow to their intersection, the
/// paths both daughters actually agree on.
pub(crate) fn combine_path_ids(a: &HashSet<u32>, b: &HashSet<u32>) -> HashSet<u32> {
  if a.is_empty() {
    b.clone()
  } else if b.is_empty() {
    a.clone()
  } else {
    a.intersection(b).copied().collect()
  }
}

/// Which class of rule may combine with this item (§4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemTrait {
  Input,
  Infl,
  Lex,
  Syntax,
}

/// Packing block level (§4.G). `None` items schedule normally; `Frosted`
/// items still count toward the forest but never seed new derivations;
/// `Frozen` items, and everything reachable from them via `parents`, are
/// dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
  None,
  Frosted,
  Frozen,
}

impl Blocked {
  pub fn is_blocked(&self) -> bool {
    !matches!(self, Blocked::None)
  }

  pub fn is_frozen(&self) -> bool {
    matches!(self, Blocked::Frozen)
  }

  pub fn is_frosted(&self) -> bool {
    matches!(self, Blocked::Frosted)
  }
}

/// Token class of an input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClass {
  Skip,
  Word,
  Stem,
  HpsgType(TypeId),
}

/// Payload of an input item: a leaf with no feature structure at all,
/// consumed only by lexical items, never combined with a rule directly.
#[derive(Debug, Clone)]
pub struct InputData {
  pub surface: String,
  pub base_form: String,
  pub token_class: TokenClass,
  pub pos_tags: Vec<TypeId>,
  pub inflection_rules: Vec<RuleId>,
  /// Lattice path-id set assigned by upstream lexical processing (glossary
  /// "lattice mode"): which alternative token path(s) this input lives on.
  /// Empty when the input isn't a lattice (the common case).
  pub path_ids: HashSet<u32>,
}

/// Payload of a lexical item: a leaf carrying the lexicon entry's "full" fs
/// and its "restricted" packing fs (§3).
#[derive(Debug, Clone)]
pub struct LexicalData<F: FeatureStructure> {
  pub stem: String,
  pub fs: F::Fs,
  pub restricted_fs: F::Fs,
}

/// Payload of a phrasal item: the rule that built it and its fs.
#[derive(Debug, Clone)]
pub struct PhrasalData<F: FeatureStructure> {
  pub rule: RuleId,
  pub fs: F::Fs,
}

#[derive(Debug, Clone)]
pub enum ItemKind<F: FeatureStructure> {
  Input(InputData),
  Lexical(LexicalData<F>),
  Phrasal(PhrasalData<F>),
}

/// One chart item. See module docs for the ownership model.
#[derive(Debug, Clone)]
pub struct Item<F: FeatureStructure> {
  pub id: ItemId,
  pub start: usize,
  pub end: usize,
  pub external_start: usize,
  pub external_end: usize,
  pub trait_: ItemTrait,
  /// Remaining argument positions to fill, in the order they will be
  /// filled. Empty means passive.
  pub tofill: Vec<usize>,
  pub nfilled: usize,
  pub inflrs_todo: Vec<RuleId>,
  pub daughters: Vec<ItemId>,
  pub parents: Vec<ItemId>,
  pub packed: Vec<ItemId>,
  pub blocked: Blocked,
  pub qc_unif: QcVector,
  pub qc_subs: QcVector,
  /// Lattice path-id set (§4.A, glossary "lattice mode"). Empty means
  /// unconstrained (compatible with every path) — the default outside
  /// lattice mode. An input item's set comes straight from its
  /// `InputData::path_ids`; a phrasal item's is the intersection of its
  /// daughters' sets, narrowing as the derivation grows (`combine_path_ids`).
  pub path_ids: HashSet<u32>,
  pub score: f64,
  pub result_root: Option<TypeId>,
  pub unpack_cache: Option<Vec<ItemId>>,
  pub kind: ItemKind<F>,
}

impl<F: FeatureStructure> Item<F> {
  pub fn passive(&self) -> bool {
    self.tofill.is_empty()
  }

  pub fn inflrs_complete(&self) -> bool {
    self.inflrs_todo.is_empty()
  }

  /// The item's feature structure, if it has one (input items don't).
  pub fn fs(&self) -> Option<&F::Fs> {
    match &self.kind {
      ItemKind::Input(_) => None,
      ItemKind::Lexical(l) => Some(&l.fs),
      ItemKind::Phrasal(p) => Some(&p.fs),
    }
  }

  pub fn is_input(&self) -> bool {
    matches!(self.kind, ItemKind::Input(_))
  }

  pub fn is_lexical(&self) -> bool {
    matches!(self.kind, ItemKind::Lexical(_))
  }

  pub fn is_phrasal(&self) -> bool {
    matches!(self.kind, ItemKind::Phrasal(_))
  }

  pub fn rule(&self) -> Option<RuleId> {
    match &self.kind {
      ItemKind::Phrasal(p) => Some(p.rule),
      _ => None,
    }
  }

  /// The feature structure this item is compared against for packing (§6
  /// `packing_restrictor`, §3 "restricted packing fs"): a lexical item's own
  /// precomputed `restricted_fs`, or a phrasal item's `fs` narrowed to its
  /// rule's `packing_restrict` override (falling back to the grammar's
  /// default restrictor) via `unify_restrict`. `None` for input items, which
  /// have no fs at all.
  pub fn packing_fs<G: Grammar<F> + ?Sized>(&self, fs_engine: &mut F, grammar: &G) -> Option<F::Fs> {
    match &self.kind {
      ItemKind::Input(_) => None,
      ItemKind::Lexical(l) => Some(l.restricted_fs.clone()),
      ItemKind::Phrasal(p) => {
        let restrictor = self
          .rule()
          .and_then(|rid| grammar.rule(rid).packing_restrict)
          .or_else(|| grammar.packing_restrictor());
        let restricted = match restrictor {
          Some(ty) => {
            let template = fs_engine.instantiate(ty);
            fs_engine.unify_restrict(&template, 0, &p.fs, &[]).unwrap_or_else(|| fs_engine.copy(&p.fs))
          }
          None => fs_engine.copy(&p.fs),
        };
        Some(restricted)
      }
    }
  }

  /// For an active phrasal item, whether it extends to the right (consumes
  /// passives at its `end`) or to the left (consumes passives at its
  /// `start`). Only meaningful for active items.
  pub fn left_extending(&self, grammar: &dyn Grammar<F>) -> bool {
    match &self.kind {
      ItemKind::Phrasal(p) => grammar.rule(p.rule).left_extending(),
      _ => true,
    }
  }

  /// Adjacency between `self` (an active item) and `passive`: they must
  /// meet at the active item's open end (§4.A).
  pub fn adjacent(&self, passive: &Item<F>, grammar: &dyn Grammar<F>) -> bool {
    if self.left_extending(grammar) {
      passive.end == self.start
    } else {
      passive.start == self.end
    }
  }

  /// `chart_len` below is the chart's *rightmost vertex index*
  /// (`chart.rightmost()`), matching the convention item compatibility
  /// checks use throughout this module — not the chart's vertex count.
  fn spanning_only_ok(&self, rule: &Rule, chart_len: usize, next_arg: usize) -> bool {
    if !rule.spanning_only {
      return true;
    }
    if rule.arity == 1 {
      return self.end - self.start == chart_len;
    }
    if Some(next_arg) == rule.first_arg() {
      return self.start == 0;
    }
    if Some(next_arg) == rule.last_arg() {
      return self.end == chart_len;
    }
    true
  }

  /// Compatibility of this passive item with `rule` as a `RuleAndPassiveTask`
  /// candidate (§4.A).
  pub fn compatible_with_rule(&self, rule: &Rule, chart_len: usize, opts: &Options) -> bool {
    match rule.trait_ {
      RuleTrait::Infl => {
        if self.inflrs_todo.is_empty() {
          return false;
        }
        if self.inflrs_todo[0] != rule.id {
          return false;
        }
      }
      RuleTrait::Lex => {
        if self.trait_ == ItemTrait::Syntax {
          return false;
        }
      }
      RuleTrait::Syntax => {
        if !self.inflrs_complete() {
          return false;
        }
      }
    }

    let next_arg = match rule.first_arg() {
      Some(a) => a,
      None => return true,
    };
    if !self.spanning_only_ok(rule, chart_len, next_arg) {
      return false;
    }

    if !opts.shaping {
      return true;
    }

    if rule.left_extending() {
      self.end + rule.arity.saturating_sub(1) <= chart_len
    } else {
      self.start.checked_sub(rule.arity.saturating_sub(1)).is_some()
    }
  }

  /// Compatibility of this passive item with an already-active item as an
  /// `ActiveAndPassiveTask` candidate (§4.A).
  pub fn compatible_with_active(
    &self,
    active: &Item<F>,
    chart_len: usize,
    grammar: &dyn Grammar<F>,
    opts: &Options,
  ) -> bool {
    if self.trait_ == ItemTrait::Input || !self.inflrs_complete() {
      return false;
    }

    if let ItemKind::Phrasal(p) = &active.kind {
      let rule = grammar.rule(p.rule);
      if rule.spanning_only {
        let next_arg = rule.next_arg(active.nfilled);
        if next_arg == rule.first_arg() && self.start != 0 {
          return false;
        }
        if next_arg == rule.last_arg() && self.end != chart_len {
          return false;
        }
      }
    }

    if opts.lattice
      && !self.path_ids.is_empty()
      && !active.path_ids.is_empty()
      && self.path_ids.is_disjoint(&active.path_ids)
    {
      return false;
    }

    true
  }

  pub fn block(&mut self, mark: Blocked) {
    self.blocked = mark;
  }

  /// Whether this item, as it currently stands, licenses a parse: passive,
  /// spanning the whole chart, and compatible with one of the grammar's
  /// root types (§4.F). `chart_len` is `chart.rightmost()`. Returns the
  /// first matching root type, which the caller stamps into `result_root`.
  ///
  /// Uses `FeatureStructure::compatible` rather than a real `unify` against
  /// the root template: compatibility is non-mutating and sufficient to
  /// decide root-licensing without leaving throwaway arena garbage behind
  /// for every spanning item that turns out not to be a parse.
  pub fn root_check<G: Grammar<F> + ?Sized>(&self, fs_engine: &mut F, grammar: &G, chart_len: usize) -> Option<TypeId> {
    if !self.passive() || self.start != 0 || self.end != chart_len {
      return None;
    }
    let fs = self.fs()?;
    for &root_ty in grammar.root_types() {
      let root_fs = fs_engine.instantiate(root_ty);
      if fs_engine.compatible(fs, &root_fs) {
        return Some(root_ty);
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Options;
  use crate::testkit::{self, toy_grammar, RULE_VP_FROM_V_NP, VP};

  /// A would-be active item: `VP -> V NP` with its first argument (V)
  /// already filled, waiting on an NP at `start`.
  fn active_item(fs_engine: &mut testkit::ToyFs, start: usize, end: usize, path_ids: HashSet<u32>) -> Item<testkit::ToyFs> {
    let mut item = testkit::leaf_item(fs_engine, start, end, VP);
    item.trait_ = ItemTrait::Syntax;
    item.tofill = vec![1];
    item.nfilled = 1;
    item.kind = ItemKind::Phrasal(PhrasalData { rule: RULE_VP_FROM_V_NP, fs: fs_engine.instantiate(VP) });
    item.path_ids = path_ids;
    item
  }

  fn passive_item(fs_engine: &mut testkit::ToyFs, start: usize, end: usize, path_ids: HashSet<u32>) -> Item<testkit::ToyFs> {
    let grammar = toy_grammar();
    let mut item = testkit::leaf_item(fs_engine, start, end, grammar.noun_type());
    item.path_ids = path_ids;
    item
  }

  #[test]
  fn lattice_mode_rejects_disjoint_path_ids() {
    let grammar = toy_grammar();
    let mut fs_engine = testkit::ToyFs::new();
    let opts = Options { lattice: true, ..Options::default() };

    let active = active_item(&mut fs_engine, 0, 1, HashSet::from([1]));
    let passive = passive_item(&mut fs_engine, 1, 2, HashSet::from([2]));

    assert!(!passive.compatible_with_active(&active, 2, &grammar, &opts));
  }

  #[test]
  fn lattice_mode_allows_intersecting_path_ids() {
    let grammar = toy_grammar();
    let mut fs_engine = testkit::ToyFs::new();
    let opts = Options { lattice: true, ..Options::default() };

    let active = active_item(&mut fs_engine, 0, 1, HashSet::from([1, 2]));
    let passive = passive_item(&mut fs_engine, 1, 2, HashSet::from([2, 3]));

    assert!(passive.compatible_with_active(&active, 2, &grammar, &opts));
  }

  #[test]
  fn lattice_mode_allows_unconstrained_path_ids() {
    let grammar = toy_grammar();
    let mut fs_engine = testkit::ToyFs::new();
    let opts = Options { lattice: true, ..Options::default() };

    let active = active_item(&mut fs_engine, 0, 1, HashSet::new());
    let passive = passive_item(&mut fs_engine, 1, 2, HashSet::from([2]));

    assert!(passive.compatible_with_active(&active, 2, &grammar, &opts));
  }

  #[test]
  fn path_ids_ignored_outside_lattice_mode() {
    let grammar = toy_grammar();
    let mut fs_engine = testkit::ToyFs::new();
    let opts = Options::default();

    let active = active_item(&mut fs_engine, 0, 1, HashSet::from([1]));
    let passive = passive_item(&mut fs_engine, 1, 2, HashSet::from([2]));

    assert!(passive.compatible_with_active(&active, 2, &grammar, &opts));
  }

  #[test]
  fn combine_path_ids_defers_to_the_constrained_side() {
    let empty = HashSet::new();
    let a = HashSet::from([1, 2]);
    assert_eq!(combine_path_ids(&empty, &a), a);
    assert_eq!(combine_path_ids(&a, &empty), a);
    assert_eq!(combine_path_ids(&empty, &empty), HashSet::new());
  }

  #[test]
  fn combine_path_ids_intersects_two_constrained_sides() {
    let a = HashSet::from([1, 2, 3]);
    let b = HashSet::from([2, 3, 4]);
    assert_eq!(combine_path_ids(&a, &b), HashSet::from([2, 3]));
  }

  #[test]
  fn packing_fs_falls_back_to_full_fs_without_a_restrictor() {
    let grammar = toy_grammar();
    let mut fs_engine = testkit::ToyFs::new();
    let item = testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type());

    let restricted = item.packing_fs(&mut fs_engine, &grammar).expect("lexical item has a packing fs");
    assert!(fs_engine.compatible(&restricted, item.fs().unwrap()));
  }

  #[test]
  fn packing_fs_is_none_for_input_items() {
    let mut fs_engine = testkit::ToyFs::new();
    let grammar = toy_grammar();
    let item = testkit::input_item(0, 1, "dog");

    assert!(item.packing_fs(&mut fs_engine, &grammar).is_none());
  }
}
