//! A toy `FeatureStructure`/`Grammar` pair, used only by this crate's own
//! test suite (§2, §8) to exercise the parsing engine end-to-end without a
//! real grammar compiler or unifier, both of which are out of scope (§1).
//!
//! `ToyFs` wraps [`node::NodeArena`], a small reentrant DAG unifier in the
//! spirit of the teacher's own `NodeArena`. A feature structure's type is
//! tracked as a dedicated `$type` string edge rather than through a real
//! type hierarchy: there is no GLB table here, so two types are
//! quickcheck-compatible only when they're equal, never when one subsumes
//! the other. That's a deliberate simplification for a toy grammar, not a
//! stand-in for the real type lattice (§1, out of scope).
//!
//! [`toy_grammar`] builds the `S -> NP VP`, `VP -> V (NP)`, `NP -> (Det) N`
//! toy grammar used throughout §8's end-to-end scenarios.

mod node;
mod serialized;

use std::collections::{HashMap, HashSet};

use node::{Node, NodeArena, NodeIdx};
pub use serialized::SerializedNode;

use crate::fs::{AttrId, FeatureStructure, QcVector, TypeId};
use crate::grammar::{tofill_order, Grammar, Rule, RuleActivation, RuleId, RuleTrait};
use crate::config::KeyOrdering;
use crate::item::{Blocked, InputData, Item, ItemKind, ItemTrait, LexicalData, TokenClass};
use crate::model::StochasticModel;

pub const TOP: TypeId = 0;
pub const N: TypeId = 1;
pub const DET: TypeId = 2;
pub const V: TypeId = 3;
pub const NP: TypeId = 4;
pub const VP: TypeId = 5;
pub const S: TypeId = 6;
pub const PRON: TypeId = 7;

const TYPE_EDGE: &str = "$type";

/// The toy feature-structure engine: one `NodeArena`, plus the bookkeeping
/// `FeatureStructure::instantiate` needs to stamp a fresh node with its type.
pub struct ToyFs {
  arena: NodeArena,
}

impl ToyFs {
  pub fn new() -> Self {
    Self { arena: NodeArena::new() }
  }

  pub fn display(&self, fs: &NodeIdx) -> impl std::fmt::Display + '_ {
    self.arena.display(*fs)
  }

  /// Build a leaf fs of type `ty` carrying no features besides its type tag.
  pub fn leaf(&mut self, ty: TypeId) -> NodeIdx {
    self.instantiate(ty)
  }

  /// Build a leaf fs of type `ty` with one additional `attr: value` string
  /// feature (used by tests that need e.g. agreement features to block a
  /// derivation).
  pub fn leaf_with(&mut self, ty: TypeId, attr: &str, value: &str) -> NodeIdx {
    let root = self.instantiate(ty);
    let val = self.arena.alloc_str(value.to_string());
    self.arena.unify_edge(root, attr.to_string(), val).expect("fresh leaf never conflicts");
    root
  }
}

impl Default for ToyFs {
  fn default() -> Self {
    Self::new()
  }
}

impl FeatureStructure for ToyFs {
  type Fs = NodeIdx;

  fn instantiate(&mut self, ty: TypeId) -> Self::Fs {
    let root = self.arena.alloc_edged();
    let tag = self.arena.alloc_str(ty.to_string());
    self
      .arena
      .unify_edge(root, TYPE_EDGE.to_string(), tag)
      .expect("fresh node never conflicts on its own type tag");
    root
  }

  fn nth_arg(&self, root: &Self::Fs, i: usize) -> Option<Self::Fs> {
    let root = self.arena.dereference(*root);
    match self.arena.get(root) {
      Node::Edged(edges) => edges.get(&format!("arg{i}")).map(|n| self.arena.dereference(*n)),
      _ => None,
    }
  }

  fn unify(&mut self, root: &Self::Fs, arg: usize, sub: &Self::Fs) -> Option<Self::Fs> {
    self.unify_np(root, arg, sub)
  }

  fn unify_np(&mut self, root: &Self::Fs, arg: usize, sub: &Self::Fs) -> Option<Self::Fs> {
    let copied = self.arena.deep_clone(*sub);
    self.arena.unify_edge(*root, format!("arg{arg}"), copied).ok()?;
    Some(*root)
  }

  fn unify_restrict(
    &mut self,
    root: &Self::Fs,
    arg: usize,
    sub: &Self::Fs,
    del_attrs: &[AttrId],
  ) -> Option<Self::Fs> {
    let result = self.unify_np(root, arg, sub)?;
    for &attr in del_attrs {
      self.arena.remove_edge(result, attr_name(attr));
    }
    Some(result)
  }

  fn copy(&mut self, fs: &Self::Fs) -> Self::Fs {
    self.arena.deep_clone(*fs)
  }

  fn compatible(&self, a: &Self::Fs, b: &Self::Fs) -> bool {
    self.arena.compatible(*a, *b)
  }

  fn subsumes(&self, a: &Self::Fs, b: &Self::Fs) -> (bool, bool) {
    self.arena.subsumes(*a, *b)
  }

  fn qc_vector(&self, fs: &Self::Fs, len: usize) -> QcVector {
    if len == 0 {
      return QcVector::empty();
    }
    QcVector(vec![Some(self.type_of(fs))])
  }

  fn qc_compatible_unif(&self, a: &QcVector, b: &QcVector) -> bool {
    a.0.iter().zip(b.0.iter()).all(|(x, y)| match (x, y) {
      (Some(x), Some(y)) => x == y,
      _ => true,
    })
  }

  fn qc_compatible_subs(&self, a: &QcVector, b: &QcVector) -> (bool, bool) {
    let ok = self.qc_compatible_unif(a, b);
    (ok, ok)
  }

  fn type_of(&self, fs: &Self::Fs) -> TypeId {
    let root = self.arena.dereference(*fs);
    match self.arena.get(root) {
      Node::Edged(edges) => edges
        .get(TYPE_EDGE)
        .map(|n| self.arena.dereference(*n))
        .and_then(|n| match self.arena.get(n) {
          Node::Str(s) => s.parse().ok(),
          _ => None,
        })
        .unwrap_or(TOP),
      _ => TOP,
    }
  }
}

/// Attribute codes recognised by the toy grammar's `deleted_daughters`.
pub const ATTR_NONE: &[AttrId] = &[];

fn attr_name(_attr: AttrId) -> &'static str {
  // The toy grammar never declares deleted-daughters attributes, so this is
  // never called with a real id; kept total for the `FeatureStructure` impl.
  ""
}

/// `S -> NP VP`, `VP -> V (NP)`, `NP -> (Det) N` (§2, §8).
pub struct ToyGrammar {
  rules: Vec<Rule>,
}

pub const RULE_NP_FROM_N: RuleId = 0;
pub const RULE_NP_FROM_DET_N: RuleId = 1;
pub const RULE_VP_FROM_V: RuleId = 2;
pub const RULE_VP_FROM_V_NP: RuleId = 3;
pub const RULE_S_FROM_NP_VP: RuleId = 4;

impl ToyGrammar {
  pub fn new() -> Self {
    let rule = |id, ty, arity, head| Rule {
      id,
      ty,
      trait_: RuleTrait::Syntax,
      arity,
      tofill: tofill_order(KeyOrdering::KeyDriven, arity, head),
      hyperactive: true,
      spanning_only: false,
      qc_unif: vec![QcVector::empty(); arity],
      packing_restrict: None,
    };

    Self {
      rules: vec![
        rule(RULE_NP_FROM_N, NP, 1, None),
        rule(RULE_NP_FROM_DET_N, NP, 2, Some(1)),
        rule(RULE_VP_FROM_V, VP, 1, None),
        rule(RULE_VP_FROM_V_NP, VP, 2, Some(0)),
        rule(RULE_S_FROM_NP_VP, S, 2, Some(0)),
      ],
    }
  }

  pub fn noun_type(&self) -> TypeId {
    N
  }
  pub fn det_type(&self) -> TypeId {
    DET
  }
  pub fn verb_type(&self) -> TypeId {
    V
  }
  pub fn pron_type(&self) -> TypeId {
    PRON
  }
  pub fn unary_rule_id(&self) -> RuleId {
    RULE_NP_FROM_N
  }
}

impl Default for ToyGrammar {
  fn default() -> Self {
    Self::new()
  }
}

impl Grammar<ToyFs> for ToyGrammar {
  fn rules(&self, activation: RuleActivation) -> Box<dyn Iterator<Item = &Rule> + '_> {
    Box::new(self.rules.iter().filter(move |r| activation.admits(r.trait_)))
  }

  fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id as usize]
  }

  /// Every rule pair is filter-compatible in the toy grammar: there are only
  /// five rules, the rule filter's entire value is in real grammars with
  /// thousands of them, and a trivial "always true" table never rules out a
  /// derivation the toy end-to-end scenarios expect to succeed.
  fn filter_compatible(&self, _mother: RuleId, _arg: usize, _daughter: RuleId) -> bool {
    true
  }

  fn subsumption_filter_compatible(&self, _a: RuleId, _b: RuleId) -> (bool, bool) {
    (true, true)
  }

  fn deleted_daughters(&self) -> &[AttrId] {
    ATTR_NONE
  }

  fn packing_restrictor(&self) -> Option<TypeId> {
    None
  }

  fn root_types(&self) -> &[TypeId] {
    &[S]
  }

  fn stochastic_model(&self) -> Option<&dyn StochasticModel<ToyFs>> {
    None
  }
}

pub fn toy_grammar() -> ToyGrammar {
  ToyGrammar::new()
}

/// Build a passive lexical item of type `ty` spanning `[start, end)`, the way
/// lexical processing (out of scope, §1) would hand one to this crate.
pub fn leaf_item(fs_engine: &mut ToyFs, start: usize, end: usize, ty: TypeId) -> Item<ToyFs> {
  let fs = fs_engine.leaf(ty);
  Item {
    id: 0,
    start,
    end,
    external_start: start,
    external_end: end,
    trait_: ItemTrait::Lex,
    tofill: Vec::new(),
    nfilled: 0,
    inflrs_todo: Vec::new(),
    daughters: Vec::new(),
    parents: Vec::new(),
    packed: Vec::new(),
    blocked: Blocked::None,
    qc_unif: fs_engine.qc_vector(&fs, 1),
    qc_subs: fs_engine.qc_vector(&fs, 1),
    path_ids: HashSet::new(),
    score: 0.0,
    result_root: None,
    unpack_cache: None,
    kind: ItemKind::Lexical(LexicalData { stem: String::new(), fs, restricted_fs: fs }),
  }
}

/// Build an INPUT-trait leaf (§3): a surface token with no fs of its own,
/// never combined with a rule directly.
pub fn input_item(start: usize, end: usize, surface: &str) -> Item<ToyFs> {
  Item {
    id: 0,
    start,
    end,
    external_start: start,
    external_end: end,
    trait_: ItemTrait::Input,
    tofill: Vec::new(),
    nfilled: 0,
    inflrs_todo: Vec::new(),
    daughters: Vec::new(),
    parents: Vec::new(),
    packed: Vec::new(),
    blocked: Blocked::None,
    qc_unif: QcVector::empty(),
    qc_subs: QcVector::empty(),
    path_ids: HashSet::new(),
    score: 0.0,
    result_root: None,
    unpack_cache: None,
    kind: ItemKind::Input(InputData {
      surface: surface.to_string(),
      base_form: surface.to_string(),
      token_class: TokenClass::Word,
      pos_tags: Vec::new(),
      inflection_rules: Vec::new(),
      path_ids: HashSet::new(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toy_fs_roundtrips_type() {
    let mut fs = ToyFs::new();
    let n = fs.instantiate(N);
    assert_eq!(fs.type_of(&n), N);
  }

  #[test]
  fn toy_fs_unify_np_attaches_argument() {
    let mut fs = ToyFs::new();
    let root = fs.instantiate(NP);
    let det = fs.leaf(DET);
    let result = fs.unify_np(&root, 0, &det).unwrap();
    assert_eq!(fs.nth_arg(&result, 0).map(|a| fs.type_of(&a)), Some(DET));
  }

  #[test]
  fn toy_fs_subsumption_equivalence() {
    let mut fs = ToyFs::new();
    let a = fs.leaf(N);
    let b = fs.leaf(N);
    assert_eq!(fs.subsumes(&a, &b), (true, true));
  }

  #[test]
  fn toy_fs_subsumption_mismatched_types() {
    let mut fs = ToyFs::new();
    let a = fs.leaf(N);
    let b = fs.leaf(V);
    assert_eq!(fs.subsumes(&a, &b), (false, false));
  }

  #[test]
  fn toy_grammar_has_five_rules() {
    let g = toy_grammar();
    assert_eq!(g.rules(RuleActivation::All).count(), 5);
  }
}
