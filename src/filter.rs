//! Quickcheck and rule filters (§4.E): cheap approximate compatibility tests
//! run before a task is even enqueued, so the (comparatively expensive) real
//! unification or subsumption test only runs on pairs that stand a chance.
//!
//! Both filters are conservative in the same direction: a `false` result is
//! authoritative (the real test would certainly fail too), a `true` result
//! is merely "maybe, go check". The rule filter is grammar-precomputed
//! (`Grammar::filter_compatible`/`subsumption_filter_compatible`, §6) and
//! only has an opinion when both operands were themselves built by a rule;
//! a passive item with no producing rule (a lexical or input leaf) always
//! passes it, deferring entirely to quickcheck.

use crate::fs::FeatureStructure;
use crate::grammar::{Grammar, Rule};
use crate::item::Item;

/// Approximate compatibility of `passive` as the first daughter of `rule`
/// (a `RuleAndPassiveTask` candidate).
pub fn rule_passive_compatible<F, G>(fs_engine: &F, grammar: &G, rule: &Rule, passive: &Item<F>) -> bool
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let arg = match rule.first_arg() {
    Some(a) => a,
    None => return true,
  };

  if let Some(daughter_rule) = passive.rule() {
    if !grammar.filter_compatible(rule.id, arg, daughter_rule) {
      return false;
    }
  }

  match rule.qc_unif.get(arg) {
    Some(rule_qc) => fs_engine.qc_compatible_unif(rule_qc, &passive.qc_unif),
    None => true,
  }
}

/// Approximate compatibility of `passive` as the next daughter of an already
/// active `active` item (an `ActiveAndPassiveTask` candidate).
pub fn active_passive_compatible<F, G>(
  fs_engine: &F,
  grammar: &G,
  active: &Item<F>,
  passive: &Item<F>,
) -> bool
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let rule_id = match active.rule() {
    Some(r) => r,
    None => return false,
  };
  let rule = grammar.rule(rule_id);
  let arg = match rule.next_arg(active.nfilled) {
    Some(a) => a,
    None => return false,
  };

  if let Some(daughter_rule) = passive.rule() {
    if !grammar.filter_compatible(rule_id, arg, daughter_rule) {
      return false;
    }
  }

  match rule.qc_unif.get(arg) {
    Some(rule_qc) => fs_engine.qc_compatible_unif(rule_qc, &passive.qc_unif),
    None => true,
  }
}

/// Approximate `(a_subsumes_b, b_subsumes_a)` for a candidate packing pair
/// (§4.F/§4.G): the rule filter's per-direction verdict, narrowed further by
/// the quickcheck subsumption vectors. Either source ruling out a direction
/// rules it out for good.
pub fn subsumption_candidate_compatible<F, G>(fs_engine: &F, grammar: &G, a: &Item<F>, b: &Item<F>) -> (bool, bool)
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let (mut fwd, mut bwd) = (true, true);

  if let (Some(ra), Some(rb)) = (a.rule(), b.rule()) {
    let (rf, rb_) = grammar.subsumption_filter_compatible(ra, rb);
    fwd &= rf;
    bwd &= rb_;
  }

  if !fwd && !bwd {
    return (false, false);
  }

  let (qf, qb) = fs_engine.qc_compatible_subs(&a.qc_subs, &b.qc_subs);
  (fwd && qf, bwd && qb)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testkit::{toy_grammar, ToyFs};

  #[test]
  fn lexical_passive_skips_rule_filter_defers_to_quickcheck() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let rule = grammar.rule(grammar.unary_rule_id());
    let leaf = crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type());
    assert!(rule_passive_compatible(&fs_engine, &grammar, rule, &leaf));
  }
}
