//! Exhaustive unpacking (§4.H): expand every packed item in the chart into
//! the full set of derivations it actually stands for.
//!
//! A passive item that survived packing represents a whole equivalence class
//! of derivations: its own daughters, plus whatever got packed under it (and
//! transitively under those). Unpacking regenerates each derivation as its
//! own item by cross-producting, for every daughter slot, the unpacked
//! alternatives of that daughter, then re-running the rule's unification on
//! each combination (`tItem::unpack`/`unpack1`/`unpack_cross`/`unpack_combine`
//! in the grounding source). Failures here are routine — a combination that
//! was never actually walked by the agenda may simply not unify — and are
//! tallied in `ParseStats` rather than surfaced as errors.
//!
//! Results are memoised per item (`Item::unpack_cache`) since the same
//! packed item can be reached from more than one parent during the
//! cross-product recursion.

use crate::chart::Chart;
use crate::error::ErrorList;
use crate::fs::FeatureStructure;
use crate::grammar::Grammar;
use crate::item::{combine_path_ids, Blocked, Item, ItemId, ItemKind, PhrasalData};
use crate::resources::{Resources, Stage};
use crate::stats::ParseStats;
use crate::task::rebuild_from_daughters;

/// Unpack `id` into the list of concrete derivation items it stands for,
/// including anything packed under it. Memoised in `Item::unpack_cache`.
/// Frozen items contribute nothing (§4.G: dead weight, never a derivation).
pub fn unpack<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  resources: &mut Resources,
  stats: &mut ParseStats,
  id: ItemId,
) -> Vec<ItemId>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  if chart.get(id).blocked.is_frozen() {
    return Vec::new();
  }
  if let Some(cached) = &chart.get(id).unpack_cache {
    return cached.clone();
  }
  if resources.exhausted() {
    return Vec::new();
  }

  let mut results = Vec::new();

  let packed = chart.get(id).packed.clone();
  for p in packed {
    results.extend(unpack(chart, grammar, fs_engine, resources, stats, p));
  }

  results.extend(unpack1(chart, grammar, fs_engine, resources, stats, id));

  chart.get_mut(id).unpack_cache = Some(results.clone());
  results
}

/// Unpack `id` itself, not anything packed under it (`tItem::unpack1`).
fn unpack1<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  resources: &mut Resources,
  stats: &mut ParseStats,
  id: ItemId,
) -> Vec<ItemId>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  match &chart.get(id).kind {
    // Leaves have exactly one derivation: themselves.
    ItemKind::Input(_) | ItemKind::Lexical(_) => vec![id],
    ItemKind::Phrasal(_) => {
      let daughters = chart.get(id).daughters.clone();
      if daughters.is_empty() {
        return vec![id];
      }

      let mut unpacked_dtrs = Vec::with_capacity(daughters.len());
      for &d in &daughters {
        unpacked_dtrs.push(unpack(chart, grammar, fs_engine, resources, stats, d));
      }

      let mut out = Vec::new();
      let mut config = Vec::with_capacity(daughters.len());
      unpack_cross(chart, grammar, fs_engine, resources, stats, id, &unpacked_dtrs, 0, &mut config, &mut out);
      out
    }
  }
}

/// Walk the cross product of `unpacked_dtrs` depth-first, combining each
/// full configuration via `unpack_combine` (`tPhrasalItem::unpack_cross`).
fn unpack_cross<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  resources: &mut Resources,
  stats: &mut ParseStats,
  mother: ItemId,
  unpacked_dtrs: &[Vec<ItemId>],
  slot: usize,
  config: &mut Vec<ItemId>,
  out: &mut Vec<ItemId>,
) where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  if resources.exhausted() {
    return;
  }
  if slot == unpacked_dtrs.len() {
    match unpack_combine(chart, grammar, fs_engine, stats, mother, config) {
      Some(id) => out.push(id),
      None => stats.unpack_failures += 1,
    }
    return;
  }

  for &d in &unpacked_dtrs[slot] {
    config.push(d);
    unpack_cross(chart, grammar, fs_engine, resources, stats, mother, unpacked_dtrs, slot + 1, config, out);
    config.pop();
    if resources.exhausted() {
      return;
    }
  }
}

/// Re-run `mother`'s rule against one concrete choice of daughters
/// (`tPhrasalItem::unpack_combine`).
fn unpack_combine<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  stats: &mut ParseStats,
  mother: ItemId,
  daughters: &[ItemId],
) -> Option<ItemId>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let rule_id = chart.get(mother).rule()?;
  let rule = grammar.rule(rule_id);
  let del_attrs = grammar.deleted_daughters();

  let daughter_fs: Vec<F::Fs> = daughters
    .iter()
    .map(|&d| chart.get(d).fs().expect("unpacked daughter has a fs").clone())
    .collect();
  let new_fs = rebuild_from_daughters(fs_engine, rule, del_attrs, &daughter_fs)?;

  let path_ids = daughters
    .iter()
    .fold(std::collections::HashSet::new(), |acc, &d| combine_path_ids(&acc, &chart.get(d).path_ids));

  let m = chart.get(mother);
  let new_item = Item {
    id: 0,
    start: m.start,
    end: m.end,
    external_start: m.external_start,
    external_end: m.external_end,
    trait_: m.trait_,
    tofill: Vec::new(),
    nfilled: rule.arity,
    inflrs_todo: Vec::new(),
    daughters: daughters.to_vec(),
    parents: Vec::new(),
    packed: Vec::new(),
    blocked: Blocked::None,
    qc_unif: Default::default(),
    qc_subs: Default::default(),
    path_ids,
    score: 0.0,
    result_root: None,
    unpack_cache: None,
    kind: ItemKind::Phrasal(PhrasalData { rule: rule_id, fs: new_fs }),
  };

  stats.unpack_edges += 1;
  Some(chart.alloc(new_item))
}

/// Unpack every tree the chart found into all of its derivations, root-check
/// each one, and return the resulting readings in discovery order
/// (`unpack_exhaustively` at the top of the grounding source).
pub fn unpack_exhaustively<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  resources: &mut Resources,
  stats: &mut ParseStats,
) -> (Vec<ItemId>, ErrorList)
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  resources.enter_stage(Stage::ExhaustiveUnpack);
  let mut errors = ErrorList::new();
  let mut readings = Vec::new();
  let chart_len = chart.rightmost();

  for tree in chart.trees().to_vec() {
    if chart.get(tree).blocked.is_blocked() {
      continue;
    }
    if resources.exhausted() {
      break;
    }
    for candidate in unpack(chart, grammar, fs_engine, resources, stats, tree) {
      if let Some(root_ty) = chart.get(candidate).root_check(fs_engine, grammar, chart_len) {
        chart.get_mut(candidate).result_root = Some(root_ty);
        readings.push(candidate);
      }
    }
  }

  if resources.exhausted() {
    if let Some(e) = resources.exhaustion_error() {
      errors.push(e);
    }
  }

  (readings, errors)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testkit::{toy_grammar, ToyFs};

  #[test]
  fn unpacking_a_frozen_item_yields_nothing() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();

    let mut leaf = crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type());
    leaf.block(Blocked::Frozen);
    let id = chart.alloc(leaf);

    let out = unpack(&mut chart, &grammar, &mut fs_engine, &mut resources, &mut stats, id);
    assert!(out.is_empty());
  }

  #[test]
  fn unpacking_a_leaf_returns_itself() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();

    let leaf = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type()));
    let out = unpack(&mut chart, &grammar, &mut fs_engine, &mut resources, &mut stats, leaf);
    assert_eq!(out, vec![leaf]);
  }

  #[test]
  fn unpacking_is_memoised() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();

    let leaf = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type()));
    let _ = unpack(&mut chart, &grammar, &mut fs_engine, &mut resources, &mut stats, leaf);
    assert!(chart.get(leaf).unpack_cache.is_some());
  }

  #[test]
  fn unpacking_a_packed_item_includes_its_alternative() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();

    let kept = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type()));
    let alt = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type()));
    chart.get_mut(kept).packed.push(alt);

    let out = unpack(&mut chart, &grammar, &mut fs_engine, &mut resources, &mut stats, kept);
    assert!(out.contains(&kept));
    assert!(out.contains(&alt));
  }
}
