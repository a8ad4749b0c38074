//! The packing engine (§4.F/§4.G): subsumption-based equivalence, proactive,
//! and retroactive packing, and the frost/freeze blocking it relies on.
//!
//! A freshly built passive item (`new_id`, already allocated in the arena
//! but not yet indexed into the chart) is compared against every existing
//! passive item spanning the same `(start, end)`. Per candidate, the
//! subsumption direction between the two — approximated first by the rule
//! filter, then the subsumption quickcheck vectors, only falling through to
//! a real `FeatureStructure::subsumes` call when both still allow it —
//! decides the action:
//!
//! - both directions hold (equivalent) and equivalence packing is on: `new`
//!   is packed under the existing item, which keeps its place in the chart.
//! - only the existing item subsumes `new` (candidate more general) and
//!   proactive packing is on: same outcome as equivalence packing.
//! - only `new` subsumes the existing item (new more general) and
//!   retroactive packing is on: the roles reverse — the existing item (and
//!   anything already packed under it) is packed under `new`, and the
//!   existing item is frosted in place, rather than removed from the chart
//!   (the arena never shrinks, matching the monotonic-id invariant).
//!
//! `packed_edge` returns `true` iff `new_id` was absorbed into an existing
//! item and should not be indexed into the chart or scheduled further.

use crate::chart::Chart;
use crate::config::Options;
use crate::filter::subsumption_candidate_compatible;
use crate::fs::FeatureStructure;
use crate::grammar::Grammar;
use crate::item::{Blocked, ItemId};
use crate::stats::ParseStats;

/// Propagate a blocking mark from `start` to itself and, for `Frozen`,
/// recursively to every transitive parent (§9: an explicit worklist, not
/// unbounded recursion, to bound stack depth on pathological grammars).
///
/// Matches the source system's rule that *any* block — frost or freeze —
/// always freezes the blocked item's parents, even when the item's own
/// mark doesn't change; an item already known `Frozen` has, by induction,
/// already frozen its ancestors, so re-walking from it is skipped.
fn block<F: FeatureStructure>(chart: &mut Chart<F>, stats: &mut ParseStats, start: ItemId, mark: Blocked) {
  let mut worklist = vec![(start, mark)];
  while let Some((id, mark)) = worklist.pop() {
    let item = chart.get_mut(id);
    let was_blocked = item.blocked.is_blocked();
    let was_frozen = item.blocked.is_frozen();

    if was_blocked && was_frozen {
      continue;
    }

    if !was_blocked || mark == Blocked::Frozen {
      if mark == Blocked::Frozen {
        stats.frozen += 1;
      }
      item.blocked = mark;
    }

    let parents = chart.get(id).parents.clone();
    worklist.extend(parents.into_iter().map(|p| (p, Blocked::Frozen)));
  }
}

pub fn frost<F: FeatureStructure>(chart: &mut Chart<F>, stats: &mut ParseStats, id: ItemId) {
  block(chart, stats, id, Blocked::Frosted);
}

pub fn freeze<F: FeatureStructure>(chart: &mut Chart<F>, stats: &mut ParseStats, id: ItemId) {
  block(chart, stats, id, Blocked::Frozen);
}

/// Transitive containment of `target` among `root`'s daughters, used to
/// avoid packing an item with one of its own offspring edges.
fn contains<F: FeatureStructure>(chart: &Chart<F>, root: ItemId, target: ItemId) -> bool {
  let mut stack = chart.get(root).daughters.clone();
  let mut seen = std::collections::HashSet::new();
  while let Some(id) = stack.pop() {
    if id == target {
      return true;
    }
    if !seen.insert(id) {
      continue;
    }
    stack.extend(chart.get(id).daughters.iter().copied());
  }
  false
}

pub fn packed_edge<F, G>(
  chart: &mut Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  stats: &mut ParseStats,
  opts: &Options,
  new_id: ItemId,
) -> bool
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  if !chart.get(new_id).inflrs_complete() {
    return false;
  }
  let (start, end) = {
    let it = chart.get(new_id);
    (it.start, it.end)
  };

  let candidates: Vec<ItemId> = chart.passive_items_spanning(start, end).to_vec();

  for old_id in candidates {
    if old_id == new_id {
      continue;
    }
    {
      let old = chart.get(old_id);
      if !old.inflrs_complete() || old.is_input() {
        continue;
      }
    }
    if contains(chart, new_id, old_id) || contains(chart, old_id, new_id) {
      continue;
    }

    let (forward, backward) = {
      let old = chart.get(old_id);
      let new = chart.get(new_id);
      let (rf, rb) = subsumption_candidate_compatible(fs_engine, grammar, old, new);
      if !rf && !rb {
        stats.subsumptions_failed += 1;
        continue;
      }
      let old_fs = old.packing_fs(fs_engine, grammar).expect("non-input passive item has a fs");
      let new_fs = new.packing_fs(fs_engine, grammar).expect("non-input passive item has a fs");
      let (sf, sb) = fs_engine.subsumes(&old_fs, &new_fs);
      if sf || sb {
        stats.subsumptions_succeeded += 1;
      } else {
        stats.subsumptions_failed += 1;
      }
      (sf, sb)
    };

    if forward && !chart.get(old_id).blocked.is_blocked() {
      let equivalence = backward;
      if (!equivalence && opts.packing.proactive) || (equivalence && opts.packing.equivalence) {
        chart.get_mut(old_id).packed.push(new_id);
        if equivalence {
          stats.packed_equivalent += 1;
        } else {
          stats.packed_proactive += 1;
        }
        return true;
      }
    }

    if backward && opts.packing.retroactive && !chart.get(old_id).blocked.is_frosted() {
      let old_packed = std::mem::take(&mut chart.get_mut(old_id).packed);
      {
        let new = chart.get_mut(new_id);
        for p in old_packed.into_iter().rev() {
          new.packed.insert(0, p);
        }
      }
      if !chart.get(old_id).blocked.is_blocked() {
        stats.packed_retroactive += 1;
        chart.get_mut(new_id).packed.push(old_id);
      }
      frost(chart, stats, old_id);
    }
  }

  false
}
