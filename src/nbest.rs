//! Selective (n-best) unpacking (§4.I): lazy cube-pruning hypothesis
//! enumeration over packed derivations, scored by a [`StochasticModel`] and
//! expanded only as far as the caller's requested `n` actually demands.
//!
//! Exhaustive unpacking (§4.H) is the naive baseline: regenerate every
//! derivation, then sort. For a heavily packed chart that is wasteful — most
//! derivations are never looked at. This module instead builds, lazily, only
//! as many [`Hypothesis`]es as it needs to hand back the next-best reading,
//! following the grounding source's `hypothesize_edge`/`new_hypothesis`/
//! `instantiate_hypothesis`/`selectively_unpack` family:
//!
//! - Each packed phrasal item decomposes into a bounded set of
//!   [`Decomposition`]s — one daughter-edge choice per argument slot, drawn
//!   from that daughter's own packed alternatives.
//! - Within a decomposition, an index vector selects the *n*-th-best
//!   sub-hypothesis of each daughter; `advance_indices` generates the
//!   neighbours reachable by incrementing exactly one index, the standard
//!   cube-pruning expansion step.
//! - A hypothesis is scored along a *grandparent path*: the chain of
//!   ancestor edges (truncated to `gplevel`) it is being considered inside,
//!   since the same packed edge can be worth a different score depending on
//!   where in the derivation it is used.
//! - Hypotheses are only turned into real chart items — via
//!   [`instantiate_hypothesis`], which re-runs unification just like the
//!   exhaustive unpacker's `unpack_combine` — once they are actually popped
//!   off the root agenda; an instantiation that fails to unify still
//!   advances its slot in the index lattice rather than blocking the whole
//!   decomposition (§9 open question: failed hypotheses are cached and
//!   skipped via this index-advance fallback, never retried).
//!
//! The grounding source's per-edge agenda is a linear insertion sort with a
//! documented TODO to replace it with a real priority queue; here it is a
//! sorted `Vec` as well; see `insert_sorted` below. The engine's own task
//! agenda (`agenda.rs`) already uses a proper binary heap, so this is a
//! deliberate, scoped simplification rather than an oversight — see
//! DESIGN.md.

use std::collections::{HashMap, HashSet};

use crate::chart::Chart;
use crate::config::Options;
use crate::error::ErrorList;
use crate::fs::FeatureStructure;
use crate::grammar::Grammar;
use crate::item::{combine_path_ids, Blocked, Item, ItemId, ItemKind, PhrasalData};
use crate::model::HypothesisScoringContext;
use crate::resources::{Resources, Stage};
use crate::stats::ParseStats;
use crate::task::rebuild_from_daughters;

pub type HypothesisId = u32;

/// Grandparent path: the chain of ancestor edges a hypothesis is scored
/// under, truncated to `gplevel`. Unlike the grounding source's linked list
/// with a `NULL` root sentinel, the root context is simply the empty vector.
pub type GpPath = Vec<ItemId>;

/// One candidate derivation of a packed edge: a choice of sub-hypothesis per
/// daughter slot, not yet necessarily instantiated into a real chart item.
#[derive(Debug, Clone)]
struct Hypothesis {
  edge: ItemId,
  decomposition: usize,
  indices: Vec<usize>,
  daughters: Vec<HypothesisId>,
  scores: HashMap<GpPath, f64>,
  inst_edge: Option<ItemId>,
  inst_failed: bool,
}

/// One daughter-edge choice per argument slot of a phrasal item, drawn from
/// that daughter's own packed alternatives (`decompose_edge`).
#[derive(Debug, Clone, Default)]
struct Decomposition {
  rhs: Vec<ItemId>,
  seen: HashSet<Vec<usize>>,
}

#[derive(Debug, Default)]
struct EdgeState {
  decomposed: bool,
  decompositions: Vec<Decomposition>,
  hypotheses: Vec<HypothesisId>,
  agendas: HashMap<GpPath, Vec<HypothesisId>>,
  yielded: HashMap<GpPath, Vec<HypothesisId>>,
  exhausted_at: HashMap<GpPath, usize>,
}

/// Per-chart state for one selective-unpacking run. Not reused across
/// charts: hypothesis ids and `ItemId`s are only meaningful together.
#[derive(Default)]
pub struct SelectiveUnpacker {
  hypotheses: Vec<Hypothesis>,
  edges: HashMap<ItemId, EdgeState>,
}

/// Neighbours of `indices` reachable by incrementing exactly one coordinate
/// (the cube-pruning expansion step).
fn advance_indices(indices: &[usize]) -> Vec<Vec<usize>> {
  (0..indices.len())
    .map(|i| {
      let mut next = indices.to_vec();
      next[i] += 1;
      next
    })
    .collect()
}

fn truncated(mut path: GpPath, gplevel: usize) -> GpPath {
  while path.len() > gplevel {
    path.remove(0);
  }
  path
}

/// Insert `hid` into `agenda` keeping it sorted ascending by `scores[path]`
/// (so the best hypothesis is always the last element, popped in O(1)).
fn insert_sorted(agenda: &mut Vec<HypothesisId>, hypotheses: &[Hypothesis], path: &GpPath, hid: HypothesisId) {
  let score = hypotheses[hid as usize].scores.get(path).copied().unwrap_or(f64::MIN);
  let pos = agenda.partition_point(|&h| {
    hypotheses[h as usize].scores.get(path).copied().unwrap_or(f64::MIN) <= score
  });
  agenda.insert(pos, hid);
}

impl SelectiveUnpacker {
  pub fn new() -> Self {
    Self::default()
  }

  fn edge_state(&mut self, item: ItemId) -> &mut EdgeState {
    self.edges.entry(item).or_default()
  }

  /// Build (once) the bounded set of daughter-edge-choice decompositions for
  /// a phrasal item (`tPhrasalItem::decompose_edge`).
  fn decompositions<F: FeatureStructure>(chart: &Chart<F>, item: ItemId) -> Vec<Decomposition> {
    let daughters = chart.get(item).daughters.clone();
    if daughters.is_empty() {
      return Vec::new();
    }

    let choices: Vec<Vec<ItemId>> = daughters
      .iter()
      .map(|&d| {
        let mut alts = vec![d];
        alts.extend(chart.get(d).packed.iter().copied().filter(|&p| !chart.get(p).blocked.is_frozen()));
        alts
      })
      .collect();

    let mut out = vec![Decomposition::default()];
    for choice in choices {
      let mut next = Vec::with_capacity(out.len() * choice.len());
      for partial in &out {
        for &c in &choice {
          let mut rhs = partial.rhs.clone();
          rhs.push(c);
          next.push(Decomposition { rhs, seen: HashSet::new() });
        }
      }
      out = next;
    }
    out
  }

  fn new_hypothesis(&mut self, item: ItemId, decomposition: usize, indices: Vec<usize>, daughters: Vec<HypothesisId>) -> HypothesisId {
    let hid = self.hypotheses.len() as HypothesisId;
    self.hypotheses.push(Hypothesis {
      edge: item,
      decomposition,
      indices,
      daughters,
      scores: HashMap::new(),
      inst_edge: None,
      inst_failed: false,
    });
    self.edge_state(item).hypotheses.push(hid);
    hid
  }

  /// Score `hid` (belonging to `item`) along `path`, using its daughters'
  /// scores along `path + [item]` (truncated) — the grandparent-path frame
  /// those daughters were actually hypothesized under. A lexical hypothesis
  /// was already scored by `score_leaf` when it was created; this only
  /// handles the phrasal case.
  fn score_hypothesis<F, G>(&mut self, chart: &Chart<F>, grammar: &G, gplevel: usize, item: ItemId, hid: HypothesisId, path: &GpPath)
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    if self.hypotheses[hid as usize].scores.contains_key(path) {
      return;
    }
    let model = match grammar.stochastic_model() {
      Some(m) => m,
      None => {
        self.hypotheses[hid as usize].scores.insert(path.clone(), 0.0);
        return;
      }
    };

    let new_path = truncated({
      let mut p = path.clone();
      p.push(item);
      p
    }, gplevel);

    let rule = chart.get(item).rule().expect("phrasal hypothesis has a rule");
    let daughter_scores: Vec<f64> = self.hypotheses[hid as usize]
      .daughters
      .iter()
      .map(|&d| self.hypotheses[d as usize].scores.get(&new_path).copied().unwrap_or(0.0))
      .collect();

    let ctx = HypothesisScoringContext {
      rule,
      daughter_scores: &daughter_scores,
      path_len: path.len(),
    };
    let score = model.score_hypothesis(&ctx);
    self.hypotheses[hid as usize].scores.insert(path.clone(), score);
  }

  /// Create `hid`, then score and insert it into every already-built agenda
  /// for `item` (`new_hypothesis`: a freshly discovered alternative is
  /// immediately visible to every grandparent path already in flight).
  fn register_hypothesis<F, G>(
    &mut self,
    chart: &Chart<F>,
    grammar: &G,
    gplevel: usize,
    item: ItemId,
    decomposition: usize,
    indices: Vec<usize>,
    daughters: Vec<HypothesisId>,
  ) -> HypothesisId
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    let hid = self.new_hypothesis(item, decomposition, indices, daughters);
    let paths: Vec<GpPath> = self.edges[&item].agendas.keys().cloned().collect();
    for path in paths {
      self.score_hypothesis(chart, grammar, gplevel, item, hid, &path);
      let agenda = self.edges.get_mut(&item).unwrap().agendas.get_mut(&path).unwrap();
      insert_sorted(agenda, &self.hypotheses, &path, hid);
    }
    hid
  }

  /// Seed one initial (all-zero-index) hypothesis per decomposition, the
  /// first time this edge is ever hypothesized over. Daughters are
  /// hypothesized under `new_path` (this edge appended to `path`), not
  /// `path` itself, matching each daughter's own grandparent-path frame.
  fn ensure_seeded<F, G>(&mut self, chart: &mut Chart<F>, grammar: &G, fs_engine: &mut F, resources: &mut Resources, gplevel: usize, item: ItemId, new_path: &GpPath)
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    if self.edges.get(&item).map_or(false, |e| e.decomposed) {
      return;
    }
    let decompositions = Self::decompositions(chart, item);
    {
      let state = self.edge_state(item);
      state.decomposed = true;
      state.decompositions = decompositions;
    }

    let dec_count = self.edges[&item].decompositions.len();
    for dec_idx in 0..dec_count {
      let rhs = self.edges[&item].decompositions[dec_idx].rhs.clone();
      let indices = vec![0usize; rhs.len()];
      let mut daughters = Vec::with_capacity(rhs.len());
      let mut ok = true;
      for &d in &rhs {
        match self.hypothesize_edge(chart, grammar, fs_engine, resources, gplevel, d, new_path, 0) {
          Some(h) => daughters.push(h),
          None => {
            ok = false;
            break;
          }
        }
      }
      if ok {
        self.edges.get_mut(&item).unwrap().decompositions[dec_idx].seen.insert(indices.clone());
        self.register_hypothesis(chart, grammar, gplevel, item, dec_idx, indices, daughters);
      }
    }
  }

  fn ensure_agenda<F, G>(&mut self, chart: &Chart<F>, grammar: &G, gplevel: usize, item: ItemId, path: &GpPath)
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    if self.edges.get(&item).map_or(false, |e| e.agendas.contains_key(path)) {
      return;
    }
    let bag = self.edges.get(&item).map(|e| e.hypotheses.clone()).unwrap_or_default();
    for &h in &bag {
      self.score_hypothesis(chart, grammar, gplevel, item, h, path);
    }
    let mut agenda = Vec::with_capacity(bag.len());
    for h in bag {
      insert_sorted(&mut agenda, &self.hypotheses, path, h);
    }
    self.edge_state(item).agendas.insert(path.clone(), agenda);
  }

  /// Return the `i`-th-best hypothesis of `item` along `path` (lazily
  /// expanding the local agenda only as far as needed), or `None` once
  /// exhausted (`hypothesize_edge`).
  fn hypothesize_edge<F, G>(
    &mut self,
    chart: &mut Chart<F>,
    grammar: &G,
    fs_engine: &mut F,
    resources: &mut Resources,
    gplevel: usize,
    item: ItemId,
    path: &GpPath,
    i: usize,
  ) -> Option<HypothesisId>
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    if resources.exhausted() {
      return None;
    }
    let path = truncated(path.clone(), gplevel);

    match &chart.get(item).kind {
      ItemKind::Input(_) => None,
      ItemKind::Lexical(_) => {
        if i != 0 {
          return None;
        }
        let existing = self.edges.get(&item).and_then(|e| e.hypotheses.first().copied());
        let hid = existing.unwrap_or_else(|| self.new_hypothesis(item, usize::MAX, Vec::new(), Vec::new()));
        if !self.hypotheses[hid as usize].scores.contains_key(&path) {
          let score = match grammar.stochastic_model() {
            Some(model) => {
              let fs = chart.get(item).fs().expect("lexical item has a fs").clone();
              model.score_leaf(&fs)
            }
            None => 0.0,
          };
          self.hypotheses[hid as usize].scores.insert(path.clone(), score);
        }
        Some(hid)
      }
      ItemKind::Phrasal(_) => self.hypothesize_phrasal(chart, grammar, fs_engine, resources, gplevel, item, &path, i),
    }
  }

  fn hypothesize_phrasal<F, G>(
    &mut self,
    chart: &mut Chart<F>,
    grammar: &G,
    fs_engine: &mut F,
    resources: &mut Resources,
    gplevel: usize,
    item: ItemId,
    path: &GpPath,
    i: usize,
  ) -> Option<HypothesisId>
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    let new_path = truncated(
      {
        let mut p = path.clone();
        p.push(item);
        p
      },
      gplevel,
    );

    self.ensure_seeded(chart, grammar, fs_engine, resources, gplevel, item, &new_path);
    self.ensure_agenda(chart, grammar, gplevel, item, path);

    loop {
      if let Some(y) = self.edges.get(&item).and_then(|e| e.yielded.get(path)) {
        if i < y.len() {
          return Some(y[i]);
        }
      }
      if let Some(&max) = self.edges.get(&item).and_then(|e| e.exhausted_at.get(path)) {
        if i >= max {
          return None;
        }
      }

      let popped = self.edges.get_mut(&item).unwrap().agendas.get_mut(path).unwrap().pop();
      let hid = match popped {
        Some(h) => h,
        None => {
          let yielded_len = self.edges[&item].yielded.get(path).map_or(0, Vec::len);
          self.edge_state(item).exhausted_at.insert(path.clone(), yielded_len);
          return None;
        }
      };

      self.expand_hypothesis(chart, grammar, fs_engine, resources, gplevel, item, hid, path, &new_path);

      self.edge_state(item).yielded.entry(path.clone()).or_default().push(hid);
    }
  }

  /// Having popped `hid` off the agenda, generate its index-lattice
  /// neighbours, skip any already seen for this decomposition, and register
  /// whichever ones have a fully-resolvable set of daughter sub-hypotheses.
  /// A neighbour whose daughter hypothesis turned out to have failed
  /// instantiation earlier is not dropped outright: its own index is
  /// advanced one further step and requeued, so a dead branch never blocks
  /// the lattice around it (§9).
  fn expand_hypothesis<F, G>(
    &mut self,
    chart: &mut Chart<F>,
    grammar: &G,
    fs_engine: &mut F,
    resources: &mut Resources,
    gplevel: usize,
    item: ItemId,
    hid: HypothesisId,
    path: &GpPath,
    new_path: &GpPath,
  ) where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    let dec_idx = self.hypotheses[hid as usize].decomposition;
    if dec_idx == usize::MAX {
      return;
    }
    let base_indices = self.hypotheses[hid as usize].indices.clone();

    let mut worklist: std::collections::VecDeque<Vec<usize>> = advance_indices(&base_indices).into();
    while let Some(neighbour) = worklist.pop_front() {
      {
        let dec = &mut self.edge_state(item).decompositions[dec_idx];
        if !dec.seen.insert(neighbour.clone()) {
          continue;
        }
      }

      let rhs = self.edges[&item].decompositions[dec_idx].rhs.clone();
      let mut daughters = Vec::with_capacity(rhs.len());
      let mut failed_positions = Vec::new();
      let mut missing = false;
      for (slot, &d) in rhs.iter().enumerate() {
        match self.hypothesize_edge(chart, grammar, fs_engine, resources, gplevel, d, new_path, neighbour[slot]) {
          Some(h) => {
            if self.hypotheses[h as usize].inst_failed {
              failed_positions.push(slot);
            }
            daughters.push(h);
          }
          None => {
            missing = true;
            break;
          }
        }
      }
      if missing {
        continue;
      }
      if !failed_positions.is_empty() {
        let mut advanced = neighbour.clone();
        for &p in &failed_positions {
          advanced[p] += 1;
        }
        worklist.push_back(advanced);
        continue;
      }

      self.register_hypothesis(chart, grammar, gplevel, item, dec_idx, neighbour, daughters);
    }
  }

  /// Turn a hypothesis into a real, unified chart item, recursively
  /// instantiating its daughters first (`instantiate_hypothesis`). Cached
  /// per hypothesis: once instantiated, always the same item. A unification
  /// failure here — which can only happen for a combination the parsing
  /// loop itself never walked — marks the hypothesis failed so the lattice
  /// walk above can route around it, and is tallied, not surfaced as an
  /// error.
  fn instantiate_hypothesis<F, G>(
    &mut self,
    chart: &mut Chart<F>,
    grammar: &G,
    fs_engine: &mut F,
    resources: &mut Resources,
    stats: &mut ParseStats,
    gplevel: usize,
    hid: HypothesisId,
    path: &GpPath,
  ) -> Option<ItemId>
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    if resources.exhausted() {
      return None;
    }
    if let Some(e) = self.hypotheses[hid as usize].inst_edge {
      return Some(e);
    }
    if self.hypotheses[hid as usize].inst_failed {
      return None;
    }

    let edge = self.hypotheses[hid as usize].edge;
    let new_path = truncated(
      {
        let mut p = path.clone();
        p.push(edge);
        p
      },
      gplevel,
    );

    let result = match &chart.get(edge).kind {
      ItemKind::Input(_) | ItemKind::Lexical(_) => {
        let score = self.hypotheses[hid as usize].scores.get(path).copied().unwrap_or(0.0);
        chart.get_mut(edge).score = score;
        Some(edge)
      }
      ItemKind::Phrasal(_) => {
        let dtr_hids = self.hypotheses[hid as usize].daughters.clone();
        let mut daughters = Vec::with_capacity(dtr_hids.len());
        let mut failed = false;
        for dh in dtr_hids {
          match self.instantiate_hypothesis(chart, grammar, fs_engine, resources, stats, gplevel, dh, &new_path) {
            Some(d) => daughters.push(d),
            None => {
              failed = true;
              break;
            }
          }
        }

        if failed {
          None
        } else {
          let rule_id = chart.get(edge).rule().expect("phrasal edge has a rule");
          let rule = grammar.rule(rule_id);
          let del_attrs = grammar.deleted_daughters();
          let daughter_fs: Vec<F::Fs> = daughters
            .iter()
            .map(|&d| chart.get(d).fs().expect("instantiated daughter has a fs").clone())
            .collect();

          match rebuild_from_daughters(fs_engine, rule, del_attrs, &daughter_fs) {
            Some(new_fs) => {
              let path_ids =
                daughters.iter().fold(HashSet::new(), |acc, &d| combine_path_ids(&acc, &chart.get(d).path_ids));
              let m = chart.get(edge);
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
                daughters,
                parents: Vec::new(),
                packed: Vec::new(),
                blocked: Blocked::None,
                qc_unif: Default::default(),
                qc_subs: Default::default(),
                path_ids,
                score: self.hypotheses[hid as usize].scores.get(path).copied().unwrap_or(0.0),
                result_root: None,
                unpack_cache: None,
                kind: ItemKind::Phrasal(PhrasalData { rule: rule_id, fs: new_fs }),
              };
              stats.unpack_edges += 1;
              Some(chart.alloc(new_item))
            }
            None => {
              stats.unpack_failures += 1;
              None
            }
          }
        }
      }
    };

    match result {
      Some(id) => {
        self.hypotheses[hid as usize].inst_edge = Some(id);
        Some(id)
      }
      None => {
        self.hypotheses[hid as usize].inst_failed = true;
        None
      }
    }
  }

  /// Pull the top `n` readings, in score order, across every root edge the
  /// chart found — including each root's packed alternatives, since those
  /// are equally valid derivations (`selectively_unpack`/`unpack_selectively`).
  pub fn selectively_unpack<F, G>(
    &mut self,
    chart: &mut Chart<F>,
    grammar: &G,
    fs_engine: &mut F,
    opts: &Options,
    resources: &mut Resources,
    stats: &mut ParseStats,
    n: usize,
  ) -> (Vec<ItemId>, ErrorList)
  where
    F: FeatureStructure,
    G: Grammar<F> + ?Sized,
  {
    resources.enter_stage(Stage::SelectiveUnpack);
    let mut errors = ErrorList::new();
    let mut results = Vec::new();
    if n == 0 {
      return (results, errors);
    }

    let gplevel = opts.gplevel;
    let root_path: GpPath = Vec::new();
    let chart_len = chart.rightmost();

    let mut ragenda: Vec<(ItemId, HypothesisId, usize)> = Vec::new();
    let mut ragenda_score: Vec<f64> = Vec::new();

    let trees = chart.trees().to_vec();
    for root in trees {
      let mut edges = vec![root];
      edges.extend(chart.get(root).packed.iter().copied().filter(|&p| !chart.get(p).blocked.is_frozen()));
      for edge in edges {
        if chart.get(edge).blocked.is_frozen() {
          continue;
        }
        if let Some(hid) = self.hypothesize_edge(chart, grammar, fs_engine, resources, gplevel, edge, &root_path, 0) {
          let score = self.hypotheses[hid as usize].scores.get(&root_path).copied().unwrap_or(0.0);
          let pos = ragenda_score.partition_point(|&s| s <= score);
          ragenda.insert(pos, (edge, hid, 0));
          ragenda_score.insert(pos, score);
        }
      }
    }

    let mut remaining = n;
    while !ragenda.is_empty() && remaining > 0 {
      if resources.exhausted() {
        break;
      }
      let (edge, hid, idx) = ragenda.pop().unwrap();
      ragenda_score.pop();

      if let Some(res_id) = self.instantiate_hypothesis(chart, grammar, fs_engine, resources, stats, gplevel, hid, &root_path) {
        if let Some(root_ty) = chart.get(res_id).root_check(fs_engine, grammar, chart_len) {
          chart.get_mut(res_id).result_root = Some(root_ty);
          results.push(res_id);
          remaining -= 1;
        }
      }

      if let Some(next_hid) = self.hypothesize_edge(chart, grammar, fs_engine, resources, gplevel, edge, &root_path, idx + 1) {
        let score = self.hypotheses[next_hid as usize].scores.get(&root_path).copied().unwrap_or(0.0);
        let pos = ragenda_score.partition_point(|&s| s <= score);
        ragenda.insert(pos, (edge, next_hid, idx + 1));
        ragenda_score.insert(pos, score);
      }
    }

    if resources.exhausted() {
      if let Some(e) = resources.exhaustion_error() {
        errors.push(e);
      }
    }

    (results, errors)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testkit::{toy_grammar, ToyFs};

  #[test]
  fn advance_indices_increments_one_coordinate_each() {
    let neighbours = advance_indices(&[0, 0]);
    assert_eq!(neighbours, vec![vec![1, 0], vec![0, 1]]);
  }

  #[test]
  fn selecting_zero_readings_is_a_no_op() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();
    let opts = Options::default();
    let mut unpacker = SelectiveUnpacker::new();

    let (results, errors) =
      unpacker.selectively_unpack(&mut chart, &grammar, &mut fs_engine, &opts, &mut resources, &mut stats, 0);
    assert!(results.is_empty());
    assert!(errors.is_empty());
  }

  #[test]
  fn selecting_with_no_trees_yields_nothing() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();
    let opts = Options::default();
    let mut unpacker = SelectiveUnpacker::new();

    let (results, _) =
      unpacker.selectively_unpack(&mut chart, &grammar, &mut fs_engine, &opts, &mut resources, &mut stats, 5);
    assert!(results.is_empty());
  }

  #[test]
  fn a_lone_root_tree_is_returned_as_its_own_best_reading() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(1);
    let mut resources = Resources::unlimited();
    let mut stats = ParseStats::new();
    let opts = Options::default();
    let mut unpacker = SelectiveUnpacker::new();

    let leaf = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, crate::testkit::S));
    chart.record_tree(leaf);

    let (results, _) =
      unpacker.selectively_unpack(&mut chart, &grammar, &mut fs_engine, &opts, &mut resources, &mut stats, 3);
    assert_eq!(results, vec![leaf]);
  }
}
