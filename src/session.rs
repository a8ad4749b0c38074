//! The parsing loop (§4.F): postulation, the fundamental rule, and the
//! `analyze` entry point that drives them to a fixed point.
//!
//! Lexical processing already deposited every input and lexical item into
//! the chart before this module ever runs — `analyze`'s job is purely the
//! syntactic half: seed rules against passive items, extend active items
//! with adjacent passives, apply packing to every result, and stop early the
//! moment a configured result limit or resource budget says to.

use tracing::{debug, trace, trace_span};

use crate::agenda::Agenda;
use crate::chart::Chart;
use crate::config::Options;
use crate::error::{ErrorList, ParseError};
use crate::filter;
use crate::fs::FeatureStructure;
use crate::grammar::{Grammar, RuleActivation};
use crate::item::{Item, ItemId};
use crate::packing;
use crate::resources::{Resources, Stage};
use crate::stats::ParseStats;
use crate::task::{self, Task};

/// Everything `analyze` hands back: the chart (readings live in
/// `chart.readings()`), the stats collected while building it, and any
/// diagnostics.
pub struct AnalyzeResult<F: FeatureStructure> {
  pub chart: Chart<F>,
  pub stats: ParseStats,
  pub errors: ErrorList,
}

/// Priority bonus added to tasks descending from a hyperactively-scheduled
/// rule (§4.C), so their combinations are popped off the agenda before
/// equal-scored non-hyperactive ones. Chosen to be larger than any plausible
/// span-based heuristic priority difference, smaller than a stochastic
/// model's typical score spread.
const HYPERACTIVE_BONUS: f64 = 1000.0;

fn heuristic_priority(start: usize, end: usize, n: usize, active: bool) -> f64 {
  let n = (n.max(1)) as f64;
  let mut p = end as f64 - (start as f64 / n);
  if !active {
    p -= start as f64 / n;
  }
  p
}

fn task_priority<F, G>(
  chart: &Chart<F>,
  grammar: &G,
  rule_id: crate::grammar::RuleId,
  daughters_fs: &[F::Fs],
  start: usize,
  end: usize,
  produces_active: bool,
  opts: &Options,
) -> f64
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let base = match grammar.stochastic_model() {
    Some(model) => model.score_local_tree(rule_id, daughters_fs),
    None => heuristic_priority(start, end, chart.length(), produces_active),
  };
  if opts.hyperactive_for_rule(rule_id) {
    base + HYPERACTIVE_BONUS
  } else {
    base
  }
}

enum AddOutcome {
  Added,
  Packed,
  /// A result-limit or resource budget fired; the caller should stop
  /// draining the agenda.
  Stop,
}

/// Schedule every rule `passive` could seed, and every already-active item
/// it could extend (§4.D step 1-2, the two task-producing halves of the
/// fundamental rule).
fn postulate<F, G>(
  chart: &Chart<F>,
  agenda: &mut Agenda,
  grammar: &G,
  fs_engine: &F,
  opts: &Options,
  id: ItemId,
) where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let passive = chart.get(id);
  if passive.is_input() {
    // Input items are consumed by lexical items, never combined with a rule.
    return;
  }

  let chart_len = chart.rightmost();

  for rule in grammar.rules(RuleActivation::All) {
    if !passive.compatible_with_rule(rule, chart_len, opts) {
      continue;
    }
    if opts.filter && !filter::rule_passive_compatible(fs_engine, grammar, rule, passive) {
      continue;
    }
    let priority = task_priority(chart, grammar, rule.id, std::slice::from_ref(passive.fs().expect("non-input passive has a fs")), passive.start, passive.end, rule.arity > 1, opts);
    agenda.push(Task::RuleAndPassive { rule: rule.id, passive: id }, priority, Some(passive.end));
  }

  fundamental_for_passive(chart, agenda, grammar, fs_engine, opts, id);
}

/// Candidate active items adjacent to a freshly-indexed passive item, in
/// either extension direction (§4.A `adjacent`).
fn adjacent_actives<F, G>(chart: &Chart<F>, grammar: &G, passive: &Item<F>) -> Vec<ItemId>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let mut seen = std::collections::HashSet::new();
  let mut out = Vec::new();
  for &v in &[passive.start, passive.end] {
    for &a in chart.actives_at_open(v) {
      if !seen.insert(a) {
        continue;
      }
      let active = chart.get(a);
      if active.adjacent(passive, grammar) {
        out.push(a);
      }
    }
  }
  out
}

fn fundamental_for_passive<F, G>(
  chart: &Chart<F>,
  agenda: &mut Agenda,
  grammar: &G,
  fs_engine: &F,
  opts: &Options,
  passive_id: ItemId,
) where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let passive = chart.get(passive_id);
  let chart_len = chart.rightmost();

  for active_id in adjacent_actives(chart, grammar, passive) {
    let active = chart.get(active_id);
    if active.blocked.is_blocked() {
      continue;
    }
    if !passive.compatible_with_active(active, chart_len, grammar, opts) {
      continue;
    }
    if opts.filter && !filter::active_passive_compatible(fs_engine, grammar, active, passive) {
      continue;
    }
    let rule = grammar.rule(active.rule().expect("active item has a rule"));
    let mut daughters_fs: Vec<F::Fs> = active.daughters.iter().map(|&d| chart.get(d).fs().expect("daughter has a fs").clone()).collect();
    daughters_fs.push(passive.fs().expect("passive operand has a fs").clone());
    let produces_active = active.nfilled + 1 < rule.arity;
    let (start, end) = if active.left_extending(grammar) { (passive.start, active.end) } else { (active.start, passive.end) };
    let priority = task_priority(chart, grammar, rule.id, &daughters_fs, start, end, produces_active, opts);
    agenda.push(Task::ActiveAndPassive { active: active_id, passive: passive_id }, priority, Some(end));
  }
}

fn fundamental_for_active<F, G>(
  chart: &Chart<F>,
  agenda: &mut Agenda,
  grammar: &G,
  fs_engine: &F,
  opts: &Options,
  active_id: ItemId,
) where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let active = chart.get(active_id);
  let chart_len = chart.rightmost();
  let left_extending = active.left_extending(grammar);
  let candidates: &[ItemId] = if left_extending {
    chart.passives_ending_at(active.start)
  } else {
    chart.passives_starting_at(active.end)
  };

  let rule = grammar.rule(active.rule().expect("active item has a rule"));

  for &passive_id in candidates {
    let passive = chart.get(passive_id);
    if passive.blocked.is_blocked() {
      continue;
    }
    if !active.adjacent(passive, grammar) {
      continue;
    }
    if !passive.compatible_with_active(active, chart_len, grammar, opts) {
      continue;
    }
    if opts.filter && !filter::active_passive_compatible(fs_engine, grammar, active, passive) {
      continue;
    }
    let mut daughters_fs: Vec<F::Fs> = active.daughters.iter().map(|&d| chart.get(d).fs().expect("daughter has a fs").clone()).collect();
    daughters_fs.push(passive.fs().expect("passive operand has a fs").clone());
    let produces_active = active.nfilled + 1 < rule.arity;
    let (start, end) = if left_extending { (passive.start, active.end) } else { (active.start, passive.end) };
    let priority = task_priority(chart, grammar, rule.id, &daughters_fs, start, end, produces_active, opts);
    agenda.push(Task::ActiveAndPassive { active: active_id, passive: passive_id }, priority, Some(end));
  }
}

/// Index, pack, root-check, and (if still live) postulate/fundamental-rule a
/// freshly allocated item (§4.F step 2-6).
fn add_item<F, G>(
  chart: &mut Chart<F>,
  agenda: &mut Agenda,
  grammar: &G,
  fs_engine: &mut F,
  opts: &Options,
  resources: &mut Resources,
  stats: &mut ParseStats,
  errors: &mut ErrorList,
  id: ItemId,
) -> AddOutcome
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let passive = chart.get(id).passive();

  if passive {
    if resources.exhausted() {
      if let Some(e) = resources.exhaustion_error() {
        errors.push(e);
      }
      return AddOutcome::Stop;
    }
    resources.record_passive_edge();
    stats.passive_edges += 1;

    if let Some(fs) = chart.get(id).fs() {
      let fs = fs.clone();
      let qc_unif = fs_engine.qc_vector(&fs, opts.nqc_unif);
      let qc_subs = fs_engine.qc_vector(&fs, opts.nqc_subs);
      let item = chart.get_mut(id);
      item.qc_unif = qc_unif;
      item.qc_subs = qc_subs;
    }

    if opts.packing.packing_enabled() {
      let absorbed = packing::packed_edge(chart, grammar, fs_engine, stats, opts, id);
      if absorbed {
        return AddOutcome::Packed;
      }
    }

    chart.index_passive(id);

    let chart_len = chart.rightmost();
    if let Some(root_ty) = chart.get(id).root_check(fs_engine, grammar, chart_len) {
      chart.get_mut(id).result_root = Some(root_ty);
      chart.record_tree(id);
      if stats.first_tree_time.is_none() {
        if let Some(elapsed) = resources.elapsed() {
          stats.first_tree_time = Some(elapsed);
        }
      }
      debug!(item = id, root_type = root_ty, "found a reading");

      let stop = (opts.packing.no_unpack && chart.trees().len() >= 1)
        || (opts.nsolutions_applies() && opts.nsolutions != 0 && chart.trees().len() >= opts.nsolutions);
      if stop {
        return AddOutcome::Stop;
      }
    }

    postulate(chart, agenda, grammar, fs_engine, opts, id);
  } else {
    let open_vertex = if chart.get(id).left_extending(grammar) { chart.get(id).start } else { chart.get(id).end };
    chart.index_active(id, open_vertex);
    fundamental_for_active(chart, agenda, grammar, fs_engine, opts, id);
  }

  AddOutcome::Added
}

/// Run a complete parse: seed the chart with `lexical_items` (already-built
/// passive items from upstream lexical processing), then drain the agenda
/// until it empties, a result limit is hit, or a resource budget fires
/// (§4.F).
pub fn analyze<F, G>(
  lexical_items: Vec<Item<F>>,
  chart_length: usize,
  grammar: &G,
  fs_engine: &mut F,
  opts: &Options,
  resources: &mut Resources,
) -> AnalyzeResult<F>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  let span = trace_span!("parse", tokens = chart_length);
  let _enter = span.enter();

  let mut chart = Chart::new(chart_length);
  let mut agenda = Agenda::exhaustive();
  let mut stats = ParseStats::new();
  let mut errors = ErrorList::new();

  resources.enter_stage(Stage::Parsing);

  if chart_length == 0 {
    return AnalyzeResult { chart, stats, errors };
  }

  let mut stopped = false;

  for item in lexical_items {
    let id = chart.alloc(item);
    match add_item(&mut chart, &mut agenda, grammar, fs_engine, opts, resources, &mut stats, &mut errors, id) {
      AddOutcome::Stop => {
        stopped = true;
        break;
      }
      _ => {}
    }
  }

  if !stopped {
    while let Some(task) = agenda.pop() {
      if resources.exhausted() {
        if let Some(e) = resources.exhaustion_error() {
          errors.push(e);
        }
        break;
      }

      trace!(?task, "executing task");
      let produced = match task::execute(&task, &chart, grammar, fs_engine, opts, &mut stats) {
        Some(item) => item,
        None => continue,
      };

      let id = chart.alloc(produced);
      match task {
        Task::RuleAndPassive { passive, .. } => chart.get_mut(passive).parents.push(id),
        Task::ActiveAndPassive { active, passive } => {
          chart.get_mut(active).parents.push(id);
          chart.get_mut(passive).parents.push(id);
        }
      }

      match add_item(&mut chart, &mut agenda, grammar, fs_engine, opts, resources, &mut stats, &mut errors, id) {
        AddOutcome::Stop => break,
        _ => {}
      }
    }
  }

  if chart.trees().is_empty() {
    errors.push(ParseError::NoReadings("parsing completed with no licensed readings".to_string()));
  }

  AnalyzeResult { chart, stats, errors }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testkit::{self, toy_grammar, ToyFs};

  fn run(tokens: &[&str]) -> AnalyzeResult<ToyFs> {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut resources = Resources::unlimited();
    let opts = Options::default();

    let mut items = Vec::new();
    for (i, &tok) in tokens.iter().enumerate() {
      let ty = match tok {
        "the" => grammar.det_type(),
        "saw" | "barked" => grammar.verb_type(),
        "dog" | "cat" => grammar.noun_type(),
        "it" => grammar.pron_type(),
        other => panic!("unknown toy token {other}"),
      };
      items.push(testkit::leaf_item(&mut fs_engine, i, i + 1, ty));
    }

    analyze(items, tokens.len(), &grammar, &mut fs_engine, &opts, &mut resources)
  }

  #[test]
  fn simple_transitive_sentence_parses() {
    let result = run(&["the", "dog", "saw", "the", "cat"]);
    assert!(result.errors.is_empty() || !result.errors.has_fatal());
    assert_eq!(result.chart.readings().len(), 1);
  }

  #[test]
  fn intransitive_sentence_parses() {
    let result = run(&["it", "barked"]);
    assert_eq!(result.chart.readings().len(), 1);
  }

  #[test]
  fn empty_input_returns_empty_chart_and_no_errors() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut resources = Resources::unlimited();
    let opts = Options::default();

    let result = analyze::<ToyFs, _>(Vec::new(), 0, &grammar, &mut fs_engine, &opts, &mut resources);
    assert!(result.chart.readings().is_empty());
    assert!(result.errors.is_empty());
  }

  #[test]
  fn token_with_no_lexical_entries_reports_no_readings() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut resources = Resources::unlimited();
    let opts = Options::default();

    let result = analyze::<ToyFs, _>(Vec::new(), 1, &grammar, &mut fs_engine, &opts, &mut resources);
    assert!(result.chart.readings().is_empty());
    assert!(result.errors.iter().any(|e| matches!(e, ParseError::NoReadings(_))));
  }

  #[test]
  fn zero_passive_edge_budget_yields_resource_exhausted_and_no_readings() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut resources = Resources::new(Some(0), None, None);
    let opts = Options::default();

    let leaf = testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type());
    let result = analyze(vec![leaf], 1, &grammar, &mut fs_engine, &opts, &mut resources);
    assert!(result.chart.readings().is_empty());
    assert!(result.errors.iter().any(|e| matches!(e, ParseError::ResourceExhausted(_))));
  }

  #[test]
  fn spurious_lexical_ambiguity_packs_to_one_reading() {
    // Two leaves at the same span, same type: the second should pack under
    // the first rather than double every downstream derivation (§4.G).
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut resources = Resources::unlimited();
    let mut opts = Options::default();
    opts.packing = crate::config::PackingMode { equivalence: true, ..Default::default() };

    let a = testkit::leaf_item(&mut fs_engine, 0, 1, grammar.det_type());
    let b = testkit::leaf_item(&mut fs_engine, 0, 1, grammar.det_type());
    let mut chart = Chart::new(1);
    let mut agenda = Agenda::exhaustive();
    let mut stats = ParseStats::new();
    let mut errors = ErrorList::new();

    let id_a = chart.alloc(a);
    add_item(&mut chart, &mut agenda, &grammar, &mut fs_engine, &opts, &mut resources, &mut stats, &mut errors, id_a);
    let id_b = chart.alloc(b);
    add_item(&mut chart, &mut agenda, &grammar, &mut fs_engine, &opts, &mut resources, &mut stats, &mut errors, id_b);

    assert_eq!(chart.passive_items_spanning(0, 1).len(), 1);
    assert_eq!(chart.get(id_a).packed, vec![id_b]);
  }
}
