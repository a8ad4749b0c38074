//! Tasks (§4.A, §4.D): the two kinds of pending combination the agenda
//! schedules, and the unification replay shared between ordinary task
//! execution and unpacking.

use crate::chart::Chart;
use crate::config::Options;
use crate::fs::FeatureStructure;
use crate::grammar::{Grammar, Rule, RuleId};
use crate::item::{combine_path_ids, Blocked, Item, ItemId, ItemKind, ItemTrait, PhrasalData};
use crate::stats::ParseStats;

/// One pending combination (§4.A): either seed a rule with its first
/// daughter, or extend an already-active item with its next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
  RuleAndPassive { rule: RuleId, passive: ItemId },
  ActiveAndPassive { active: ItemId, passive: ItemId },
}

impl Task {
  pub fn passive_id(&self) -> ItemId {
    match self {
      Task::RuleAndPassive { passive, .. } => *passive,
      Task::ActiveAndPassive { passive, .. } => *passive,
    }
  }
}

/// One step of a rule application: unify `sub` into `root`'s `arg`-th
/// argument, using `unify_restrict` (with the grammar's deleted-daughters
/// attributes) iff this is the rule's *last* argument to be filled, `unify_np`
/// otherwise (§4.D step 4).
pub(crate) fn unify_step<F: FeatureStructure>(
  fs_engine: &mut F,
  root: &F::Fs,
  arg: usize,
  sub: &F::Fs,
  is_final: bool,
  del_attrs: &[crate::fs::AttrId],
) -> Option<F::Fs> {
  if is_final {
    fs_engine.unify_restrict(root, arg, sub, del_attrs)
  } else {
    fs_engine.unify_np(root, arg, sub)
  }
}

/// Rebuild a rule application from scratch given its complete, ordered list
/// of daughter feature structures (in `tofill` order). Used by the
/// unpacker (§4.H/§4.I), which must regenerate results for daughter
/// combinations the agenda never actually walked one task at a time.
pub(crate) fn rebuild_from_daughters<F: FeatureStructure>(
  fs_engine: &mut F,
  rule: &Rule,
  del_attrs: &[crate::fs::AttrId],
  daughter_fs: &[F::Fs],
) -> Option<F::Fs> {
  let mut root = fs_engine.instantiate(rule.ty);
  let n = rule.tofill.len();
  for (i, &arg) in rule.tofill.iter().enumerate() {
    let sub = daughter_fs.get(i)?;
    let is_final = i + 1 == n;
    root = unify_step(fs_engine, &root, arg, sub, is_final, del_attrs)?;
  }
  Some(root)
}

/// Execute one task against the chart, returning the new item it produces
/// on success (not yet allocated into the chart — the caller assigns its id
/// via `Chart::alloc`). Returns `None` on a blocked operand or a unification
/// failure, both routine outcomes tallied in `stats` rather than surfaced as
/// errors (§7).
pub fn execute<F, G>(
  task: &Task,
  chart: &Chart<F>,
  grammar: &G,
  fs_engine: &mut F,
  opts: &Options,
  stats: &mut ParseStats,
) -> Option<Item<F>>
where
  F: FeatureStructure,
  G: Grammar<F> + ?Sized,
{
  stats.tasks_executed += 1;

  let passive = chart.get(task.passive_id());
  if passive.blocked.is_blocked() {
    stats.tasks_filtered += 1;
    return None;
  }
  let passive_fs = passive.fs()?;

  let (rule_id, root_fs, mut daughters, nfilled) = match task {
    Task::RuleAndPassive { rule, .. } => {
      let rule_def = grammar.rule(*rule);
      let root = fs_engine.instantiate(rule_def.ty);
      (*rule, root, Vec::new(), 0usize)
    }
    Task::ActiveAndPassive { active, .. } => {
      let active_item = chart.get(*active);
      if active_item.blocked.is_blocked() {
        stats.tasks_filtered += 1;
        return None;
      }
      let rule = active_item.rule().expect("active task operand must be phrasal");
      let fs = active_item.fs().expect("active phrasal item has a fs").clone();
      (rule, fs, active_item.daughters.clone(), active_item.nfilled)
    }
  };

  let rule_def = grammar.rule(rule_id);
  let arg = rule_def.next_arg(nfilled).expect("task scheduled past rule's arity");
  let is_final = nfilled + 1 == rule_def.arity;
  let del_attrs = grammar.deleted_daughters();

  let new_fs = match unify_step(fs_engine, &root_fs, arg, passive_fs, is_final, del_attrs) {
    Some(fs) => {
      stats.unifications_succeeded += 1;
      fs
    }
    None => {
      stats.unifications_failed += 1;
      return None;
    }
  };

  daughters.push(task.passive_id());
  let remaining_tofill = rule_def.tofill[(nfilled + 1)..].to_vec();
  let new_nfilled = nfilled + 1;

  let start;
  let end;
  match task {
    Task::RuleAndPassive { .. } => {
      start = passive.start;
      end = passive.end;
    }
    Task::ActiveAndPassive { active, .. } => {
      let active_item = chart.get(*active);
      if active_item.left_extending(grammar) {
        start = passive.start;
        end = active_item.end;
      } else {
        start = active_item.start;
        end = passive.end;
      }
    }
  }

  let path_ids = match task {
    Task::RuleAndPassive { .. } => passive.path_ids.clone(),
    Task::ActiveAndPassive { active, .. } => {
      let active_item = chart.get(*active);
      combine_path_ids(&active_item.path_ids, &passive.path_ids)
    }
  };

  let trait_ = match rule_def.trait_ {
    crate::grammar::RuleTrait::Infl => ItemTrait::Infl,
    crate::grammar::RuleTrait::Lex => ItemTrait::Lex,
    crate::grammar::RuleTrait::Syntax => ItemTrait::Syntax,
  };

  // Infl rules consume their operand's pending-inflection-rule queue one
  // rule at a time (§4.A); every other rule class produces an item that is
  // already fully inflected.
  let new_inflrs_todo = if rule_def.trait_ == crate::grammar::RuleTrait::Infl {
    passive.inflrs_todo.get(1..).map(<[_]>::to_vec).unwrap_or_default()
  } else {
    Vec::new()
  };

  let new_item = Item {
    id: 0,
    start,
    end,
    external_start: start,
    external_end: end,
    trait_,
    tofill: remaining_tofill,
    nfilled: new_nfilled,
    inflrs_todo: new_inflrs_todo,
    daughters,
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

  stats.tasks_succeeded += 1;
  Some(new_item)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testkit::{toy_grammar, ToyFs};

  #[test]
  fn rule_and_passive_seeds_an_active_or_passive_item() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(3);
    let mut stats = ParseStats::new();
    let opts = Options::default();

    let leaf = chart.alloc(crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type()));
    chart.index_passive(leaf);

    let task = Task::RuleAndPassive { rule: grammar.unary_rule_id(), passive: leaf };
    let produced = execute(&task, &chart, &grammar, &mut fs_engine, &opts, &mut stats)
      .expect("unary rule should apply to a noun");
    assert!(produced.passive());
    assert_eq!(produced.start, 0);
    assert_eq!(produced.end, 1);
    assert_eq!(stats.tasks_succeeded, 1);
  }

  #[test]
  fn blocked_passive_operand_is_rejected() {
    let grammar = toy_grammar();
    let mut fs_engine = ToyFs::new();
    let mut chart = Chart::new(3);
    let mut stats = ParseStats::new();
    let opts = Options::default();

    let mut leaf = crate::testkit::leaf_item(&mut fs_engine, 0, 1, grammar.noun_type());
    leaf.block(Blocked::Frozen);
    let leaf_id = chart.alloc(leaf);
    chart.index_passive(leaf_id);

    let task = Task::RuleAndPassive { rule: grammar.unary_rule_id(), passive: leaf_id };
    assert!(execute(&task, &chart, &grammar, &mut fs_engine, &opts, &mut stats).is_none());
    assert_eq!(stats.tasks_filtered, 1);
  }
}
