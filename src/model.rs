//! The stochastic (log-linear) scoring model external interface.
//!
//! The model *file format* and its reader are out of scope (§1); this
//! module only describes the scoring contract the engine relies on to order
//! the agenda (§4.D) and to rank hypotheses during selective unpacking
//! (§4.I).

use crate::fs::FeatureStructure;
use crate::grammar::RuleId;

/// Everything `score_hypothesis` needs to deterministically score one
/// hypothesis along one grandparent path, without the model needing to know
/// about this engine's internal `Hypothesis`/`ItemId` representation.
pub struct HypothesisScoringContext<'a> {
  pub rule: RuleId,
  /// This hypothesis's daughters' own scores along the same (truncated)
  /// path, in argument order.
  pub daughter_scores: &'a [f64],
  /// Length of the grandparent path this score is being computed for, after
  /// truncation to `gplevel`.
  pub path_len: usize,
}

/// A loaded scoring model. `F` is the feature-structure engine whose `Fs`
/// handles this model can inspect.
pub trait StochasticModel<F: FeatureStructure> {
  /// Score the local tree `rule(daughters...)` would produce, queried
  /// before a task is even enqueued so the agenda can be ordered by model
  /// score (§4.D).
  fn score_local_tree(&self, rule: RuleId, daughters: &[F::Fs]) -> f64;

  /// Initial score for a lexical item at the leaves, before any rule has
  /// applied.
  fn score_leaf(&self, stem_fs: &F::Fs) -> f64;

  /// Score one hypothesis along one grandparent path (§4.I). Must be a
  /// deterministic, finite function of `ctx` — NaN scores are rejected at
  /// agenda-insertion time.
  fn score_hypothesis(&self, ctx: &HypothesisScoringContext) -> f64;
}
