//! Per-parse statistics, reported alongside the chart so callers (and our
//! own tests, via P3/P4/P5) can inspect what the engine actually did.

use std::time::Duration;

/// Counters accumulated over the lifetime of one parse session, one
/// exhaustive unpack, or one selective unpack. Fields are public and
/// additive; the session increments them as it goes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParseStats {
  pub passive_edges: usize,
  pub tasks_executed: usize,
  pub tasks_filtered: usize,
  pub tasks_succeeded: usize,

  pub subsumptions_succeeded: usize,
  pub subsumptions_failed: usize,
  pub unifications_succeeded: usize,
  pub unifications_failed: usize,

  pub packed_equivalent: usize,
  pub packed_proactive: usize,
  pub packed_retroactive: usize,
  pub frozen: usize,

  pub first_tree_time: Option<Duration>,
  pub total_cpu_time: Duration,

  pub unpack_edges: usize,
  pub unpack_failures: usize,
}

impl ParseStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn total_packed(&self) -> usize {
    self.packed_equivalent + self.packed_proactive + self.packed_retroactive
  }
}
