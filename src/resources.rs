//! Resource accounting: wall-clock, memory, and passive-edge budgets that
//! bound a parse, an exhaustive unpack, or a selective unpack.
//!
//! A single [`Resources`] is shared by whichever stage is currently running.
//! `enter_stage` re-derives that stage's private deadline from the global
//! timeout and the stage's configured share of it; `exhausted` is polled
//! between tasks and between unpacker recursions, never inside one, since
//! every task in this engine runs to completion synchronously (§5).

use std::time::{Duration, Instant};

use crate::error::ParseError;

/// Which phase of the pipeline is currently charging against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  Parsing,
  ExhaustiveUnpack,
  SelectiveUnpack,
}

/// `Stage`'s share of the global timeout, as a fraction in `(0.0, 1.0]`.
/// Parsing gets the lion's share by default; the two unpackers split the
/// remainder, matching the stage percentages the engine reports in its
/// statistics.
#[derive(Debug, Clone, Copy)]
pub struct StageShares {
  pub parsing: f64,
  pub exhaustive_unpack: f64,
  pub selective_unpack: f64,
}

impl Default for StageShares {
  fn default() -> Self {
    Self {
      parsing: 0.8,
      exhaustive_unpack: 0.1,
      selective_unpack: 0.1,
    }
  }
}

impl StageShares {
  fn of(&self, stage: Stage) -> f64 {
    match stage {
      Stage::Parsing => self.parsing,
      Stage::ExhaustiveUnpack => self.exhaustive_unpack,
      Stage::SelectiveUnpack => self.selective_unpack,
    }
  }
}

/// Caps on a parse: wall-clock timeout, an approximate memory ceiling (in
/// bytes, tracked by the caller's own accounting since the fs arena is
/// external), and a passive-edge count. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resources {
  pedgelimit: Option<usize>,
  memlimit: Option<usize>,
  timeout: Option<Duration>,
  shares: StageShares,

  start: Option<Instant>,
  stage: Option<Stage>,
  stage_deadline: Option<Instant>,

  passive_edges: usize,
  mem_used: usize,
  fired: Option<&'static str>,
}

impl Resources {
  pub fn new(pedgelimit: Option<usize>, memlimit: Option<usize>, timeout: Option<Duration>) -> Self {
    Self {
      pedgelimit,
      memlimit,
      timeout,
      shares: StageShares::default(),
      ..Default::default()
    }
  }

  pub fn unlimited() -> Self {
    Self::new(None, None, None)
  }

  pub fn with_shares(mut self, shares: StageShares) -> Self {
    self.shares = shares;
    self
  }

  /// Start (or switch to) a stage. Must be called once per stage before
  /// `exhausted` is meaningful for that stage's own clock.
  pub fn enter_stage(&mut self, stage: Stage) {
    let now = Instant::now();
    if self.start.is_none() {
      self.start = Some(now);
    }
    self.stage = Some(stage);
    self.stage_deadline = self.timeout.map(|total| {
      let secs = total.as_secs_f64() * self.shares.of(stage);
      now + Duration::from_secs_f64(secs.max(0.0))
    });
  }

  pub fn record_passive_edge(&mut self) {
    self.passive_edges += 1;
  }

  /// Wall-clock time since the first `enter_stage` call, if one has
  /// happened yet. Used to timestamp `ParseStats::first_tree_time`.
  pub fn elapsed(&self) -> Option<Duration> {
    self.start.map(|s| Instant::now().duration_since(s))
  }

  pub fn passive_edges(&self) -> usize {
    self.passive_edges
  }

  /// Let the caller report an approximate memory delta (the fs arena is
  /// opaque to this crate, so it cannot be measured directly).
  pub fn record_memory(&mut self, bytes: usize) {
    self.mem_used = self.mem_used.saturating_add(bytes);
  }

  /// Poll the budget. Once a limit has fired it stays fired for the rest of
  /// this `Resources`' lifetime (a stage that resumes after exhaustion would
  /// just immediately re-trip it, so we cache the verdict).
  pub fn exhausted(&mut self) -> bool {
    if self.fired.is_some() {
      return true;
    }

    if let Some(limit) = self.pedgelimit {
      if self.passive_edges >= limit {
        self.fired = Some("passive edge limit");
        return true;
      }
    }

    if let Some(limit) = self.memlimit {
      if self.mem_used >= limit {
        self.fired = Some("memory limit");
        return true;
      }
    }

    if let Some(deadline) = self.stage_deadline {
      if Instant::now() >= deadline {
        self.fired = Some("timeout");
        return true;
      }
    }

    false
  }

  /// Describe whichever limit most recently fired, for building a
  /// [`ParseError::ResourceExhausted`].
  pub fn exhaustion_error(&self) -> Option<ParseError> {
    self
      .fired
      .map(|why| ParseError::ResourceExhausted(why.to_string()))
  }
}
