//! Structured errors for the parsing engine.
//!
//! Routine per-task failures (unification failure) are never surfaced here;
//! they are counted in [`crate::stats::ParseStats`] instead. What lands in an
//! [`ErrorList`] are the conditions a caller needs to branch on: a fatal
//! input problem, a resource budget firing mid-parse, a grammar that
//! violates its own invariants, or the (non-fatal) observation that parsing
//! finished with no readings.

use std::fmt;

use thiserror::Error;

/// Severity of a [`ParseError`].
///
/// `Fatal` means no chart was built (or the chart built so far must be
/// discarded); `Recoverable` means the caller may still use whatever
/// readings were already collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Fatal,
  Recoverable,
}

/// A single error or diagnostic produced during a parse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
  /// Malformed input tokens, or no tokens at all. Fatal: no chart is built.
  #[error("input error: {0}")]
  Input(String),

  /// A time, memory, or passive-edge limit fired before the agenda drained.
  /// Recoverable: any trees already found remain valid.
  #[error("resource exhausted: {0}")]
  ResourceExhausted(String),

  /// A rule's arguments could not be resolved against the grammar's own
  /// declarations (arity/trait mismatch the filters should have caught).
  /// Fatal for this parse.
  #[error("rule invariant violated: {0}")]
  RuleInvariantViolation(String),

  /// Parsing completed but produced no tree. Not an error in the sense of
  /// aborting anything; returned as a diagnostic alongside an empty
  /// readings list.
  #[error("no readings found: {0}")]
  NoReadings(String),
}

impl ParseError {
  pub fn severity(&self) -> Severity {
    match self {
      ParseError::Input(_) => Severity::Fatal,
      ParseError::ResourceExhausted(_) => Severity::Recoverable,
      ParseError::RuleInvariantViolation(_) => Severity::Fatal,
      ParseError::NoReadings(_) => Severity::Recoverable,
    }
  }

  pub fn is_fatal(&self) -> bool {
    self.severity() == Severity::Fatal
  }
}

/// The error/diagnostic list returned alongside every parse's chart.
///
/// A non-empty [`Chart::readings`](crate::chart::Chart::readings) and a
/// non-empty `ErrorList` are not mutually exclusive: a `ResourceExhausted`
/// entry here never invalidates readings already collected before the
/// budget fired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorList(Vec<ParseError>);

impl ErrorList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, err: ParseError) {
    self.0.push(err);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
    self.0.iter()
  }

  /// True if any entry in the list is fatal.
  pub fn has_fatal(&self) -> bool {
    self.0.iter().any(ParseError::is_fatal)
  }
}

impl IntoIterator for ErrorList {
  type Item = ParseError;
  type IntoIter = std::vec::IntoIter<ParseError>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl fmt::Display for ErrorList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.0.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      write!(f, "{}", e)?;
    }
    Ok(())
  }
}
