//! Results aggregation
//!
//! Collects one `RunResult` per completed run, in run order. Nothing is
//! averaged or summarized here; callers report the raw records however they
//! like.
//!
//! # Example
//!
//! ```
//! use diskspeed::stats::{Results, RunResult};
//!
//! let mut results = Results::new();
//! results.push(RunResult::default());
//! results.push(RunResult { io_operations: 7, ..RunResult::default() });
//!
//! assert_eq!(results.len(), 2);
//! assert_eq!(results.last().map(|r| r.io_operations), Some(7));
//! ```

use super::RunResult;
use serde::{Deserialize, Serialize};

/// Ordered, append-only sequence of run results
///
/// Only the session thread mutates it. Records are never reordered or
/// modified after being pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results {
    runs: Vec<RunResult>,
}

impl Results {
    /// Create an empty result sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the result of a completed run
    pub fn push(&mut self, result: RunResult) {
        self.runs.push(result);
    }

    /// Number of completed runs
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Most recently appended result
    pub fn last(&self) -> Option<&RunResult> {
        self.runs.last()
    }

    /// Results in run order
    pub fn as_slice(&self) -> &[RunResult] {
        &self.runs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RunResult> {
        self.runs.iter()
    }

    pub fn into_vec(self) -> Vec<RunResult> {
        self.runs
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a RunResult;
    type IntoIter = std::slice::Iter<'a, RunResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}
