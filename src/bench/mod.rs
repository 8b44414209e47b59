//! Benchmark phases
//!
//! One run of the benchmark is three phases executed in order, each fanned
//! out over every worker shard:
//!
//! 1. **Sequential write**: each worker fills its shard with the repeated
//!    payload block and syncs it
//! 2. **Sequential read**: each worker reads its shard back (after the cache
//!    has been invalidated)
//! 3. **IOPS**: each worker issues small aligned operations at uniformly
//!    random offsets of its shard until a shared deadline
//!
//! Phases only see the `IOEngine` trait, so tests run them against
//! `MockEngine` with injected faults as well as against real files.

pub mod iops;
pub mod sequential;

pub use iops::{run_iops_phase, IopsOutcome, IopsSettings};
pub use sequential::{run_read_phase, run_write_phase, SequentialOutcome};

use std::fmt;

/// Benchmark phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SequentialWrite,
    SequentialRead,
    Iops,
}

impl Phase {
    /// Prefix of the worker thread names of this phase
    pub fn worker_name(&self) -> &'static str {
        match self {
            Phase::SequentialWrite => "seq-write",
            Phase::SequentialRead => "seq-read",
            Phase::Iops => "iops",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SequentialWrite => write!(f, "sequential write"),
            Phase::SequentialRead => write!(f, "sequential read"),
            Phase::Iops => write!(f, "IOPS"),
        }
    }
}
