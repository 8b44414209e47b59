//! diskspeed - disk throughput and IOPS benchmark
//!
//! diskspeed measures sequential write bandwidth, sequential read bandwidth
//! and random small-operation rate (IOPS) of the storage behind a directory,
//! while keeping the OS page cache from flattering the read numbers.
//!
//! # Architecture
//!
//! - **Session** (`coordinator`): owns the workspace, the cache invalidator
//!   and the results; repeats runs until the run count and time budget are
//!   both exhausted
//! - **Phases** (`bench`): sequential write, sequential read and IOPS, each
//!   fanned out over N workers released together (`worker`)
//! - **IO engines** (`engine`): positioned IO on real files, or an in-memory
//!   engine with fault injection for tests
//! - **Cache invalidation** (`cache`): background thread dropping cached
//!   pages of the test files
//! - **Results** (`stats`): one raw record per run, rates derived on demand

pub mod bench;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod engine;
pub mod output;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::{BenchmarkConfig, Config, SessionLimits};
pub use coordinator::{Session, SessionError, SessionReport};
pub use engine::IOEngine;
pub use stats::{Results, RunResult};

/// Result type used throughout diskspeed
pub type Result<T> = anyhow::Result<T>;
