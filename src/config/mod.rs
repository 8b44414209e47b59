//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! The benchmark engine consumes a fully-resolved `BenchmarkConfig`; the outer
//! loop consumes `SessionLimits`.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default random payload block size (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default IOPS operation size (4 KiB)
pub const DEFAULT_IOPS_BLOCK_SIZE: usize = 4 * 1024;

/// Default IOPS phase duration in seconds
pub const DEFAULT_IOPS_DURATION_SECS: f64 = 15.0;

/// Default share of IOPS operations that are writes
pub const DEFAULT_IOPS_WRITE_PERCENT: u8 = 10;

/// Default cache invalidation interval in seconds
pub const DEFAULT_CACHE_INTERVAL_SECS: f64 = 3.0;

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub benchmark: BenchmarkConfig,
    pub session: SessionLimits,
}

/// Immutable per-session benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of concurrent readers/writers (one file each)
    pub workers: usize,
    /// Total dataset size across all workers, in bytes
    pub dataset_bytes: u64,
    /// IOPS phase duration in seconds
    pub iops_duration_secs: f64,
    /// Directory under which the workspace is created
    pub base_dir: PathBuf,
    /// Size of the random payload block written by sequential writers
    pub block_size: usize,
    /// Size of each IOPS operation
    pub iops_block_size: usize,
    /// Percentage of IOPS operations that are writes (rest are reads)
    pub iops_write_percent: u8,
    /// Verify read-back content against the payload block
    pub verify: bool,
    /// Keep the workspace directory after the session
    pub keep_workspace: bool,
    /// Seed for the IOPS offset generator
    pub seed: Option<u64>,
    pub cache: CacheConfig,
}

impl BenchmarkConfig {
    /// Configuration with default tuning for the given workers, size and directory
    pub fn new(workers: usize, dataset_bytes: u64, base_dir: PathBuf) -> Self {
        Self {
            workers,
            dataset_bytes,
            iops_duration_secs: DEFAULT_IOPS_DURATION_SECS,
            base_dir,
            block_size: DEFAULT_BLOCK_SIZE,
            iops_block_size: DEFAULT_IOPS_BLOCK_SIZE,
            iops_write_percent: DEFAULT_IOPS_WRITE_PERCENT,
            verify: false,
            keep_workspace: false,
            seed: None,
            cache: CacheConfig::default(),
        }
    }

    pub fn iops_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.iops_duration_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Cache invalidator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Run the background cache invalidator
    pub enabled: bool,
    /// Seconds between invalidation cycles
    pub interval_secs: f64,
}

impl CacheConfig {
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_CACHE_INTERVAL_SECS,
        }
    }
}

/// Outer loop termination controls
///
/// The session keeps running while fewer than `runs` runs have completed OR
/// the `seconds` budget has not elapsed. Both limits must be exhausted before
/// the session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLimits {
    pub runs: u32,
    pub seconds: u64,
}

impl SessionLimits {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { runs: 1, seconds: 0 }
    }
}
