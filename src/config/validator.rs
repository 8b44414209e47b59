//! Configuration validation
//!
//! Runs before any phase starts so that configuration errors surface without
//! touching the filesystem beyond a metadata lookup of the base directory.

use super::*;
use anyhow::{Context, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_benchmark(&config.benchmark)?;
    Ok(())
}

/// Validate benchmark configuration
pub fn validate_benchmark(bench: &BenchmarkConfig) -> Result<()> {
    if bench.workers == 0 {
        anyhow::bail!("worker count must be at least 1");
    }

    if bench.dataset_bytes == 0 {
        anyhow::bail!("dataset size must be greater than 0");
    }

    validate_block_sizes(bench)?;

    if bench.iops_write_percent > 100 {
        anyhow::bail!(
            "iops_write_percent must be between 0 and 100, got {}",
            bench.iops_write_percent
        );
    }

    if !bench.iops_duration_secs.is_finite() || bench.iops_duration_secs < 0.0 {
        anyhow::bail!(
            "iops duration must be a non-negative number of seconds, got {}",
            bench.iops_duration_secs
        );
    }

    validate_cache(&bench.cache)?;
    validate_base_dir(bench)?;

    Ok(())
}

fn validate_block_sizes(bench: &BenchmarkConfig) -> Result<()> {
    if bench.block_size == 0 {
        anyhow::bail!("block size must be greater than 0");
    }

    if bench.iops_block_size == 0 {
        anyhow::bail!("IOPS block size must be greater than 0");
    }

    // IOPS writes reuse the slice of the payload the sequential writer put
    // at the same offset, which needs the IOPS size to tile the block.
    if bench.iops_block_size > bench.block_size || bench.block_size % bench.iops_block_size != 0 {
        anyhow::bail!(
            "IOPS block size ({}) must evenly divide block size ({})",
            bench.iops_block_size,
            bench.block_size
        );
    }

    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<()> {
    if cache.enabled && (!cache.interval_secs.is_finite() || cache.interval_secs <= 0.0) {
        anyhow::bail!(
            "cache interval must be a positive number of seconds, got {}",
            cache.interval_secs
        );
    }
    Ok(())
}

fn validate_base_dir(bench: &BenchmarkConfig) -> Result<()> {
    let metadata = std::fs::metadata(&bench.base_dir)
        .with_context(|| format!("Cannot access directory {}", bench.base_dir.display()))?;

    if !metadata.is_dir() {
        anyhow::bail!("{} is not a directory", bench.base_dir.display());
    }

    Ok(())
}
