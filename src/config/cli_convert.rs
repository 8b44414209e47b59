//! CLI to Config conversion utilities
//!
//! Resolves every setting from (in order of precedence) the CLI, the config
//! file, and the built-in defaults. The only system query is the physical
//! memory size, which is passed in so the conversion stays testable.

use crate::config::cli::Cli;
use crate::config::toml::FileConfig;
use crate::config::{
    BenchmarkConfig, CacheConfig, Config, SessionLimits, DEFAULT_BLOCK_SIZE,
    DEFAULT_CACHE_INTERVAL_SECS, DEFAULT_IOPS_BLOCK_SIZE, DEFAULT_IOPS_DURATION_SECS,
    DEFAULT_IOPS_WRITE_PERCENT,
};
use crate::util::memory::{default_dataset_bytes, gib_to_bytes};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("k") || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches("k"), 1024u64)
    } else if s.ends_with("m") || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches("m"), 1024 * 1024)
    } else if s.ends_with("g") || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches("g"), 1024 * 1024 * 1024)
    } else if s.ends_with("t") || s.ends_with("tb") {
        (s.trim_end_matches("tb").trim_end_matches("t"), 1024 * 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size too large: {}", s))
}

fn parse_block_size(s: Option<&str>, default: usize, what: &str) -> Result<usize> {
    match s {
        Some(s) => {
            let bytes = parse_size(s).with_context(|| format!("Invalid {}", what))?;
            usize::try_from(bytes).with_context(|| format!("{} too large: {}", what, s))
        }
        None => Ok(default),
    }
}

/// Build the session configuration
///
/// # Arguments
///
/// * `cli` - Parsed command line
/// * `file` - Parsed config file (`FileConfig::default()` when none was given)
/// * `physical_memory` - Total RAM in bytes, used only for the default dataset size
/// * `current_dir` - Default base directory
pub fn build_config(
    cli: &Cli,
    file: &FileConfig,
    physical_memory: u64,
    current_dir: PathBuf,
) -> Result<Config> {
    let bench = &file.benchmark;

    let workers = cli.threads.or(bench.threads).unwrap_or_else(num_cpus::get);

    let dataset_bytes = match cli.gb.or(bench.gb) {
        Some(gb) => gib_to_bytes(gb),
        None => default_dataset_bytes(physical_memory),
    };

    let block_size = parse_block_size(
        cli.block_size.as_deref().or(bench.block_size.as_deref()),
        DEFAULT_BLOCK_SIZE,
        "block size",
    )?;

    let iops_block_size = parse_block_size(
        cli.iops_block_size.as_deref().or(bench.iops_block_size.as_deref()),
        DEFAULT_IOPS_BLOCK_SIZE,
        "IOPS block size",
    )?;

    let benchmark = BenchmarkConfig {
        workers,
        dataset_bytes,
        iops_duration_secs: cli
            .iops_duration
            .or(bench.iops_duration)
            .unwrap_or(DEFAULT_IOPS_DURATION_SECS),
        base_dir: cli.dir.clone().or_else(|| bench.dir.clone()).unwrap_or(current_dir),
        block_size,
        iops_block_size,
        iops_write_percent: cli
            .iops_write_percent
            .or(bench.iops_write_percent)
            .unwrap_or(DEFAULT_IOPS_WRITE_PERCENT),
        verify: cli.verify || bench.verify.unwrap_or(false),
        keep_workspace: cli.keep || bench.keep.unwrap_or(false),
        seed: cli.seed.or(bench.seed),
        cache: CacheConfig {
            enabled: !cli.no_cache_flush && file.cache.enabled.unwrap_or(true),
            interval_secs: cli
                .cache_interval
                .or(file.cache.interval)
                .unwrap_or(DEFAULT_CACHE_INTERVAL_SECS),
        },
    };

    let defaults = SessionLimits::default();
    let session = SessionLimits {
        runs: cli.runs.or(file.session.runs).unwrap_or(defaults.runs),
        seconds: cli.seconds.or(file.session.seconds).unwrap_or(defaults.seconds),
    };

    Ok(Config { benchmark, session })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml::parse_toml_string;
    use crate::util::memory::GIB;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("64KB").unwrap(), 65536);
        assert_eq!(parse_size("1M").unwrap(), 1 << 20);
        assert_eq!(parse_size("2g").unwrap(), 2 << 30);
        assert_eq!(parse_size("512").unwrap(), 512);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("99999999999t").is_err());
    }

    #[test]
    fn test_defaults_from_memory() {
        let cli = Cli::default();
        let config =
            build_config(&cli, &FileConfig::default(), 8 * GIB, PathBuf::from("/work")).unwrap();

        assert_eq!(config.benchmark.workers, num_cpus::get());
        assert_eq!(config.benchmark.dataset_bytes, 16 * GIB);
        assert_eq!(config.benchmark.iops_duration_secs, 15.0);
        assert_eq!(config.benchmark.base_dir, PathBuf::from("/work"));
        assert_eq!(config.benchmark.block_size, 64 * 1024);
        assert_eq!(config.benchmark.iops_block_size, 4096);
        assert!(config.benchmark.cache.enabled);
        assert_eq!(config.benchmark.cache.interval_secs, 3.0);
        assert_eq!(config.session, SessionLimits { runs: 1, seconds: 0 });
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_toml_string(
            "[benchmark]\nthreads = 2\ngb = 1.0\nblock_size = \"128k\"\n[session]\nruns = 5\nseconds = 30\n",
        )
        .unwrap();
        let cli = Cli {
            threads: Some(6),
            seconds: Some(0),
            ..Cli::default()
        };

        let config = build_config(&cli, &file, 8 * GIB, PathBuf::from(".")).unwrap();
        assert_eq!(config.benchmark.workers, 6);
        assert_eq!(config.benchmark.dataset_bytes, GIB);
        assert_eq!(config.benchmark.block_size, 128 * 1024);
        assert_eq!(config.session.runs, 5);
        assert_eq!(config.session.seconds, 0);
    }

    #[test]
    fn test_no_cache_flush_flag_wins() {
        let file = parse_toml_string("[cache]\nenabled = true\n").unwrap();
        let cli = Cli {
            no_cache_flush: true,
            ..Cli::default()
        };
        let config = build_config(&cli, &file, GIB, PathBuf::from(".")).unwrap();
        assert!(!config.benchmark.cache.enabled);
    }

    #[test]
    fn test_fractional_gb() {
        let cli = Cli {
            gb: Some(0.25),
            ..Cli::default()
        };
        let config = build_config(&cli, &FileConfig::default(), GIB, PathBuf::from(".")).unwrap();
        assert_eq!(config.benchmark.dataset_bytes, GIB / 4);
    }

    #[test]
    fn test_invalid_block_size() {
        let cli = Cli {
            block_size: Some("huge".to_string()),
            ..Cli::default()
        };
        assert!(build_config(&cli, &FileConfig::default(), GIB, PathBuf::from(".")).is_err());
    }
}
