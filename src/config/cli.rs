//! CLI argument parsing using clap
//!
//! Options that can also come from a config file are `Option`s so that an
//! unset flag does not override the file.

use clap::Parser;
use std::path::PathBuf;

/// diskspeed - disk throughput and IOPS benchmark
///
/// Writes and reads back a dataset larger than physical memory through
/// concurrent workers, then measures random IOPS, repeating as requested.
#[derive(Parser, Debug, Default)]
#[command(name = "diskspeed")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print JSON-formatted results to stdout
    #[arg(short = 'j', long)]
    pub json: bool,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Session Options ===
    /// The number of test runs [default: 1]
    #[arg(short = 'r', long)]
    pub runs: Option<u32>,

    /// The time in seconds to run the test [default: 0]
    #[arg(short = 's', long)]
    pub seconds: Option<u64>,

    // === Workload Options ===
    /// The number of concurrent readers/writers [default: number of CPU cores]
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// The amount of disk space to use in GiB [default: twice the physical RAM]
    #[arg(short = 'g', long)]
    pub gb: Option<f64>,

    /// The duration in seconds to run the IOPS benchmark; 0.5 gives quick feedback [default: 15]
    #[arg(short = 'i', long)]
    pub iops_duration: Option<f64>,

    /// The directory to use for the test [default: current directory]
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// Size of the random block written by sequential writers (e.g., 64k, 1M)
    #[arg(long)]
    pub block_size: Option<String>,

    /// Size of each IOPS operation (e.g., 4k)
    #[arg(long)]
    pub iops_block_size: Option<String>,

    /// Percentage of IOPS operations that are writes (0-100) [default: 10]
    #[arg(long)]
    pub iops_write_percent: Option<u8>,

    /// Seed for IOPS offsets (reproducible access pattern)
    #[arg(long)]
    pub seed: Option<u64>,

    // === Cache Options ===
    /// Seconds between page cache invalidation cycles [default: 3]
    #[arg(long)]
    pub cache_interval: Option<f64>,

    /// Do not run the background page cache invalidator
    #[arg(long)]
    pub no_cache_flush: bool,

    // === Data Options ===
    /// Verify read-back data against the written pattern
    #[arg(long)]
    pub verify: bool,

    /// Keep the test directory after the run
    #[arg(long)]
    pub keep: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that clap cannot check on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.threads == Some(0) {
            anyhow::bail!("threads must be at least 1");
        }

        if let Some(gb) = self.gb {
            if !gb.is_finite() || gb <= 0.0 {
                anyhow::bail!("gb must be a positive number, got {}", gb);
            }
        }

        if let Some(p) = self.iops_write_percent {
            if p > 100 {
                anyhow::bail!("iops_write_percent must be between 0 and 100, got {}", p);
            }
        }

        Ok(())
    }
}
