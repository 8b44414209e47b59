//! TOML configuration file parsing
//!
//! Every key is optional; anything left out falls back to the CLI or the
//! built-in defaults. Unknown keys are rejected so typos do not silently
//! change a benchmark.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of a config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub benchmark: BenchmarkSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// `[benchmark]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkSection {
    pub threads: Option<usize>,
    pub gb: Option<f64>,
    pub iops_duration: Option<f64>,
    pub dir: Option<PathBuf>,
    /// Size string, e.g. "64k"
    pub block_size: Option<String>,
    /// Size string, e.g. "4k"
    pub iops_block_size: Option<String>,
    pub iops_write_percent: Option<u8>,
    pub verify: Option<bool>,
    pub keep: Option<bool>,
    pub seed: Option<u64>,
}

/// `[cache]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub enabled: Option<bool>,
    /// Seconds between invalidation cycles
    pub interval: Option<f64>,
}

/// `[session]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    pub runs: Option<u32>,
    pub seconds: Option<u64>,
}

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<FileConfig> {
    let config: FileConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}
