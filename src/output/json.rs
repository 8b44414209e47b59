//! JSON output formatting
//!
//! One object per session, written as a single line when the session ends.
//! Field names and units match the report format of earlier diskspeed
//! releases: byte counts as integers, per-run durations as integer
//! nanoseconds, `IODuration` at the top level as fractional seconds.

use crate::coordinator::SessionReport;
use crate::stats::Results;
use crate::util::memory::bytes_to_gib;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Machine-readable session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonReport {
    pub start: DateTime<Utc>,
    /// Total RAM in bytes
    pub physical_memory: u64,
    pub num_readers_writers: usize,
    #[serde(rename = "AggregateTestFilesSizeInGiB")]
    pub aggregate_test_files_size_in_gib: f64,
    /// Configured IOPS phase duration in seconds
    #[serde(rename = "IODuration")]
    pub io_duration: f64,
    pub temp_dir: PathBuf,
    pub results: Results,
}

impl JsonReport {
    pub fn from_session(report: &SessionReport, physical_memory: u64) -> Self {
        Self {
            start: report.start,
            physical_memory,
            num_readers_writers: report.config.workers,
            aggregate_test_files_size_in_gib: bytes_to_gib(report.config.dataset_bytes),
            io_duration: report.config.iops_duration_secs,
            temp_dir: report.workspace_dir.clone(),
            results: report.results.clone(),
        }
    }
}

/// Write `report` as one line of JSON followed by a newline
pub fn write_report<W: Write>(mut out: W, report: &JsonReport) -> Result<()> {
    serde_json::to_writer(&mut out, report)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchmarkConfig;
    use crate::stats::RunResult;
    use std::time::Duration;

    fn session_report() -> SessionReport {
        let mut results = Results::new();
        results.push(RunResult {
            written_bytes: 4096,
            written_duration: Duration::from_millis(2),
            read_bytes: 4096,
            read_duration: Duration::from_millis(1),
            io_operations: 12,
            io_duration: Duration::from_millis(500),
        });

        let mut config = BenchmarkConfig::new(4, 3 << 29, PathBuf::from("/scratch"));
        config.iops_duration_secs = 0.5;

        SessionReport {
            start: Utc::now(),
            config,
            workspace_dir: PathBuf::from("/scratch/diskspeed-abc"),
            results,
        }
    }

    #[test]
    fn test_report_keys() {
        let report = JsonReport::from_session(&session_report(), 8 << 30);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["PhysicalMemory"], 8u64 << 30);
        assert_eq!(json["NumReadersWriters"], 4);
        assert_eq!(json["AggregateTestFilesSizeInGiB"], 1.5);
        assert_eq!(json["IODuration"], 0.5);
        assert_eq!(json["TempDir"], "/scratch/diskspeed-abc");
        assert!(json["Start"].is_string());
        assert_eq!(json["Results"][0]["IODuration"], 500_000_000u64);
        assert_eq!(json["Results"][0]["IOOperations"], 12);
    }

    #[test]
    fn test_write_report_is_one_line() {
        let report = JsonReport::from_session(&session_report(), 1 << 30);
        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);

        let parsed: JsonReport = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed, report);
    }
}
