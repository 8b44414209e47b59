//! Human-readable text output

use crate::stats::RunResult;
use std::io::{self, Write};

/// First line of human-readable output
pub fn banner() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Session settings line printed in verbose mode
///
/// Disk space is shown in binary megabytes.
pub fn settings_line(runs: u32, seconds: u64, threads: usize, dataset_bytes: u64) -> String {
    format!(
        "runs: {}, seconds: {}, threads: {}, disk space to use: {} MB",
        runs,
        seconds,
        threads,
        dataset_bytes >> 20
    )
}

/// The three rate lines of one run (decimal MB/s)
pub fn format_run(result: &RunResult) -> String {
    format!(
        "Sequential Write MB/s: {:.2}\nSequential Read MB/s: {:.2}\nIOPS: {:.0}\n",
        result.write_megabytes_per_second(),
        result.read_megabytes_per_second(),
        result.iops()
    )
}

/// Write the rate lines of one run and flush
pub fn write_run<W: Write>(out: &mut W, result: &RunResult) -> io::Result<()> {
    out.write_all(format_run(result).as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_banner() {
        assert_eq!(banner(), format!("diskspeed {}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_format_run() {
        let result = RunResult {
            written_bytes: 1_000_000_000,
            written_duration: Duration::from_secs(4),
            read_bytes: 1_000_000_000,
            read_duration: Duration::from_secs(3),
            io_operations: 1501,
            io_duration: Duration::from_secs(3),
        };
        assert_eq!(
            format_run(&result),
            "Sequential Write MB/s: 250.00\nSequential Read MB/s: 333.33\nIOPS: 500\n"
        );
    }

    #[test]
    fn test_settings_line_uses_binary_megabytes() {
        assert_eq!(
            settings_line(2, 30, 8, 3 << 30),
            "runs: 2, seconds: 30, threads: 8, disk space to use: 3072 MB"
        );
    }

    #[test]
    fn test_write_run() {
        let mut out = Vec::new();
        write_run(&mut out, &RunResult::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("Sequential Write MB/s: 0.00"));
    }
}
