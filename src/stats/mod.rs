//! Run results
//!
//! A `RunResult` holds the raw counts and durations of one complete run
//! (write, read and IOPS phase). Rates are derived on demand through the
//! metrics functions in `util::time`, so the record itself never stores a
//! rounded number.
//!
//! Results serialize with the field names of the machine-readable report,
//! durations as integer nanoseconds.
//!
//! # Example
//!
//! ```
//! use diskspeed::stats::RunResult;
//! use std::time::Duration;
//!
//! let result = RunResult {
//!     written_bytes: 2_000_000_000,
//!     written_duration: Duration::from_secs(2),
//!     read_bytes: 2_000_000_000,
//!     read_duration: Duration::from_secs(1),
//!     io_operations: 1500,
//!     io_duration: Duration::from_secs(3),
//! };
//! assert_eq!(result.write_megabytes_per_second(), 1000.0);
//! assert_eq!(result.read_megabytes_per_second(), 2000.0);
//! assert_eq!(result.iops(), 500.0);
//! ```

pub mod aggregator;

pub use aggregator::Results;

use crate::util::time::{iops, megabytes_per_second};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counts and durations of one completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunResult {
    pub written_bytes: u64,
    #[serde(with = "duration_nanos")]
    pub written_duration: Duration,
    pub read_bytes: u64,
    #[serde(with = "duration_nanos")]
    pub read_duration: Duration,
    #[serde(rename = "IOOperations")]
    pub io_operations: u64,
    #[serde(rename = "IODuration", with = "duration_nanos")]
    pub io_duration: Duration,
}

impl RunResult {
    /// Sequential write throughput in decimal MB/s
    pub fn write_megabytes_per_second(&self) -> f64 {
        megabytes_per_second(self.written_bytes, self.written_duration)
    }

    /// Sequential read throughput in decimal MB/s
    pub fn read_megabytes_per_second(&self) -> f64 {
        megabytes_per_second(self.read_bytes, self.read_duration)
    }

    /// Random operations per second
    pub fn iops(&self) -> f64 {
        iops(self.io_operations, self.io_duration)
    }
}

/// Serialize a `Duration` as integer nanoseconds
mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = u64::try_from(duration.as_nanos()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
