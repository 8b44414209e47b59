//! Metrics functions
//!
//! Throughput is reported in decimal megabytes (10^6 bytes) per second, while
//! sizes elsewhere (RAM, dataset size) are displayed in binary units. The two
//! conventions are intentionally kept apart.

use std::time::Duration;

/// Bytes in a decimal megabyte
pub const MEGABYTE: f64 = 1_000_000.0;

/// `amount / duration`, or 0.0 when the duration is zero
#[inline]
fn per_second(amount: f64, duration: Duration) -> f64 {
    match duration.as_secs_f64() {
        seconds if seconds > 0.0 => amount / seconds,
        _ => 0.0,
    }
}

/// Throughput in decimal megabytes per second
///
/// A zero-length phase reports 0.0 rather than infinity.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use diskspeed::util::time::megabytes_per_second;
///
/// assert_eq!(megabytes_per_second(1_000_000_000, Duration::from_secs(1)), 1000.0);
/// ```
pub fn megabytes_per_second(bytes: u64, duration: Duration) -> f64 {
    per_second(bytes as f64 / MEGABYTE, duration)
}

/// Operations per second; 0.0 for a zero-length phase
pub fn iops(operations: u64, duration: Duration) -> f64 {
    per_second(operations as f64, duration)
}
