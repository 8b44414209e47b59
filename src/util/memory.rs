//! Physical memory discovery and binary size conversions
//!
//! The total installed RAM is only used to pick the default dataset size
//! (twice the RAM, so that reads cannot be satisfied from the page cache).
//! It is never used to reject a configuration.

use crate::Result;
use anyhow::Context;
use std::fs;

/// Bytes in a binary mebibyte
pub const MIB: u64 = 1 << 20;

/// Bytes in a binary gibibyte
pub const GIB: u64 = 1 << 30;

/// Total installed physical memory in bytes
///
/// Uses `sysconf(_SC_PHYS_PAGES) * sysconf(_SC_PAGESIZE)` and falls back to
/// `MemTotal` from /proc/meminfo when sysconf cannot answer.
pub fn physical_memory_bytes() -> Result<u64> {
    if let Some(bytes) = sysconf_memory() {
        return Ok(bytes);
    }

    let meminfo = fs::read_to_string("/proc/meminfo")
        .context("Failed to determine physical memory: sysconf and /proc/meminfo unavailable")?;

    parse_meminfo_total(&meminfo)
        .ok_or_else(|| anyhow::anyhow!("MemTotal not found in /proc/meminfo"))
}

fn sysconf_memory() -> Option<u64> {
    // SAFETY: sysconf has no preconditions and only reads system constants.
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    if pages <= 0 || page_size <= 0 {
        return None;
    }

    (pages as u64).checked_mul(page_size as u64)
}

/// Parse the `MemTotal` line of /proc/meminfo into bytes
pub fn parse_meminfo_total(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        // MemTotal:       16318164 kB
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    })
}

/// Default dataset size: twice the physical memory, rounded down to whole MiB
pub fn default_dataset_bytes(physical_memory: u64) -> u64 {
    2 * (physical_memory / MIB) * MIB
}

/// Convert a (possibly fractional) GiB amount to bytes
pub fn gib_to_bytes(gib: f64) -> u64 {
    (gib * GIB as f64) as u64
}

/// Convert bytes to (fractional) GiB
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}
