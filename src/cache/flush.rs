//! Page cache flush mechanisms
//!
//! `PerFile` asks the kernel to drop the cached pages of each file in the
//! workspace (`posix_fadvise(POSIX_FADV_DONTNEED)`, Linux only). `System`
//! drops the whole page cache: `sync` + `/proc/sys/vm/drop_caches` on Linux
//! (needs root), `purge` on macOS.

use crate::Result;
use anyhow::Context;
use std::path::Path;

/// One cache invalidation attempt
///
/// Called from the invalidator thread only, so implementations may keep
/// mutable state without synchronization.
pub trait CacheFlush: Send + 'static {
    /// Drop cached pages for the files under `dir`
    ///
    /// Returns the number of files handled (0 for system-wide mechanisms).
    fn flush(&mut self, dir: &Path) -> Result<usize>;
}

/// Strategy used by `PageCacheFlush`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStrategy {
    /// Drop pages of each workspace file
    PerFile,
    /// Drop the whole page cache
    System,
}

impl Default for FlushStrategy {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            FlushStrategy::PerFile
        } else {
            FlushStrategy::System
        }
    }
}

/// Operating system page cache flush
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCacheFlush {
    strategy: FlushStrategy,
}

impl PageCacheFlush {
    pub fn new(strategy: FlushStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> FlushStrategy {
        self.strategy
    }
}

impl CacheFlush for PageCacheFlush {
    fn flush(&mut self, dir: &Path) -> Result<usize> {
        match self.strategy {
            FlushStrategy::PerFile => flush_files(dir),
            FlushStrategy::System => flush_system().map(|_| 0),
        }
    }
}

/// Drop cached pages of every regular file directly under `dir`
///
/// Keeps going after a per-file failure and reports the first one.
#[cfg(target_os = "linux")]
pub fn flush_files(dir: &Path) -> Result<usize> {
    use std::os::unix::io::AsRawFd;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut flushed = 0;
    let mut first_error = None;

    for entry in entries.flatten() {
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let result = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))
            .and_then(|file| {
                // SAFETY: the fd is valid for the lifetime of `file`.
                let rc = unsafe {
                    libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED)
                };
                if rc != 0 {
                    let err = std::io::Error::from_raw_os_error(rc);
                    return Err(err).with_context(|| {
                        format!("posix_fadvise(DONTNEED) failed for {}", path.display())
                    });
                }
                Ok(())
            });

        match result {
            Ok(()) => flushed += 1,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(flushed),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn flush_files(dir: &Path) -> Result<usize> {
    anyhow::bail!(
        "per-file cache invalidation is not supported on this platform ({})",
        dir.display()
    )
}

/// Drop the whole page cache
#[cfg(target_os = "linux")]
pub fn flush_system() -> Result<()> {
    // SAFETY: sync() has no preconditions.
    unsafe { libc::sync() };
    std::fs::write("/proc/sys/vm/drop_caches", b"3\n")
        .context("Failed to write /proc/sys/vm/drop_caches (requires root)")
}

#[cfg(target_os = "macos")]
pub fn flush_system() -> Result<()> {
    let status = std::process::Command::new("purge")
        .status()
        .context("Failed to run purge")?;
    if !status.success() {
        anyhow::bail!("purge exited with {}", status);
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn flush_system() -> Result<()> {
    anyhow::bail!("system cache invalidation is not supported on this platform")
}
