//! Synchronous IO engine
//!
//! Uses blocking `pread`/`pwrite` syscalls on files opened through
//! `std::fs::OpenOptions`. No userspace buffering sits between the benchmark
//! and the kernel, so a completed `write_at` means the kernel has the data;
//! `sync_data` (fdatasync) then waits for the device.
//!
//! Partial transfers and `EINTR` are retried until the full requested amount
//! is transferred, end of file is reached (reads), or an error occurs.

use super::{EngineFile, IOEngine, OpenFlags};
use crate::Result;
use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Synchronous IO engine using pread/pwrite
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncEngine;

impl SyncEngine {
    pub fn new() -> Self {
        Self
    }
}

impl IOEngine for SyncEngine {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<Box<dyn EngineFile>> {
        let file = OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .create(flags.create)
            .truncate(flags.truncate)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Box::new(SyncFile {
            file,
            path: path.to_path_buf(),
        }))
    }

    fn name(&self) -> &'static str {
        "sync"
    }
}

/// File handle of the synchronous engine
pub struct SyncFile {
    file: File,
    path: PathBuf,
}

impl EngineFile for SyncFile {
    #[inline]
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let mut written = 0usize;

        while written < buf.len() {
            let remaining = &buf[written..];
            let position = offset + written as u64;

            // SAFETY: `remaining` is a valid slice for its whole length and
            // `fd` stays open for as long as `self.file` lives.
            let result = unsafe {
                libc::pwrite(
                    fd,
                    remaining.as_ptr() as *const libc::c_void,
                    remaining.len(),
                    position as libc::off_t,
                )
            };

            if result < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(err).with_context(|| {
                    format!(
                        "pwrite failed: {}, offset={}, length={}",
                        self.path.display(),
                        position,
                        remaining.len()
                    )
                });
            }

            if result == 0 {
                anyhow::bail!(
                    "pwrite wrote zero bytes: {}, offset={}",
                    self.path.display(),
                    position
                );
            }

            written += result as usize;
        }

        Ok(())
    }

    #[inline]
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let fd = self.file.as_raw_fd();
        let mut total_read = 0usize;

        while total_read < buf.len() {
            let remaining = &mut buf[total_read..];
            let position = offset + total_read as u64;

            // SAFETY: `remaining` is a valid, writable slice for its whole
            // length and `fd` stays open for as long as `self.file` lives.
            let result = unsafe {
                libc::pread(
                    fd,
                    remaining.as_mut_ptr() as *mut libc::c_void,
                    remaining.len(),
                    position as libc::off_t,
                )
            };

            if result < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(err).with_context(|| {
                    format!(
                        "pread failed: {}, offset={}, length={}",
                        self.path.display(),
                        position,
                        remaining.len()
                    )
                });
            }

            if result == 0 {
                // EOF
                break;
            }

            total_read += result as usize;
        }

        Ok(total_read)
    }

    fn sync_data(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .with_context(|| format!("fdatasync failed: {}", self.path.display()))
    }

    fn size(&self) -> Result<u64> {
        let metadata = self
            .file
            .metadata()
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shard.dat");
        let engine = SyncEngine::new();

        let mut file = engine.open(&path, OpenFlags::create_write()).unwrap();
        file.write_at(b"0123456789", 0).unwrap();
        file.write_at(b"ABCDE", 10).unwrap();
        file.sync_data().unwrap();
        assert_eq!(file.size().unwrap(), 15);
        drop(file);

        let mut file = engine.open(&path, OpenFlags::read_only()).unwrap();
        let mut buffer = vec![0u8; 5];
        assert_eq!(file.read_at(&mut buffer, 5).unwrap(), 5);
        assert_eq!(&buffer, b"56789");
    }

    #[test]
    fn test_read_stops_at_eof() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short.dat");
        std::fs::write(&path, b"abc").unwrap();

        let engine = SyncEngine::new();
        let mut file = engine.open(&path, OpenFlags::read_only()).unwrap();
        let mut buffer = vec![0u8; 8];
        assert_eq!(file.read_at(&mut buffer, 0).unwrap(), 3);
        assert_eq!(&buffer[..3], b"abc");
        assert_eq!(file.read_at(&mut buffer, 3).unwrap(), 0);
    }

    #[test]
    fn test_create_write_truncates_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reuse.dat");
        std::fs::write(&path, vec![1u8; 100]).unwrap();

        let engine = SyncEngine::new();
        let mut file = engine.open(&path, OpenFlags::create_write()).unwrap();
        file.write_at(b"xy", 0).unwrap();
        assert_eq!(file.size().unwrap(), 2);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let engine = SyncEngine::new();
        let err = engine
            .open(&temp_dir.path().join("missing.dat"), OpenFlags::read_only())
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("missing.dat"));
    }

    #[test]
    fn test_write_to_read_only_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ro.dat");
        std::fs::write(&path, b"data").unwrap();

        let engine = SyncEngine::new();
        let mut file = engine.open(&path, OpenFlags::read_only()).unwrap();
        assert!(file.write_at(b"nope", 0).is_err());
    }
}
