//! IO engine abstraction
//!
//! An IO engine opens shard files and performs positioned reads and writes on
//! them. Benchmark phases only talk to the `IOEngine` trait, so the same phase
//! code runs against real files (`sync::SyncEngine`) or against an in-memory
//! engine with fault injection (`mock::MockEngine`).
//!
//! # Example
//!
//! ```no_run
//! use diskspeed::engine::{IOEngine, OpenFlags};
//! use diskspeed::engine::sync::SyncEngine;
//! use std::path::Path;
//!
//! let engine = SyncEngine::new();
//! let mut file = engine.open(Path::new("/tmp/shard-0.dat"), OpenFlags::create_write())?;
//! file.write_at(b"payload", 0)?;
//! file.sync_data()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::Result;
use std::path::Path;

/// IO engine trait for all backends
///
/// Engines are shared by reference between all workers of a phase, so they
/// must be `Send + Sync`. The files they hand out are owned by a single worker.
pub trait IOEngine: Send + Sync {
    /// Open (and optionally create/truncate) a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened with the given flags.
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<Box<dyn EngineFile>>;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// A file opened by an engine
///
/// Each worker owns its file exclusively; no two workers ever share one.
pub trait EngineFile: Send {
    /// Write the whole buffer at `offset`
    ///
    /// Partial writes are retried internally; the call either transfers every
    /// byte or fails.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()>;

    /// Read into the buffer from `offset`
    ///
    /// Fills the whole buffer unless end of file is reached first. Returns the
    /// number of bytes read (0 at end of file).
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Flush file data to the device
    fn sync_data(&mut self) -> Result<()>;

    /// Current file size in bytes
    fn size(&self) -> Result<u64>;
}

/// How to open a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    /// Create (or truncate) a file for sequential writing
    pub fn create_write() -> Self {
        Self {
            read: false,
            write: true,
            create: true,
            truncate: true,
        }
    }

    /// Open an existing file for reading
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Open an existing file for mixed random reads and writes
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }
}

/// Operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Open,
    Read,
    Write,
    Sync,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Open => write!(f, "open"),
            OperationType::Read => write!(f, "read"),
            OperationType::Write => write!(f, "write"),
            OperationType::Sync => write!(f, "sync"),
        }
    }
}

pub mod mock;
pub mod sync;
