//! Mock IO engine for testing
//!
//! Keeps file contents in memory and never touches the filesystem. Faults can
//! be injected per path and operation type, which lets tests check that a
//! single failing worker aborts a whole run.
//!
//! # Example
//!
//! ```
//! use diskspeed::engine::{IOEngine, OpenFlags, OperationType};
//! use diskspeed::engine::mock::{MockEngine, MockFault};
//! use std::path::Path;
//!
//! let engine = MockEngine::new();
//! engine.inject(MockFault::new(Path::new("/w/shard-1.dat"), OperationType::Write));
//!
//! let mut ok = engine.open(Path::new("/w/shard-0.dat"), OpenFlags::create_write()).unwrap();
//! assert!(ok.write_at(b"data", 0).is_ok());
//!
//! let mut bad = engine.open(Path::new("/w/shard-1.dat"), OpenFlags::create_write()).unwrap();
//! assert!(bad.write_at(b"data", 0).is_err());
//! ```

use super::{EngineFile, IOEngine, OpenFlags, OperationType};
use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A fault to inject into the mock engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFault {
    /// File the fault applies to
    pub path: PathBuf,
    /// Operation that fails
    pub op_type: OperationType,
    /// Bytes of this operation type allowed to succeed before failing
    pub after_bytes: u64,
}

impl MockFault {
    /// Fail the first `op_type` operation on `path`
    pub fn new(path: &Path, op_type: OperationType) -> Self {
        Self {
            path: path.to_path_buf(),
            op_type,
            after_bytes: 0,
        }
    }

    /// Fail only once `bytes` bytes have been transferred
    pub fn after_bytes(mut self, bytes: u64) -> Self {
        self.after_bytes = bytes;
        self
    }
}

#[derive(Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    faults: Vec<MockFault>,
}

/// In-memory IO engine with fault injection
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    reads: Arc<AtomicU64>,
    writes: Arc<AtomicU64>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fault; it stays active until `clear_faults`
    pub fn inject(&self, fault: MockFault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Contents of a file, if it exists
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    /// Number of files created so far
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    /// Total `read_at` calls across all files
    pub fn read_calls(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total `write_at` calls across all files
    pub fn write_calls(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_fault(
    state: &MockState,
    path: &Path,
    op_type: OperationType,
    transferred: u64,
) -> Result<()> {
    let tripped = state
        .faults
        .iter()
        .any(|f| f.path == path && f.op_type == op_type && transferred >= f.after_bytes);
    if tripped {
        anyhow::bail!("injected {} fault: {}", op_type, path.display());
    }
    Ok(())
}

impl IOEngine for MockEngine {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<Box<dyn EngineFile>> {
        let mut state = self.lock();
        check_fault(&state, path, OperationType::Open, 0)?;

        if !state.files.contains_key(path) && !flags.create {
            anyhow::bail!("Failed to open {}: no such file", path.display());
        }
        let data = state.files.entry(path.to_path_buf()).or_default();
        if flags.truncate {
            data.clear();
        }

        Ok(Box::new(MockFile {
            engine: self.clone(),
            path: path.to_path_buf(),
            flags,
            read_bytes: 0,
            written_bytes: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// File handle of the mock engine
pub struct MockFile {
    engine: MockEngine,
    path: PathBuf,
    flags: OpenFlags,
    read_bytes: u64,
    written_bytes: u64,
}

impl EngineFile for MockFile {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.engine.writes.fetch_add(1, Ordering::Relaxed);
        if !self.flags.write {
            anyhow::bail!("{} not opened for writing", self.path.display());
        }

        let mut state = self.engine.lock();
        check_fault(&state, &self.path, OperationType::Write, self.written_bytes)?;

        let data = state.files.entry(self.path.clone()).or_default();
        let start = offset as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.written_bytes += buf.len() as u64;
        Ok(())
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.engine.reads.fetch_add(1, Ordering::Relaxed);
        if !self.flags.read {
            anyhow::bail!("{} not opened for reading", self.path.display());
        }

        let state = self.engine.lock();
        check_fault(&state, &self.path, OperationType::Read, self.read_bytes)?;

        let data = state
            .files
            .get(&self.path)
            .ok_or_else(|| anyhow::anyhow!("{} was removed", self.path.display()))?;
        let start = (offset as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.read_bytes += n as u64;
        Ok(n)
    }

    fn sync_data(&mut self) -> Result<()> {
        let state = self.engine.lock();
        check_fault(&state, &self.path, OperationType::Sync, 0)
    }

    fn size(&self) -> Result<u64> {
        let state = self.engine.lock();
        Ok(state.files.get(&self.path).map_or(0, |d| d.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_round_trip() {
        let engine = MockEngine::new();
        let path = Path::new("/mock/a.dat");

        let mut file = engine.open(path, OpenFlags::create_write()).unwrap();
        file.write_at(b"hello", 0).unwrap();
        file.write_at(b"world", 5).unwrap();
        drop(file);

        let mut file = engine.open(path, OpenFlags::read_only()).unwrap();
        let mut buffer = [0u8; 10];
        assert_eq!(file.read_at(&mut buffer, 0).unwrap(), 10);
        assert_eq!(&buffer, b"helloworld");
        assert_eq!(engine.write_calls(), 2);
        assert_eq!(engine.read_calls(), 1);
    }

    #[test]
    fn test_mock_open_missing_without_create() {
        let engine = MockEngine::new();
        assert!(engine.open(Path::new("/mock/none"), OpenFlags::read_only()).is_err());
    }

    #[test]
    fn test_mock_fault_after_bytes() {
        let engine = MockEngine::new();
        let path = Path::new("/mock/b.dat");
        engine.inject(MockFault::new(path, OperationType::Write).after_bytes(8));

        let mut file = engine.open(path, OpenFlags::create_write()).unwrap();
        file.write_at(&[0u8; 4], 0).unwrap();
        file.write_at(&[0u8; 4], 4).unwrap();
        let err = file.write_at(&[0u8; 4], 8).unwrap_err();
        assert!(err.to_string().contains("injected write fault"));

        engine.clear_faults();
        file.write_at(&[0u8; 4], 8).unwrap();
        assert_eq!(engine.contents(path).unwrap().len(), 12);
    }

    #[test]
    fn test_mock_open_fault() {
        let engine = MockEngine::new();
        let path = Path::new("/mock/c.dat");
        engine.inject(MockFault::new(path, OperationType::Open));
        assert!(engine.open(path, OpenFlags::create_write()).is_err());
        assert_eq!(engine.file_count(), 0);
    }
}
