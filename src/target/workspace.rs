//! Session workspace
//!
//! A uniquely named directory created under the configured base directory,
//! plus the random payload block written into it. The directory is removed
//! when the `Workspace` is dropped, on every exit path that unwinds, unless
//! the caller asks to keep it.

use crate::util::buffer::RandomBlock;
use std::collections::TryReserveError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;

/// Errors raised while preparing a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("cannot create test directory under {}", base.display())]
    Create {
        base: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot allocate {size} byte random block")]
    Allocation {
        size: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Temporary test directory and shared payload block
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    block: Arc<RandomBlock>,
}

impl Workspace {
    /// Create the test directory under `base` and generate the payload block
    ///
    /// # Errors
    ///
    /// `WorkspaceError::Create` if `base` does not exist or is not writable,
    /// `WorkspaceError::Allocation` if the block cannot be allocated. On
    /// allocation failure the directory is already removed again.
    pub fn create(base: &Path, block_size: usize) -> Result<Self, WorkspaceError> {
        let dir = Self::set_temp_dir(base)?;
        let block = Self::create_random_block(block_size)?;
        let path = dir.path().to_path_buf();

        tracing::debug!(dir = %path.display(), block_size, "workspace ready");

        Ok(Self {
            dir: Some(dir),
            path,
            block: Arc::new(block),
        })
    }

    /// Create a uniquely named subdirectory of `base`
    pub fn set_temp_dir(base: &Path) -> Result<TempDir, WorkspaceError> {
        tempfile::Builder::new()
            .prefix("diskspeed-")
            .tempdir_in(base)
            .map_err(|source| WorkspaceError::Create {
                base: base.to_path_buf(),
                source,
            })
    }

    /// Fill a block of `size` bytes with pseudo-random data
    pub fn create_random_block(size: usize) -> Result<RandomBlock, WorkspaceError> {
        RandomBlock::generate(size).map_err(|source| WorkspaceError::Allocation { size, source })
    }

    /// Path of the test directory
    pub fn dir(&self) -> &Path {
        &self.path
    }

    /// Shared, read-only payload block
    pub fn block(&self) -> &Arc<RandomBlock> {
        &self.block
    }

    /// Leave the directory on disk and return its path
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.dir.take() {
            // Dropping the returned path leaves the directory in place
            let _ = dir.into_path();
        }
        self.path.clone()
    }

    /// Remove the directory, reporting any filesystem error
    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_makes_subdirectory() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create(base.path(), 4096).unwrap();

        assert!(workspace.dir().is_dir());
        assert_eq!(workspace.dir().parent(), Some(base.path()));
        assert_eq!(workspace.block().len(), 4096);
    }

    #[test]
    fn test_drop_removes_directory() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create(base.path(), 1024).unwrap();
        let dir = workspace.dir().to_path_buf();
        std::fs::write(dir.join("shard-0.dat"), b"data").unwrap();

        drop(workspace);
        assert!(!dir.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create(base.path(), 1024).unwrap();
        let dir = workspace.dir().to_path_buf();

        workspace.close().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_keep_leaves_directory() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create(base.path(), 1024).unwrap();
        let dir = workspace.keep();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_missing_base_is_create_error() {
        let base = TempDir::new().unwrap();
        let err = Workspace::create(&base.path().join("missing"), 1024).unwrap_err();
        assert!(matches!(err, WorkspaceError::Create { .. }));
    }

    #[test]
    fn test_allocation_failure_cleans_up() {
        let base = TempDir::new().unwrap();
        let err = Workspace::create(base.path(), usize::MAX).unwrap_err();
        assert!(matches!(err, WorkspaceError::Allocation { .. }));
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }
}
