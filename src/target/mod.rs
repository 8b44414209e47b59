//! Benchmark targets
//!
//! The target of a benchmark session is a temporary workspace directory
//! holding exactly one file per worker. `Workspace` owns the directory and
//! the random payload block; `WorkerShard` assigns each worker its file and
//! byte quota.
//!
//! # Example
//!
//! ```no_run
//! use diskspeed::target::{Workspace, plan_shards};
//! use std::path::Path;
//!
//! let workspace = Workspace::create(Path::new("/mnt/scratch"), 64 * 1024)?;
//! let shards = plan_shards(workspace.dir(), 10 * 1024 * 1024, 4);
//! assert_eq!(shards.len(), 4);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod shard;
pub mod workspace;

pub use shard::{plan_shards, shard_path, WorkerShard};
pub use workspace::{Workspace, WorkspaceError};
