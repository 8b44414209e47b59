//! Session coordinator
//!
//! A `Session` owns everything that lives for the whole benchmark: the
//! workspace (test directory and payload block), the worker shards, the cache
//! invalidator and the collected results. It drives the outer loop:
//!
//! ```text
//! start ──► [write ─► wait for cache cycle ─► read ─► IOPS ─► append] ──► finish
//!                ▲                                                │
//!                └──────── runs_done < runs OR now < deadline ────┘
//! ```
//!
//! Any phase failure ends the session with `SessionError::Phase`; the failed
//! run appends nothing. The invalidator is declared before the workspace, so
//! on drop it stops before the test directory is removed.

use crate::bench::{run_iops_phase, run_read_phase, run_write_phase, IopsSettings, Phase};
use crate::cache::CacheInvalidator;
use crate::config::validator::validate_benchmark;
use crate::config::{BenchmarkConfig, SessionLimits};
use crate::engine::IOEngine;
use crate::stats::{Results, RunResult};
use crate::target::{plan_shards, WorkerShard, Workspace, WorkspaceError};
use crate::util::memory::MIB;
use crate::util::time::MEGABYTE;
use chrono::{DateTime, Utc};
use std::collections::TryReserveError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session-fatal errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration rejected before anything touched the filesystem
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot create test directory under {}", base.display())]
    Workspace {
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

    #[error("cannot start cache invalidator: {0}")]
    Invalidator(String),

    /// A worker failed; `run` is 0-based
    #[error("{phase} phase failed in run {}", .run + 1)]
    Phase {
        run: usize,
        phase: Phase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl From<WorkspaceError> for SessionError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Create { base, source } => SessionError::Workspace { base, source },
            WorkspaceError::Allocation { size, source } => SessionError::Allocation { size, source },
        }
    }
}

fn phase_error(run: usize, phase: Phase, err: anyhow::Error) -> SessionError {
    SessionError::Phase {
        run,
        phase,
        source: err.into(),
    }
}

/// Outer loop condition
///
/// Keep going while fewer than `limits.runs` runs are done OR the time budget
/// measured from `started` has not elapsed. A session with both limits set
/// runs until both are exhausted.
pub fn should_continue(limits: &SessionLimits, runs_done: usize, started: Instant, now: Instant) -> bool {
    if (runs_done as u64) < u64::from(limits.runs) {
        return true;
    }
    match started.checked_add(limits.time_budget()) {
        Some(deadline) => now < deadline,
        None => true,
    }
}

/// What a finished session leaves behind
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Wall-clock start of the session
    pub start: DateTime<Utc>,
    pub config: BenchmarkConfig,
    /// Test directory (already removed unless the workspace was kept)
    pub workspace_dir: PathBuf,
    pub results: Results,
}

/// One benchmark session
pub struct Session {
    config: BenchmarkConfig,
    engine: Arc<dyn IOEngine>,
    shards: Vec<WorkerShard>,
    invalidator: Option<CacheInvalidator>,
    workspace: Workspace,
    results: Results,
    start: DateTime<Utc>,
    started: Instant,
}

impl Session {
    /// Validate the configuration and prepare the workspace
    ///
    /// Creates the test directory, allocates the payload block and starts the
    /// cache invalidator (unless disabled).
    pub fn start(config: BenchmarkConfig, engine: Arc<dyn IOEngine>) -> Result<Self, SessionError> {
        validate_benchmark(&config).map_err(|e| SessionError::Config(format!("{:#}", e)))?;

        let start = Utc::now();
        let started = Instant::now();

        let workspace = Workspace::create(&config.base_dir, config.block_size)?;
        let shards = plan_shards(workspace.dir(), config.dataset_bytes, config.workers);

        let invalidator = if config.cache.enabled {
            let invalidator =
                CacheInvalidator::start(workspace.dir().to_path_buf(), config.cache.interval())
                    .map_err(|e| SessionError::Invalidator(format!("{:#}", e)))?;
            Some(invalidator)
        } else {
            debug!("cache invalidation disabled");
            None
        };

        info!(
            dir = %workspace.dir().display(),
            workers = config.workers,
            dataset_bytes = config.dataset_bytes,
            engine = engine.name(),
            "session started"
        );

        Ok(Self {
            config,
            engine,
            shards,
            invalidator,
            workspace,
            results: Results::new(),
            start,
            started,
        })
    }

    /// Run until both limits are exhausted, calling `observer` after each run
    pub fn run<F>(&mut self, limits: &SessionLimits, mut observer: F) -> Result<(), SessionError>
    where
        F: FnMut(usize, &RunResult),
    {
        while should_continue(limits, self.results.len(), self.started, Instant::now()) {
            let run = self.results.len();
            let result = self.run_once()?;
            observer(run, &result);
        }
        Ok(())
    }

    /// Execute one full run and append its result
    pub fn run_once(&mut self) -> Result<RunResult, SessionError> {
        let run = self.results.len();
        let engine = self.engine.as_ref();
        let block = self.workspace.block();

        let write = run_write_phase(engine, &self.shards, block)
            .map_err(|e| phase_error(run, Phase::SequentialWrite, e))?;
        log_transfer(run, Phase::SequentialWrite, write.bytes, write.elapsed.as_secs_f64());

        if let Some(invalidator) = &self.invalidator {
            let mark = invalidator.mark();
            if !invalidator.wait_for_cycle_after(mark) {
                warn!(run, "cache invalidator exited; reading without a fresh invalidation");
            }
        }

        let read = run_read_phase(engine, &self.shards, block, self.config.verify)
            .map_err(|e| phase_error(run, Phase::SequentialRead, e))?;
        log_transfer(run, Phase::SequentialRead, read.bytes, read.elapsed.as_secs_f64());

        let settings = IopsSettings {
            duration: self.config.iops_duration(),
            block_size: self.config.iops_block_size,
            write_percent: self.config.iops_write_percent,
            seed: self.config.seed,
        };
        let iops = run_iops_phase(engine, &self.shards, block, &settings)
            .map_err(|e| phase_error(run, Phase::Iops, e))?;
        debug!(
            run,
            operations = iops.operations,
            seconds = iops.elapsed.as_secs_f64(),
            "IOPS phase done"
        );

        let result = RunResult {
            written_bytes: write.bytes,
            written_duration: write.elapsed,
            read_bytes: read.bytes,
            read_duration: read.elapsed,
            io_operations: iops.operations,
            io_duration: iops.elapsed,
        };
        self.results.push(result);
        Ok(result)
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn shards(&self) -> &[WorkerShard] {
        &self.shards
    }

    /// Test directory of this session
    pub fn workspace_dir(&self) -> &Path {
        self.workspace.dir()
    }

    /// Wall-clock start of the session
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    /// Stop the invalidator, remove (or keep) the workspace and hand back the results
    pub fn finish(self) -> SessionReport {
        let Session {
            config,
            invalidator,
            workspace,
            results,
            start,
            ..
        } = self;

        if let Some(invalidator) = invalidator {
            invalidator.stop();
        }

        let workspace_dir = workspace.dir().to_path_buf();
        if config.keep_workspace {
            let kept = workspace.keep();
            info!(dir = %kept.display(), "workspace kept");
        } else if let Err(e) = workspace.close() {
            warn!(dir = %workspace_dir.display(), error = %e, "failed to remove workspace");
        }

        SessionReport {
            start,
            config,
            workspace_dir,
            results,
        }
    }
}

fn log_transfer(run: usize, phase: Phase, bytes: u64, seconds: f64) {
    debug!(
        run,
        %phase,
        mib = bytes as f64 / MIB as f64,
        mb = bytes as f64 / MEGABYTE,
        seconds,
        "phase done"
    );
}
