//! Background page cache invalidation
//!
//! A single thread periodically asks the OS to drop cached pages for the
//! workspace files, so sequential reads hit the device instead of memory. It
//! runs for the whole session, independent of the benchmark phases.
//!
//! Invalidation is best effort. A failed cycle is logged and counted, never
//! returned: the measurement only gets less accurate (the cache stays warmer
//! than intended).
//!
//! The read phase must not start until a cycle that *began after* the write
//! phase ended has completed. `mark()` snapshots the number of cycles started
//! so far, and `wait_for_cycle_after()` requests an immediate cycle and blocks
//! until a later one has finished.
//!
//! # Example
//!
//! ```no_run
//! use diskspeed::cache::CacheInvalidator;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! let invalidator = CacheInvalidator::start(PathBuf::from("/mnt/scratch/diskspeed-x"), Duration::from_secs(3))?;
//! // ... write phase ...
//! let mark = invalidator.mark();
//! invalidator.wait_for_cycle_after(mark);
//! // ... read phase ...
//! invalidator.stop();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod flush;

pub use flush::{CacheFlush, FlushStrategy, PageCacheFlush};

use crate::Result;
use anyhow::Context;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Number of cycles started at some point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleMark(u64);

enum Command {
    Flush,
    Stop,
}

#[derive(Debug)]
struct CycleState {
    started: u64,
    completed: u64,
    failed: u64,
    running: bool,
}

#[derive(Debug)]
struct CycleTracker {
    state: Mutex<CycleState>,
    cond: Condvar,
}

impl CycleTracker {
    fn new() -> Self {
        Self {
            state: Mutex::new(CycleState {
                started: 0,
                completed: 0,
                failed: 0,
                running: true,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> u64 {
        let mut state = self.lock();
        state.started += 1;
        state.started
    }

    fn finish(&self, ok: bool) {
        let mut state = self.lock();
        state.completed += 1;
        if !ok {
            state.failed += 1;
        }
        self.cond.notify_all();
    }

    fn exited(&self) {
        let mut state = self.lock();
        state.running = false;
        self.cond.notify_all();
    }
}

/// Marks the tracker as stopped when the thread exits, even by panic
struct ExitGuard(Arc<CycleTracker>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.exited();
    }
}

/// Handle to the background invalidation thread
///
/// Dropping the handle stops the thread.
pub struct CacheInvalidator {
    commands: Sender<Command>,
    tracker: Arc<CycleTracker>,
    handle: Option<JoinHandle<()>>,
}

impl CacheInvalidator {
    /// Start invalidating `dir` every `interval` with the platform default mechanism
    pub fn start(dir: PathBuf, interval: Duration) -> Result<Self> {
        Self::with_flush(dir, interval, PageCacheFlush::default())
    }

    /// Start invalidating `dir` every `interval` with a custom mechanism
    pub fn with_flush<C: CacheFlush>(dir: PathBuf, interval: Duration, flush: C) -> Result<Self> {
        let (commands, receiver) = channel::unbounded();
        let tracker = Arc::new(CycleTracker::new());
        let thread_tracker = tracker.clone();

        let handle = thread::Builder::new()
            .name("cache-invalidator".to_string())
            .spawn(move || {
                let _guard = ExitGuard(thread_tracker.clone());
                invalidation_loop(dir, interval, flush, receiver, &thread_tracker);
            })
            .context("Failed to spawn cache invalidator thread")?;

        debug!(interval_secs = interval.as_secs_f64(), "cache invalidator started");

        Ok(Self {
            commands,
            tracker,
            handle: Some(handle),
        })
    }

    /// Snapshot of the cycles started so far
    pub fn mark(&self) -> CycleMark {
        CycleMark(self.tracker.lock().started)
    }

    /// Ask for a cycle now instead of at the next interval
    pub fn request_flush(&self) {
        let _ = self.commands.send(Command::Flush);
    }

    /// Block until a cycle that started after `mark` has completed
    ///
    /// Requests an immediate cycle first. Returns `false` if the thread exited
    /// before such a cycle completed.
    pub fn wait_for_cycle_after(&self, mark: CycleMark) -> bool {
        self.request_flush();

        let mut state = self.tracker.lock();
        while state.completed <= mark.0 && state.running {
            state = self
                .tracker
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.completed > mark.0
    }

    /// Cycles completed, successful or not
    pub fn completed_cycles(&self) -> u64 {
        self.tracker.lock().completed
    }

    /// Cycles whose flush attempt failed
    pub fn failed_cycles(&self) -> u64 {
        self.tracker.lock().failed
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("cache invalidator thread panicked");
            }
            debug!("cache invalidator stopped");
        }
    }
}

impl Drop for CacheInvalidator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn invalidation_loop<C: CacheFlush>(
    dir: PathBuf,
    interval: Duration,
    mut flush: C,
    commands: channel::Receiver<Command>,
    tracker: &CycleTracker,
) {
    let mut warned = false;

    loop {
        match commands.recv_timeout(interval) {
            Ok(Command::Flush) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }

        // Coalesce queued flush requests into this cycle
        if commands.try_iter().any(|c| matches!(c, Command::Stop)) {
            break;
        }

        let cycle = tracker.begin();
        match flush.flush(&dir) {
            Ok(files) => {
                debug!(cycle, files, "page cache invalidated");
                tracker.finish(true);
            }
            Err(e) => {
                if warned {
                    debug!(cycle, error = %format!("{:#}", e), "cache invalidation failed");
                } else {
                    warn!(
                        error = %format!("{:#}", e),
                        "cache invalidation failed; reads may be served from the page cache"
                    );
                    warned = true;
                }
                tracker.finish(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFlush(Arc<AtomicUsize>);

    impl CacheFlush for CountingFlush {
        fn flush(&mut self, _dir: &Path) -> Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }
    }

    struct FailingFlush;

    impl CacheFlush for FailingFlush {
        fn flush(&mut self, _dir: &Path) -> Result<usize> {
            anyhow::bail!("permission denied")
        }
    }

    #[test]
    fn test_periodic_cycles() {
        let count = Arc::new(AtomicUsize::new(0));
        let invalidator = CacheInvalidator::with_flush(
            PathBuf::from("/unused"),
            Duration::from_millis(10),
            CountingFlush(count.clone()),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(120));
        assert!(invalidator.completed_cycles() >= 3);
        invalidator.stop();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_wait_for_cycle_after_mark_is_prompt() {
        let count = Arc::new(AtomicUsize::new(0));
        // Long interval: only explicit requests trigger cycles
        let invalidator = CacheInvalidator::with_flush(
            PathBuf::from("/unused"),
            Duration::from_secs(3600),
            CountingFlush(count.clone()),
        )
        .unwrap();

        let mark = invalidator.mark();
        assert!(invalidator.wait_for_cycle_after(mark));
        assert!(invalidator.completed_cycles() >= 1);

        let mark = invalidator.mark();
        assert!(mark >= CycleMark(1));
        assert!(invalidator.wait_for_cycle_after(mark));
        assert!(invalidator.completed_cycles() >= 2);
    }

    #[test]
    fn test_failures_are_counted_not_raised() {
        let invalidator = CacheInvalidator::with_flush(
            PathBuf::from("/unused"),
            Duration::from_secs(3600),
            FailingFlush,
        )
        .unwrap();

        let mark = invalidator.mark();
        assert!(invalidator.wait_for_cycle_after(mark));
        assert_eq!(invalidator.failed_cycles(), invalidator.completed_cycles());
    }

    #[test]
    fn test_drop_stops_thread() {
        let count = Arc::new(AtomicUsize::new(0));
        let invalidator = CacheInvalidator::with_flush(
            PathBuf::from("/unused"),
            Duration::from_millis(5),
            CountingFlush(count.clone()),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        drop(invalidator);

        let after_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_real_flush_on_workspace_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("shard-0.dat"), vec![1u8; 4096]).unwrap();

        let invalidator =
            CacheInvalidator::start(dir.path().to_path_buf(), Duration::from_secs(3600)).unwrap();
        let mark = invalidator.mark();
        assert!(invalidator.wait_for_cycle_after(mark));
    }
}
