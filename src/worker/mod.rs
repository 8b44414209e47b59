//! Worker fan-out
//!
//! Every benchmark phase runs the same shape of work: N independent workers,
//! each on its own file, released at the same instant and timed until the
//! slowest one finishes.
//!
//! # Lifecycle
//!
//! 1. **Spawn**: one named OS thread per worker inside a `std::thread::scope`
//! 2. **Gate**: each worker arrives at the `StartGate` and blocks
//! 3. **Release**: once all have arrived the coordinator stamps the release
//!    instant and opens the gate
//! 4. **Join**: every worker is joined; the phase duration is the latest
//!    finish instant minus the release instant
//!
//! Workers share no mutable state. The only synchronization is the gate.
//!
//! # Example
//!
//! ```
//! use diskspeed::worker::run_phase;
//!
//! let timing = run_phase("square", 4, |index, _released_at| Ok(index * index))?;
//! assert_eq!(timing.outputs, vec![0, 1, 4, 9]);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::Result;
use anyhow::Context;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Outputs of all workers of a phase plus the slowest-worker duration
#[derive(Debug)]
pub struct PhaseTiming<T> {
    /// Per-worker outputs, indexed by worker
    pub outputs: Vec<T>,
    /// Release instant to the last worker's finish instant
    pub elapsed: Duration,
    /// Instant the workers were released
    pub released_at: Instant,
}

#[derive(Debug, Default)]
struct GateState {
    arrived: usize,
    released_at: Option<Instant>,
    aborted: bool,
}

/// Start barrier that records the release instant
///
/// Unlike `std::sync::Barrier` the gate can be aborted, so workers that were
/// already spawned exit cleanly if a later spawn fails.
#[derive(Debug, Default)]
pub struct StartGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Worker side: announce arrival and wait for release
    ///
    /// Returns the release instant, or `None` if the gate was aborted.
    pub fn arrive(&self) -> Option<Instant> {
        let mut state = self.lock();
        state.arrived += 1;
        self.cond.notify_all();

        while state.released_at.is_none() && !state.aborted {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.released_at
    }

    /// Coordinator side: wait for `workers` arrivals, then release them all
    pub fn release(&self, workers: usize) -> Instant {
        let mut state = self.lock();
        while state.arrived < workers {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        let now = Instant::now();
        state.released_at = Some(now);
        self.cond.notify_all();
        now
    }

    /// Let waiting workers return without doing any work
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        self.cond.notify_all();
    }
}

/// Run `work` on `workers` threads released together
///
/// `work` receives the worker index and the shared release instant. Every
/// worker is joined even if some fail; the error of the lowest-indexed failing
/// worker is returned. A panicking worker is reported as an error.
pub fn run_phase<T, F>(name: &str, workers: usize, work: F) -> Result<PhaseTiming<T>>
where
    T: Send,
    F: Fn(usize, Instant) -> Result<T> + Sync,
{
    let gate = StartGate::new();
    let work = &work;
    let gate_ref = &gate;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn_scoped(scope, move || -> Option<(Result<T>, Instant)> {
                    let released_at = gate_ref.arrive()?;
                    let output = work(index, released_at);
                    Some((output, Instant::now()))
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    gate.abort();
                    return Err(e)
                        .with_context(|| format!("Failed to spawn {} worker {}", name, index));
                }
            }
        }

        let released_at = gate.release(workers);

        let mut outputs = Vec::with_capacity(workers);
        let mut last_finish = released_at;
        let mut first_error = None;

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Some((Ok(output), finished_at))) => {
                    last_finish = last_finish.max(finished_at);
                    outputs.push(output);
                }
                Ok(Some((Err(e), _))) => {
                    first_error
                        .get_or_insert_with(|| e.context(format!("{} worker {} failed", name, index)));
                }
                Ok(None) => {
                    first_error.get_or_insert_with(|| {
                        anyhow::anyhow!("{} worker {} was not released", name, index)
                    });
                }
                Err(_) => {
                    first_error.get_or_insert_with(|| {
                        anyhow::anyhow!("{} worker {} panicked", name, index)
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(PhaseTiming {
                outputs,
                elapsed: last_finish.duration_since(released_at),
                released_at,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_outputs_in_worker_order() {
        let timing = run_phase("order", 8, |index, _| Ok(index as u64 * 10)).unwrap();
        assert_eq!(timing.outputs, (0..8).map(|i| i * 10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_elapsed_tracks_slowest_worker() {
        let timing = run_phase("slow", 3, |index, _| {
            if index == 2 {
                thread::sleep(Duration::from_millis(100));
            }
            Ok(())
        })
        .unwrap();

        assert!(timing.elapsed >= Duration::from_millis(100));
        // Max across workers, not the sum
        assert!(timing.elapsed < Duration::from_millis(250));
    }

    #[test]
    fn test_workers_share_release_instant() {
        let timing = run_phase("release", 4, |_, released_at| Ok(released_at)).unwrap();
        assert!(timing.outputs.iter().all(|&r| r == timing.released_at));
    }

    #[test]
    fn test_all_workers_start_together() {
        // Nobody may start working until every worker has arrived
        let started = AtomicUsize::new(0);
        let timing = run_phase("together", 6, |_, _| {
            started.fetch_add(1, Ordering::SeqCst);
            while started.load(Ordering::SeqCst) < 6 {
                std::hint::spin_loop();
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(timing.outputs.len(), 6);
    }

    #[test]
    fn test_failure_is_reported_after_all_join() {
        let finished = AtomicUsize::new(0);
        let err = run_phase("fail", 4, |index, _| {
            thread::sleep(Duration::from_millis(20));
            finished.fetch_add(1, Ordering::SeqCst);
            if index == 1 || index == 3 {
                anyhow::bail!("disk full on {}", index);
            }
            Ok(())
        })
        .unwrap_err();

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        let message = format!("{:#}", err);
        assert!(message.contains("fail worker 1 failed"), "{}", message);
        assert!(message.contains("disk full on 1"), "{}", message);
    }

    #[test]
    fn test_panic_becomes_error() {
        let err = run_phase("panicky", 2, |index, _| {
            if index == 0 {
                panic!("boom");
            }
            Ok(())
        })
        .unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_gate_abort_releases_waiters() {
        let gate = StartGate::new();
        thread::scope(|scope| {
            let handle = scope.spawn(|| gate.arrive());
            thread::sleep(Duration::from_millis(10));
            gate.abort();
            assert_eq!(handle.join().unwrap(), None);
        });
    }
}
