//! src/pool.rs
//!
//! The top-level pool: submit -> admit -> spawn, periodic drainage, and a
//! shutdown that waits out every straggler before the final drain.
//!
//! The pool itself is single-threaded and cooperative: the caller drives it
//! by submitting units and (optionally) pumping `drain_once` between
//! submissions. Taking `&mut self` everywhere enforces the sequencer's
//! single-flight discipline at compile time.

use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::liveness;
use crate::scheduler::WorkerScheduler;
use crate::sequencer::{DrainStatus, OutputSequencer};
use crate::sink::OutputSink;
use crate::unit::UnitState;

/// Bounded parallel executor with submission-order output.
///
/// See the crate docs for the overall protocol. Fatal per-unit conditions
/// ([`PoolError`]) abort `shutdown` with the offending sequence number and
/// artifact path; a caller that chooses to continue anyway can keep
/// submitting fresh units (a retry is a new submission with a new sequence).
pub struct WorkPool {
    config: PoolConfig,
    scheduler: WorkerScheduler,
    sequencer: OutputSequencer,
    sink: Arc<Mutex<OutputSink>>,
}

impl WorkPool {
    /// Creates a pool with a validated configuration and claims its private
    /// artifact namespace (multi-worker mode only).
    pub fn new(config: PoolConfig, sink: OutputSink) -> Result<Self> {
        if config.concurrency_limit == 0 {
            bail!(
                "Cannot create a pool with concurrency_limit 0. \
                Use 1 for synchronous mode or more for parallel workers."
            );
        }
        if config.pool_name.is_empty() || config.pool_name.contains(['/', '\\']) {
            bail!(
                "Pool name '{}' is not usable as a file-name component",
                config.pool_name
            );
        }

        let sink = Arc::new(Mutex::new(sink));
        let scheduler = WorkerScheduler::new(&config)?;
        let sequencer = OutputSequencer::new(Arc::clone(&sink), config.completion_poll);
        debug!(
            limit = config.concurrency_limit,
            pool = %config.pool_name,
            "pool ready"
        );
        Ok(Self {
            config,
            scheduler,
            sequencer,
            sink,
        })
    }

    /// Submits one work unit and returns its sequence number.
    ///
    /// Blocks while all admission slots are taken (expected backpressure,
    /// resolved by polling), then spawns the worker and returns without
    /// waiting for it to finish. In degraded mode the task runs here,
    /// synchronously, and its output is already in the sink on return.
    pub fn submit<S, F, I>(&mut self, task: F, state: S) -> Result<u64>
    where
        F: FnOnce(S) -> I + Send + 'static,
        S: Send + 'static,
        I: IntoIterator<Item = String>,
    {
        self.scheduler.submit(task, state, &self.sink)
    }

    /// Current state of a submitted unit, if the sequence exists.
    pub fn unit_state(&self, sequence: u64) -> Option<UnitState> {
        self.scheduler
            .units()
            .get(sequence as usize)
            .map(|unit| unit.state)
    }

    /// Emits whatever is next in order, if it is ready. Never blocks on a
    /// unit that has not published; call this periodically between
    /// submissions to keep the aggregate stream flowing.
    pub fn drain_once(&mut self) -> Result<DrainStatus> {
        if self.scheduler.degraded() {
            return Ok(DrainStatus::Drained);
        }
        self.sequencer.drain_once(self.scheduler.units_mut())
    }

    /// Waits for every outstanding unit, then drains the sequencer to the
    /// end. Safe to call twice: the second call finds nothing outstanding
    /// and forwards nothing. Degraded mode is a no-op (all work already
    /// completed synchronously at submission).
    pub fn shutdown(&mut self) -> Result<()> {
        if self.scheduler.degraded() {
            return Ok(());
        }
        for index in self.sequencer.cursor()..self.scheduler.len() {
            self.wait_for_unit(index)?;
        }
        self.sequencer.drain_all(self.scheduler.units_mut())
    }

    /// Blocks until the unit at `index` has published, up to the configured
    /// await timeout. Distinguishes the two fatal outcomes: a worker that is
    /// still alive at the deadline is abandoned as unresponsive, while a
    /// worker that is gone without publishing has crashed (never retried).
    fn wait_for_unit(&mut self, index: usize) -> Result<()> {
        let timeout = self.config.await_timeout;
        let poll = self.config.completion_poll;

        let unit = &mut self.scheduler.units_mut()[index];
        match unit.state {
            // Already forwarded, or being forwarded right now.
            UnitState::Consumed | UnitState::Published => return Ok(()),
            _ => {}
        }
        if let Some(source) = unit.spawn_error.take() {
            unit.state = UnitState::Crashed;
            return Err(PoolError::SpawnFailure {
                sequence: unit.sequence,
                source,
            }
            .into());
        }
        let Some(artifact) = unit.artifact.clone() else {
            return Ok(());
        };

        if liveness::is_active(unit) && !artifact.final_exists() {
            debug!(
                sequence = unit.sequence,
                timeout = ?timeout,
                "waiting for worker to publish"
            );
        }

        let started = Instant::now();
        loop {
            if artifact.final_exists() {
                return Ok(());
            }
            if !liveness::is_active(unit) {
                unit.state = UnitState::Crashed;
                unit.handle = None;
                warn!(sequence = unit.sequence, "worker exited without publishing");
                return Err(PoolError::WorkerCrashed {
                    sequence: unit.sequence,
                    artifact: artifact.final_path().to_path_buf(),
                }
                .into());
            }
            if started.elapsed() >= timeout {
                let still_alive = unit
                    .handle
                    .as_ref()
                    .map(|handle| !handle.is_finished())
                    .unwrap_or(false);
                // Threads cannot be force-killed; detaching the handle
                // abandons the worker and frees its admission slot.
                unit.handle = None;
                unit.state = UnitState::Crashed;
                if still_alive {
                    warn!(sequence = unit.sequence, "worker stopped responding; abandoned");
                    return Err(PoolError::WorkerUnresponsive {
                        sequence: unit.sequence,
                        artifact: artifact.final_path().to_path_buf(),
                        timeout,
                    }
                    .into());
                }
                warn!(sequence = unit.sequence, "worker exited without publishing");
                return Err(PoolError::WorkerCrashed {
                    sequence: unit.sequence,
                    artifact: artifact.final_path().to_path_buf(),
                }
                .into());
            }
            thread::sleep(poll);
        }
    }
}
