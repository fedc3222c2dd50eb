//! src/scheduler.rs
//!
//! Admission control and worker spawning.
//!
//! The scheduler owns the unit registry and the concurrency limit. `submit`
//! blocks in a sleep-poll loop until fewer than `concurrency_limit` units
//! are active, then allocates the next sequence number and starts the task
//! on a named worker thread. The admission check is a polling semaphore,
//! not an event-driven one: spawn and poll rates are low relative to unit
//! runtime, and polling keeps admission coupled to the same liveness check
//! the rest of the pool uses.
//!
//! Workers hold their captured state by move, write their output lines to
//! the unit's provisional artifact, and publish it with an atomic rename on
//! completion. A task failure (I/O error or panic) discards the provisional
//! file and exits without publishing, which the controller later observes
//! as a crashed unit.

use anyhow::{Context, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

use crate::artifact::{self, ArtifactLayout, ArtifactPaths};
use crate::config::PoolConfig;
use crate::liveness;
use crate::sink::OutputSink;
use crate::unit::{UnitState, WorkUnit};

pub(crate) struct WorkerScheduler {
    limit: usize,
    admission_poll: Duration,
    pool_name: String,
    /// Artifact namespace; only claimed in full (multi-worker) mode.
    layout: Option<ArtifactLayout>,
    /// All units in sequence order, owned until the pool is dropped.
    units: Vec<WorkUnit>,
}

impl WorkerScheduler {
    pub(crate) fn new(config: &PoolConfig) -> Result<Self> {
        let layout = if config.concurrency_limit > 1 {
            Some(ArtifactLayout::claim(&config.pool_name)?)
        } else {
            None
        };
        Ok(Self {
            limit: config.concurrency_limit,
            admission_poll: config.admission_poll,
            pool_name: config.pool_name.clone(),
            layout,
            units: Vec::new(),
        })
    }

    /// Degraded mode runs tasks synchronously on the caller's thread.
    pub(crate) fn degraded(&self) -> bool {
        self.limit == 1
    }

    pub(crate) fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> &mut [WorkUnit] {
        &mut self.units
    }

    pub(crate) fn len(&self) -> usize {
        self.units.len()
    }

    /// Number of units currently running, per the liveness check.
    pub(crate) fn active_count(&self) -> usize {
        self.units.iter().filter(|unit| liveness::is_active(unit)).count()
    }

    /// Blocks until a slot frees up, then spawns `task(state)` as a worker
    /// and returns the allocated sequence number. Spawn failures do not
    /// error here; they surface as a unit that is immediately crashed.
    pub(crate) fn submit<S, F, I>(
        &mut self,
        task: F,
        state: S,
        sink: &Arc<Mutex<OutputSink>>,
    ) -> Result<u64>
    where
        F: FnOnce(S) -> I + Send + 'static,
        S: Send + 'static,
        I: IntoIterator<Item = String>,
    {
        if self.degraded() {
            return self.run_synchronous(task, state, sink);
        }

        self.wait_for_slot();
        let sequence = self.units.len() as u64;
        let layout = self
            .layout
            .as_ref()
            .context("artifact namespace missing in multi-worker mode")?;
        let paths = layout.paths_for(sequence);

        let mut unit = WorkUnit {
            sequence,
            handle: None,
            artifact: Some(paths.clone()),
            state: UnitState::Submitted,
            spawn_error: None,
        };

        let spawned = thread::Builder::new()
            .name(format!("{}-worker-{}", self.pool_name, sequence))
            .spawn(move || run_worker(task, state, paths));

        match spawned {
            Ok(handle) => {
                unit.handle = Some(handle);
                unit.state = UnitState::Running;
            }
            Err(e) => {
                warn!(sequence, error = %e, "failed to spawn worker");
                unit.state = UnitState::Crashed;
                unit.spawn_error = Some(e);
            }
        }

        self.units.push(unit);
        Ok(sequence)
    }

    /// Degraded path: the task runs in the caller's own context and its
    /// lines go straight to the sink. No isolation, no artifact.
    fn run_synchronous<S, F, I>(
        &mut self,
        task: F,
        state: S,
        sink: &Arc<Mutex<OutputSink>>,
    ) -> Result<u64>
    where
        F: FnOnce(S) -> I,
        I: IntoIterator<Item = String>,
    {
        let sequence = self.units.len() as u64;
        sink.lock()
            .map_err(|_| anyhow::anyhow!("output sink mutex poisoned"))?
            .consume_lines(task(state))
            .with_context(|| format!("Failed to emit output of unit {sequence}"))?;
        self.units.push(WorkUnit {
            sequence,
            handle: None,
            artifact: None,
            state: UnitState::Consumed,
            spawn_error: None,
        });
        Ok(sequence)
    }

    fn wait_for_slot(&self) {
        loop {
            let active = self.active_count();
            if active < self.limit {
                return;
            }
            trace!(active, limit = self.limit, "waiting for admission slot");
            thread::sleep(self.admission_poll);
        }
    }
}

/// Worker thread body. Panics in the task are contained here so a crashing
/// task cannot take the pool down; the unit just never publishes.
fn run_worker<S, F, I>(task: F, state: S, paths: ArtifactPaths)
where
    F: FnOnce(S) -> I,
    I: IntoIterator<Item = String>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        artifact::write_and_publish(&paths, task(state))
    }));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(error = %e, "worker failed; discarding provisional output");
            paths.discard_provisional();
        }
        Err(_) => {
            warn!("worker panicked; discarding provisional output");
            paths.discard_provisional();
        }
    }
}
