//! src/sequencer.rs
//!
//! Order-preserving consumption of published artifacts.
//!
//! The sequencer walks the unit registry with a cursor: the unit it is
//! waiting to consume next. When that unit's final artifact appears, a
//! short-lived forwarder thread streams it into the sink (or hands its path
//! to the callback) and deletes it, and only then does the cursor advance.
//! Unit k is consumed only after units 0..k have all been consumed, so the
//! aggregate output always matches submission order.
//!
//! Only one forwarding operation is ever in flight. This single-slot
//! discipline bounds memory use regardless of pool size, and the in-flight
//! completion signal is the artifact disappearing from disk (the forwarder
//! deletes it last), the same filesystem protocol workers publish through.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

use crate::sink::OutputSink;
use crate::unit::{UnitState, WorkUnit};

/// Outcome of one drain step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainStatus {
    /// The cursor unit was consumed and the cursor moved on.
    Advanced,
    /// A forwarding operation was started or is still running.
    InFlight,
    /// The cursor unit has not published yet. Not an error.
    Pending,
    /// Every submitted unit has been consumed.
    Drained,
}

struct InFlightForward {
    sequence: u64,
    final_path: PathBuf,
    handle: JoinHandle<Result<()>>,
}

pub(crate) struct OutputSequencer {
    /// Index of the next unit to consume; equals its sequence number.
    cursor: usize,
    in_flight: Option<InFlightForward>,
    sink: Arc<Mutex<OutputSink>>,
    completion_poll: Duration,
}

impl OutputSequencer {
    pub(crate) fn new(sink: Arc<Mutex<OutputSink>>, completion_poll: Duration) -> Self {
        Self {
            cursor: 0,
            in_flight: None,
            sink,
            completion_poll,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Makes at most one step of progress: finish the in-flight forward,
    /// start forwarding the cursor unit, or report why neither happened.
    pub(crate) fn drain_once(&mut self, units: &mut [WorkUnit]) -> Result<DrainStatus> {
        if let Some(forward) = self.in_flight.take() {
            // Completion signal: the artifact is gone (deleted last by the
            // forwarder). Still on disk with a live forwarder means wait.
            if forward.final_path.exists() && !forward.handle.is_finished() {
                self.in_flight = Some(forward);
                return Ok(DrainStatus::InFlight);
            }
            match forward.handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(e.context(format!(
                        "Forwarding output of unit {} failed",
                        forward.sequence
                    )))
                }
                Err(_) => return Err(anyhow!("Forwarder for unit {} panicked", forward.sequence)),
            }
            units[self.cursor].state = UnitState::Consumed;
            self.cursor += 1;
            return Ok(DrainStatus::Advanced);
        }

        let Some(unit) = units.get_mut(self.cursor) else {
            return Ok(DrainStatus::Drained);
        };

        let Some(artifact) = unit.artifact.as_ref() else {
            // Degraded units were consumed synchronously at submission.
            self.cursor += 1;
            return Ok(DrainStatus::Advanced);
        };

        if !artifact.final_exists() {
            return Ok(DrainStatus::Pending);
        }

        unit.state = UnitState::Published;
        let sequence = unit.sequence;
        let final_path = artifact.final_path().to_path_buf();
        let sink = Arc::clone(&self.sink);
        let worker_path = final_path.clone();
        debug!(sequence, "forwarding published artifact");
        let handle = thread::Builder::new()
            .name(format!("forwarder-{sequence}"))
            .spawn(move || forward_and_delete(sink, &worker_path))
            .with_context(|| format!("Failed to spawn forwarder for unit {sequence}"))?;

        self.in_flight = Some(InFlightForward {
            sequence,
            final_path,
            handle,
        });
        Ok(DrainStatus::InFlight)
    }

    /// Drains every remaining unit, waiting for each in turn. Only called
    /// once all outstanding workers have been awaited, so each cursor unit
    /// is guaranteed to publish and the loop terminates.
    pub(crate) fn drain_all(&mut self, units: &mut [WorkUnit]) -> Result<()> {
        loop {
            match self.drain_once(units)? {
                DrainStatus::Drained => return Ok(()),
                DrainStatus::Advanced => {}
                DrainStatus::InFlight | DrainStatus::Pending => {
                    thread::sleep(self.completion_poll)
                }
            }
        }
    }
}

/// Forward one artifact and delete it: a single logical unit of work,
/// attributed to the cursor position. Runs on its own short-lived thread so
/// the sequencer loop never blocks on output I/O.
fn forward_and_delete(sink: Arc<Mutex<OutputSink>>, path: &Path) -> Result<()> {
    sink.lock()
        .map_err(|_| anyhow!("output sink mutex poisoned"))?
        .forward_file(path)?;
    fs::remove_file(path)
        .with_context(|| format!("Failed to delete consumed artifact {}", path.display()))
}
