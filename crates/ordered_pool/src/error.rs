//! Fatal per-unit failure conditions.
//!
//! Admission backpressure is not represented here - waiting for a slot is
//! expected and resolves by polling. The variants below all abort the run
//! by default and carry the offending sequence number and artifact path so
//! the failure can be traced back to one unit.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    /// The worker neither published nor crashed within the await timeout.
    /// Its thread has been abandoned; no output is emitted for the unit.
    #[error(
        "worker for unit {sequence} stopped responding after {timeout:?} and was abandoned (artifact: {artifact})"
    )]
    WorkerUnresponsive {
        sequence: u64,
        artifact: PathBuf,
        timeout: Duration,
    },

    /// The worker ended without publishing its output. Signals a bug in the
    /// supplied task or an environment failure; never retried.
    #[error("worker for unit {sequence} exited without publishing {artifact}")]
    WorkerCrashed { sequence: u64, artifact: PathBuf },

    /// The worker thread could not be started at all.
    #[error("failed to spawn worker for unit {sequence}")]
    SpawnFailure {
        sequence: u64,
        #[source]
        source: io::Error,
    },
}
