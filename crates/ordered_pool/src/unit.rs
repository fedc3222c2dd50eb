//! One submitted job and its lifecycle.

use std::io;
use std::thread::JoinHandle;

use crate::artifact::ArtifactPaths;

/// Lifecycle of a work unit.
///
/// `Submitted -> Running -> Published -> Consumed`, or the terminal failure
/// `Running -> Crashed`. A degraded-mode unit executes synchronously at
/// submission and is recorded directly as `Consumed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    Submitted,
    Running,
    Published,
    Consumed,
    Crashed,
}

/// Registry record for one submitted unit.
///
/// Owned by the scheduler from submission until consumption; the sequencer
/// and completion waits only borrow it for the duration of a call.
pub(crate) struct WorkUnit {
    /// Submission-order sequence number; strictly increasing, no gaps.
    pub(crate) sequence: u64,
    /// Worker thread handle. `None` in degraded mode, after a spawn failure,
    /// or once an unresponsive worker has been abandoned.
    pub(crate) handle: Option<JoinHandle<()>>,
    /// Artifact locations. `None` in degraded mode, which writes no files.
    pub(crate) artifact: Option<ArtifactPaths>,
    pub(crate) state: UnitState,
    /// Set when the worker thread could not be started at all.
    pub(crate) spawn_error: Option<io::Error>,
}
