//! Decides whether a unit's worker is still alive or active.
//!
//! Two checks are combined: the thread handle (when one is held and has not
//! finished) and the provisional artifact (still on disk means the worker
//! has not yet published, even if its handle is gone or was never taken).
//! A unit with neither is done or absent. The file check is the
//! authoritative backstop; handle state alone is racy around worker exit.

use crate::unit::WorkUnit;

/// True while the unit's worker is confirmed running or its provisional
/// output still exists. Tolerates absent handles: degraded units, spawn
/// failures, and abandoned workers all read as "not active".
pub(crate) fn is_active(unit: &WorkUnit) -> bool {
    let handle_running = unit
        .handle
        .as_ref()
        .map(|handle| !handle.is_finished())
        .unwrap_or(false);

    let provisional_present = unit
        .artifact
        .as_ref()
        .map(|artifact| artifact.provisional_exists())
        .unwrap_or(false);

    handle_running || provisional_present
}
