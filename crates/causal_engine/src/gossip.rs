//! Gossip merge engine.
//!
//! Applies remote operations in causal order regardless of the order they
//! arrive in. An operation is applied only when it is an immediate
//! successor of the replica's clock; anything further ahead waits in the
//! pending buffer until the missing operations show up.

use crate::config::PendingDrain;
use crate::state::ReplicaState;
use causal_protocol::{Operation, OperationLog, VectorClock};
use tracing::{trace, warn};

/// Outcome of merging one gossip batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Operations applied to the global log (from the batch or the buffer).
    pub applied: usize,
    /// Operations newly added to the pending buffer.
    pub buffered: usize,
    /// Operations dropped as already known or malformed.
    pub discarded: usize,
}

/// Merges a batch of remote operations into `state`.
///
/// Each operation, in arrival order, is applied if causally ready,
/// discarded if already known, and buffered otherwise. The pending buffer
/// is then rescanned according to `drain`, even when the batch is empty.
pub(crate) fn merge_batch(
    state: &mut ReplicaState,
    operations: Vec<Operation>,
    drain: PendingDrain,
) -> MergeReport {
    let mut report = MergeReport::default();

    for op in operations {
        if op.version_vector.check_len(state.replicas).is_err() {
            warn!(
                version_vector = %op.version_vector,
                "dropping gossiped operation with wrong clock length"
            );
            report.discarded += 1;
        } else if state.clock.admits_next(&op.version_vector) {
            trace!(version_vector = %op.version_vector, "applying gossiped operation");
            state.clock.merge_in(&op.version_vector);
            state.log.insert(op);
            report.applied += 1;
        } else if state.clock.dominates(&op.version_vector) {
            report.discarded += 1;
        } else {
            trace!(
                clock = %state.clock,
                version_vector = %op.version_vector,
                "buffering operation with causal gap"
            );
            if state.pending.insert(op) {
                report.buffered += 1;
            }
        }
    }

    loop {
        let (applied, dropped) =
            rescan_pending(&mut state.clock, &mut state.log, &mut state.pending);
        report.applied += applied;
        report.discarded += dropped;
        if drain == PendingDrain::SinglePass || applied == 0 {
            break;
        }
    }

    state.stats.operations_applied += report.applied as u64;
    state.stats.operations_buffered += report.buffered as u64;
    state.stats.operations_discarded += report.discarded as u64;
    report
}

/// One pass over the pending buffer in its current order.
///
/// Entries that became immediate successors are applied and removed.
/// Entries the clock already dominates were applied through another path
/// and are removed. Returns `(applied, dropped)`.
fn rescan_pending(
    clock: &mut VectorClock,
    log: &mut OperationLog,
    pending: &mut OperationLog,
) -> (usize, usize) {
    let mut applied = 0;
    let mut dropped = 0;

    pending.retain(|op| {
        if clock.admits_next(&op.version_vector) {
            trace!(version_vector = %op.version_vector, "applying buffered operation");
            clock.merge_in(&op.version_vector);
            log.insert(op.clone());
            applied += 1;
            false
        } else if clock.dominates(&op.version_vector) {
            dropped += 1;
            false
        } else {
            true
        }
    });

    (applied, dropped)
}
