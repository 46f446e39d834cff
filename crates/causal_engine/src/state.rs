//! Replica state.

use crate::error::{EngineError, EngineResult};
use causal_protocol::{ClientRequest, OperationLog, VectorClock};

/// Counters describing what a replica has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaStats {
    /// Client requests answered.
    pub requests_served: u64,
    /// Client requests put on the unsatisfied queue.
    pub requests_deferred: u64,
    /// Deferred requests whose dependency has the wrong number of slots.
    pub requests_malformed: u64,
    /// Remote operations applied to the global log.
    pub operations_applied: u64,
    /// Remote operations put in the pending buffer.
    pub operations_buffered: u64,
    /// Remote operations dropped as already known or malformed.
    pub operations_discarded: u64,
    /// Gossip batches produced by anti-entropy sweeps.
    pub gossip_sent: u64,
    /// Gossip acks that moved a watermark.
    pub acks_applied: u64,
}

/// Everything one replica knows.
///
/// Owned by exactly one dispatcher. The dispatcher consumes a state and
/// returns the next one, so there is never more than one live copy.
///
/// # Invariants
///
/// - `clock`, every log entry's version vector and every queued request
///   admitted so far have exactly `replicas` slots
/// - `clock` never decreases in any coordinate
/// - `own_log` holds exactly the writes originated here, in admission order
/// - `gossip_acks[p]` never decreases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaState {
    pub(crate) id: u64,
    pub(crate) replicas: usize,
    pub(crate) clock: VectorClock,
    pub(crate) log: OperationLog,
    pub(crate) own_log: OperationLog,
    pub(crate) pending: OperationLog,
    pub(crate) gossip_acks: Vec<u64>,
    pub(crate) unsatisfied: Vec<ClientRequest>,
    pub(crate) stats: ReplicaStats,
}

impl ReplicaState {
    /// Creates the initial state of replica `id` in a cluster of `replicas`.
    pub fn new(id: u64, replicas: usize) -> EngineResult<Self> {
        if replicas == 0 {
            return Err(EngineError::EmptyCluster);
        }
        if usize::try_from(id).map_or(true, |index| index >= replicas) {
            return Err(EngineError::ReplicaOutOfRange {
                replica_id: id,
                replicas,
            });
        }

        Ok(Self {
            id,
            replicas,
            clock: VectorClock::zeroed(replicas),
            log: OperationLog::new(),
            own_log: OperationLog::new(),
            pending: OperationLog::new(),
            gossip_acks: vec![0; replicas],
            unsatisfied: Vec::new(),
            stats: ReplicaStats::default(),
        })
    }

    /// This replica's id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of replicas in the cluster.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Current vector clock.
    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// Every applied operation.
    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Operations originated at this replica.
    pub fn own_log(&self) -> &OperationLog {
        &self.own_log
    }

    /// Received operations that are not causally ready yet.
    pub fn pending(&self) -> &OperationLog {
        &self.pending
    }

    /// Per-replica gossip watermarks over the own-origin log.
    pub fn gossip_acks(&self) -> &[u64] {
        &self.gossip_acks
    }

    /// Deferred client requests, oldest first.
    pub fn unsatisfied(&self) -> &[ClientRequest] {
        &self.unsatisfied
    }

    /// Activity counters.
    pub fn stats(&self) -> &ReplicaStats {
        &self.stats
    }

    /// Value a read would return right now.
    pub fn current_value(&self) -> u64 {
        self.log.latest_value()
    }

    /// Own slot in the vector clock.
    pub(crate) fn self_index(&self) -> usize {
        // Checked against `replicas` in `new`.
        self.id as usize
    }

    /// Maps a wire replica id to a slot, if it names a replica.
    pub(crate) fn replica_index(&self, replica_id: u64) -> Option<usize> {
        usize::try_from(replica_id)
            .ok()
            .filter(|index| *index < self.replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = ReplicaState::new(1, 3).unwrap();
        assert_eq!(state.id(), 1);
        assert_eq!(state.replicas(), 3);
        assert_eq!(state.clock(), &VectorClock::zeroed(3));
        assert!(state.log().is_empty());
        assert!(state.own_log().is_empty());
        assert!(state.pending().is_empty());
        assert_eq!(state.gossip_acks(), &[0, 0, 0]);
        assert!(state.unsatisfied().is_empty());
        assert_eq!(state.current_value(), 0);
    }

    #[test]
    fn rejects_bad_membership() {
        assert_eq!(ReplicaState::new(0, 0), Err(EngineError::EmptyCluster));
        assert_eq!(
            ReplicaState::new(3, 3),
            Err(EngineError::ReplicaOutOfRange {
                replica_id: 3,
                replicas: 3
            })
        );
    }

    #[test]
    fn replica_index_bounds() {
        let state = ReplicaState::new(0, 2).unwrap();
        assert_eq!(state.replica_index(1), Some(1));
        assert_eq!(state.replica_index(2), None);
        assert_eq!(state.replica_index(u64::MAX), None);
    }
}
