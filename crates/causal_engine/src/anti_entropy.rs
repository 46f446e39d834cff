//! Anti-entropy sender.
//!
//! Each replica pushes the operations it originated to every peer. A
//! per-peer watermark over the own-origin log records how far that peer has
//! been served. The watermark moves from two sources, both through `max`:
//!
//! - a sweep sets it to the log length as soon as a batch is cut (send
//!   cursor, so the same suffix is not resent every tick)
//! - a gossip ack from the peer confirms an index it has received

use crate::state::ReplicaState;
use causal_protocol::{Gossip, GossipAck, Operation};
use tracing::debug;

/// Own-origin operations not yet sent to `peer`.
///
/// Empty if the watermark already covers the log or `peer` is not a
/// replica of this cluster.
pub fn outstanding_for(state: &ReplicaState, peer: u64) -> &[Operation] {
    match state.replica_index(peer) {
        Some(index) => state.own_log.suffix_from(state.gossip_acks[index]),
        None => &[],
    }
}

/// Cuts one gossip batch per peer with outstanding operations.
///
/// Advances each served peer's watermark to the current own-origin log
/// length.
pub(crate) fn sweep(state: &mut ReplicaState) -> Vec<Gossip> {
    let own_len = state.own_log.len() as u64;
    let mut batches = Vec::new();

    for index in 0..state.replicas {
        let peer = index as u64;
        if peer == state.id {
            continue;
        }

        let operations = outstanding_for(state, peer).to_vec();
        if operations.is_empty() {
            continue;
        }

        debug!(
            replica_id = state.id,
            peer,
            count = operations.len(),
            from = state.gossip_acks[index],
            "sending gossip"
        );
        state.gossip_acks[index] = state.gossip_acks[index].max(own_len);
        batches.push(Gossip::new(state.id, peer, operations, own_len));
    }

    state.stats.gossip_sent += batches.len() as u64;
    batches
}

/// Applies a gossip ack to the sender's watermark.
///
/// Acks from unknown replicas, from this replica, or addressed to another
/// replica are ignored. The acked index is clamped to the own-origin log
/// length. Returns true if the watermark moved.
pub(crate) fn record_ack(state: &mut ReplicaState, ack: &GossipAck) -> bool {
    let Some(index) = state.replica_index(ack.sender_id) else {
        return false;
    };
    if ack.sender_id == state.id || ack.receiver_id != state.id {
        return false;
    }

    let acked = ack.acked_index.min(state.own_log.len() as u64);
    let current = state.gossip_acks[index];
    if acked <= current {
        return false;
    }

    state.gossip_acks[index] = acked;
    state.stats.acks_applied += 1;
    true
}
