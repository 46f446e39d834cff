//! Replica dispatcher.
//!
//! [`process`] is the single entry point into a replica: it consumes the
//! current state and one inbound message and returns the next state plus
//! the messages to send. It never performs I/O, so callers are free to
//! serialize it however they like and to deliver its output later.

use crate::admission;
use crate::anti_entropy;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::gossip;
use crate::state::{ReplicaState, ReplicaStats};
use causal_protocol::{ClientRequest, Gossip, GossipAck, Message, OperationLog, VectorClock};
use tracing::{debug, warn};

/// Applies one inbound message to a replica state.
///
/// - Client request: served if causally ready, queued otherwise.
/// - Gossip: merged, then every queued request is retried in arrival
///   order. Optionally acknowledged to the sender.
/// - Gossip ack: moves the sender's watermark.
/// - Tick: anti-entropy sweep across all peers.
/// - Client reply: output only; ignored as input.
pub fn process(
    mut state: ReplicaState,
    message: Message,
    config: &EngineConfig,
) -> (ReplicaState, Vec<Message>) {
    let mut outbound = Vec::new();

    match message {
        Message::ClientRequest(request) => {
            on_client_request(&mut state, request, config, &mut outbound);
        }
        Message::Gossip(batch) => {
            on_gossip(&mut state, batch, config, &mut outbound);
        }
        Message::GossipAck(ack) => on_gossip_ack(&mut state, &ack),
        Message::Tick => {
            outbound.extend(anti_entropy::sweep(&mut state).into_iter().map(Message::from));
        }
        Message::ClientReply(reply) => {
            warn!(
                replica_id = state.id,
                from = reply.replica_id,
                "ignoring client reply sent to a replica"
            );
        }
    }

    (state, outbound)
}

fn on_client_request(
    state: &mut ReplicaState,
    request: ClientRequest,
    config: &EngineConfig,
    outbound: &mut Vec<Message>,
) {
    match admission::serve(state, &request, config) {
        Some(reply) => outbound.push(reply.into()),
        None => {
            if request.dependency.len() != state.replicas {
                warn!(
                    replica_id = state.id,
                    client_id = request.client_id,
                    dependency = %request.dependency,
                    "request dependency has wrong length; it can never be admitted"
                );
                state.stats.requests_malformed += 1;
            } else {
                debug!(
                    replica_id = state.id,
                    client_id = request.client_id,
                    dependency = %request.dependency,
                    clock = %state.clock,
                    "deferring client request"
                );
            }
            state.stats.requests_deferred += 1;
            state.unsatisfied.push(request);
        }
    }
}

fn on_gossip(
    state: &mut ReplicaState,
    batch: Gossip,
    config: &EngineConfig,
    outbound: &mut Vec<Message>,
) {
    if batch.receiver_id != state.id {
        warn!(
            replica_id = state.id,
            receiver_id = batch.receiver_id,
            "ignoring gossip addressed to another replica"
        );
        return;
    }

    let sender = batch.sender_id;
    let send_index = batch.send_index;
    let report = gossip::merge_batch(state, batch.operations, config.pending_drain);
    debug!(
        replica_id = state.id,
        sender,
        applied = report.applied,
        buffered = report.buffered,
        discarded = report.discarded,
        pending = state.pending.len(),
        clock = %state.clock,
        "merged gossip"
    );

    retry_unsatisfied(state, config, outbound);

    if config.acknowledge_gossip && sender != state.id && state.replica_index(sender).is_some() {
        outbound.push(GossipAck::new(state.id, sender, send_index).into());
    }
}

/// Retries every queued request in arrival order.
///
/// Served requests leave the queue; the rest keep their relative order.
fn retry_unsatisfied(state: &mut ReplicaState, config: &EngineConfig, outbound: &mut Vec<Message>) {
    if state.unsatisfied.is_empty() {
        return;
    }

    let queued = std::mem::take(&mut state.unsatisfied);
    let before = queued.len();
    for request in queued {
        match admission::serve(state, &request, config) {
            Some(reply) => outbound.push(reply.into()),
            None => state.unsatisfied.push(request),
        }
    }

    let served = before - state.unsatisfied.len();
    if served > 0 {
        debug!(
            replica_id = state.id,
            served,
            still_blocked = state.unsatisfied.len(),
            "served deferred requests"
        );
    }
}

fn on_gossip_ack(state: &mut ReplicaState, ack: &GossipAck) {
    if !anti_entropy::record_ack(state, ack) {
        debug!(
            replica_id = state.id,
            sender = ack.sender_id,
            acked_index = ack.acked_index,
            "gossip ack did not move watermark"
        );
    }
}

/// A replica: its state plus the configuration driving the dispatcher.
///
/// Wraps [`process`] for callers that keep the state in one place, such as
/// behind a lock.
#[derive(Debug, Clone)]
pub struct Replica {
    state: ReplicaState,
    config: EngineConfig,
}

impl Replica {
    /// Creates replica `id` of a cluster of `replicas`.
    pub fn new(id: u64, replicas: usize, config: EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            state: ReplicaState::new(id, replicas)?,
            config,
        })
    }

    /// Feeds one inbound message through the dispatcher.
    pub fn handle(&mut self, message: Message) -> Vec<Message> {
        let state = std::mem::take(&mut self.state);
        let (next, outbound) = process(state, message, &self.config);
        self.state = next;
        outbound
    }

    /// Current state.
    pub fn state(&self) -> &ReplicaState {
        &self.state
    }

    /// Replica clock.
    pub fn clock(&self) -> &VectorClock {
        &self.state.clock
    }

    /// Global operation log.
    pub fn log(&self) -> &OperationLog {
        &self.state.log
    }

    /// Operations waiting for a causal gap to close.
    pub fn pending(&self) -> &OperationLog {
        &self.state.pending
    }

    /// Deferred client requests, oldest first.
    pub fn unsatisfied(&self) -> &[ClientRequest] {
        &self.state.unsatisfied
    }

    /// Per-peer gossip watermarks.
    pub fn gossip_acks(&self) -> &[u64] {
        &self.state.gossip_acks
    }

    /// Activity counters.
    pub fn stats(&self) -> &ReplicaStats {
        &self.state.stats
    }

    /// Returns true if there is anything to gossip.
    ///
    /// Lets a ticker skip taking a tick through the dispatcher when this
    /// replica has never originated a write.
    pub fn has_own_operations(&self) -> bool {
        !self.state.own_log.is_empty()
    }
}
