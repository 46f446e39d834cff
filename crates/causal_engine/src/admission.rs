//! Causal admission control for client requests.
//!
//! A request carries the clock its client last observed. The replica may
//! only answer once its own clock dominates that dependency; until then the
//! request is deferred, never rejected.

use crate::config::EngineConfig;
use crate::state::ReplicaState;
use causal_protocol::{ClientReply, ClientRequest, Operation, OperationType, VectorClock};
use tracing::{trace, warn};

/// Returns true if a replica at `clock` may answer `request`.
///
/// A dependency with the wrong number of slots is never admissible.
pub fn is_admissible(clock: &VectorClock, request: &ClientRequest) -> bool {
    request.dependency.len() == clock.len() && clock.dominates(&request.dependency)
}

/// Tries to serve a client request.
///
/// Returns the reply if the request was admitted, or `None` if it must stay
/// deferred. Reads leave the state untouched; writes advance the own
/// coordinate and append to both logs.
pub(crate) fn serve(
    state: &mut ReplicaState,
    request: &ClientRequest,
    config: &EngineConfig,
) -> Option<ClientReply> {
    if !is_admissible(&state.clock, request) {
        trace!(
            client_id = request.client_id,
            clock = %state.clock,
            dependency = %request.dependency,
            "request not causally ready"
        );
        return None;
    }

    let reply = match request.op_type {
        OperationType::Read => ClientReply {
            op_type: OperationType::Read,
            data: state.log.latest_value(),
            clock: state.clock.clone(),
            replica_id: state.id,
            client_id: request.client_id,
        },
        OperationType::Write => {
            apply_write(state, request.data, config)?;
            ClientReply {
                op_type: OperationType::Write,
                data: 0,
                clock: state.clock.clone(),
                replica_id: state.id,
                client_id: request.client_id,
            }
        }
    };

    state.stats.requests_served += 1;
    Some(reply)
}

/// Originates a write at this replica.
fn apply_write(state: &mut ReplicaState, data: u64, config: &EngineConfig) -> Option<()> {
    let own = state.self_index();
    let counter = state.clock.get(own)?;
    let own_len = state.own_log.len() as u64;
    if counter > config.counter_ceiling || own_len > config.counter_ceiling {
        warn!(
            replica_id = state.id,
            counter, own_len, "write held back at counter ceiling"
        );
        return None;
    }

    state.clock.increment(own)?;
    let op = Operation::new(state.clock.clone(), data);
    state.log.insert(op.clone());
    state.own_log.insert(op);
    trace!(replica_id = state.id, clock = %state.clock, data, "write applied");
    Some(())
}
