//! Protocol messages exchanged between clients and replicas.

use crate::clock::VectorClock;
use crate::operation::{Operation, OperationType};
use serde::{Deserialize, Serialize};

/// A replica protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Client read or write request.
    ClientRequest(ClientRequest),
    /// Anti-entropy push from one replica to another.
    Gossip(Gossip),
    /// Receipt confirmation for a gossip push.
    GossipAck(GossipAck),
    /// Internal timer tick that triggers an anti-entropy sweep.
    Tick,
    /// Reply to a client request.
    ClientReply(ClientReply),
}

impl Message {
    /// Returns the message type code.
    pub fn type_code(&self) -> u8 {
        match self {
            Message::ClientRequest(_) => 0,
            Message::Gossip(_) => 1,
            Message::GossipAck(_) => 2,
            Message::Tick => 3,
            Message::ClientReply(_) => 4,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::ClientRequest(_) => "client_request",
            Message::Gossip(_) => "gossip",
            Message::GossipAck(_) => "gossip_ack",
            Message::Tick => "tick",
            Message::ClientReply(_) => "client_reply",
        }
    }
}

impl From<ClientRequest> for Message {
    fn from(request: ClientRequest) -> Self {
        Message::ClientRequest(request)
    }
}

impl From<Gossip> for Message {
    fn from(gossip: Gossip) -> Self {
        Message::Gossip(gossip)
    }
}

impl From<GossipAck> for Message {
    fn from(ack: GossipAck) -> Self {
        Message::GossipAck(ack)
    }
}

impl From<ClientReply> for Message {
    fn from(reply: ClientReply) -> Self {
        Message::ClientReply(reply)
    }
}

/// Request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Client identifier, used to route the reply.
    pub client_id: u64,
    /// Replica the client addressed.
    pub replica_id: u64,
    /// Read or write.
    pub op_type: OperationType,
    /// Value to write (ignored for reads).
    pub data: u64,
    /// Clock the client last observed.
    pub dependency: VectorClock,
}

impl ClientRequest {
    /// Creates a read request.
    pub fn read(client_id: u64, replica_id: u64, dependency: impl Into<VectorClock>) -> Self {
        Self {
            client_id,
            replica_id,
            op_type: OperationType::Read,
            data: 0,
            dependency: dependency.into(),
        }
    }

    /// Creates a write request.
    pub fn write(
        client_id: u64,
        replica_id: u64,
        data: u64,
        dependency: impl Into<VectorClock>,
    ) -> Self {
        Self {
            client_id,
            replica_id,
            op_type: OperationType::Write,
            data,
            dependency: dependency.into(),
        }
    }
}

/// Batch of operations pushed from one replica to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gossip {
    /// Sending replica.
    pub sender_id: u64,
    /// Receiving replica.
    pub receiver_id: u64,
    /// Operations originated at the sender.
    pub operations: Vec<Operation>,
    /// Length of the sender's own-origin log when the batch was cut.
    pub send_index: u64,
}

impl Gossip {
    /// Creates a gossip push.
    pub fn new(sender_id: u64, receiver_id: u64, operations: Vec<Operation>, send_index: u64) -> Self {
        Self {
            sender_id,
            receiver_id,
            operations,
            send_index,
        }
    }
}

/// Receipt confirmation for a gossip push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipAck {
    /// Replica confirming receipt.
    pub sender_id: u64,
    /// Replica that sent the gossip.
    pub receiver_id: u64,
    /// Own-origin log index the sender has received up to.
    pub acked_index: u64,
}

impl GossipAck {
    /// Creates a gossip acknowledgment.
    pub fn new(sender_id: u64, receiver_id: u64, acked_index: u64) -> Self {
        Self {
            sender_id,
            receiver_id,
            acked_index,
        }
    }
}

/// Reply to a client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReply {
    /// Operation that was served.
    pub op_type: OperationType,
    /// Value read (zero for writes).
    pub data: u64,
    /// Replica clock after the request was served.
    pub clock: VectorClock,
    /// Replica that served the request.
    pub replica_id: u64,
    /// Client the reply is addressed to.
    pub client_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_codes() {
        let request = Message::from(ClientRequest::read(1, 0, [0, 0]));
        let gossip = Message::from(Gossip::new(0, 1, vec![], 0));
        let ack = Message::from(GossipAck::new(1, 0, 3));
        let reply = Message::from(ClientReply {
            op_type: OperationType::Read,
            data: 0,
            clock: VectorClock::zeroed(2),
            replica_id: 0,
            client_id: 1,
        });

        assert_eq!(request.type_code(), 0);
        assert_eq!(gossip.type_code(), 1);
        assert_eq!(ack.type_code(), 2);
        assert_eq!(Message::Tick.type_code(), 3);
        assert_eq!(reply.type_code(), 4);
        assert_eq!(ack.kind(), "gossip_ack");
    }

    #[test]
    fn request_constructors() {
        let read = ClientRequest::read(9, 2, [1, 0, 0]);
        assert_eq!(read.op_type, OperationType::Read);
        assert_eq!(read.data, 0);

        let write = ClientRequest::write(9, 2, 42, [1, 0, 0]);
        assert_eq!(write.op_type, OperationType::Write);
        assert_eq!(write.data, 42);
        assert_eq!(write.dependency.as_slice(), &[1, 0, 0]);
    }
}
