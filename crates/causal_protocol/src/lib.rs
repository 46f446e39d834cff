//! # Causal Protocol
//!
//! Shared types for causally-consistent replicas.
//!
//! This crate provides:
//! - `VectorClock` and the clock algebra (dominance, merge, immediate
//!   successor, lexicographic order)
//! - `Operation` and the sorted, deduplicated `OperationLog`
//! - Protocol messages (client request/reply, gossip, gossip ack, tick)
//! - CBOR encoding and length-prefixed framing
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod codec;
mod error;
mod messages;
mod operation;
mod oplog;

pub use clock::VectorClock;
pub use codec::{decode_message, encode_frame, encode_message, frame_body_len};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{ClientReply, ClientRequest, Gossip, GossipAck, Message};
pub use operation::{Operation, OperationType};
pub use oplog::OperationLog;
