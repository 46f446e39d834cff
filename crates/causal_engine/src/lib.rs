//! # Causal Engine
//!
//! Causal-consistency state machine for one replica of a multi-writer
//! replicated register.
//!
//! This crate provides:
//! - Causal admission control for client reads and writes
//! - Gossip merge engine with a pending buffer for out-of-order delivery
//! - Anti-entropy sender with per-peer watermarks
//! - The replica dispatcher, a pure `(state, message) -> (state', messages)`
//!   reducer
//!
//! ## Architecture
//!
//! All replica state lives in one [`ReplicaState`] value owned by the
//! caller. [`process`] consumes it together with one inbound [`Message`]
//! and returns the next state and the outbound messages. Nothing in this
//! crate blocks, locks, or performs I/O; the server serializes calls and
//! delivers the output.
//!
//! ## Key Invariants
//!
//! - An operation enters the log only when it is an immediate successor of
//!   the replica clock
//! - Logs are deduplicated by version vector; replaying gossip is harmless
//! - Every client reply carries a clock that dominates the request's
//!   dependency
//! - Gossip watermarks never decrease
//!
//! ## Liveness
//!
//! Deferred requests and buffered operations never expire. They make
//! progress only when more gossip arrives. With [`PendingDrain::SinglePass`]
//! each batch rescans the pending buffer once; because a dependent
//! operation dominates, and therefore sorts after, its prerequisites, one
//! pass drains every chain whose links have all arrived from well-behaved
//! peers. [`PendingDrain::FixedPoint`] keeps rescanning until nothing
//! applies, which also covers inputs that break that ordering.
//!
//! [`Message`]: causal_protocol::Message

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod admission;
mod anti_entropy;
mod config;
mod dispatcher;
mod error;
mod gossip;
mod state;

pub use admission::is_admissible;
pub use anti_entropy::outstanding_for;
pub use config::{EngineConfig, PendingDrain, COUNTER_CEILING};
pub use dispatcher::{process, Replica};
pub use error::{EngineError, EngineResult};
pub use state::{ReplicaState, ReplicaStats};
