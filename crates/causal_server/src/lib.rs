//! # Causal Server
//!
//! TCP host for one replica of the causal replicated store.
//!
//! This crate provides:
//! - Length-prefixed CBOR framing over tokio streams
//! - Connection registries for peer gossip, peer acks and client replies
//! - The replica server: accept loop, peer dialer, gossip ticker
//! - A client session that carries its observed clock between replicas
//!
//! # Architecture
//!
//! Each replica listens on its own entry of the peer list and dials every
//! other entry twice, once for gossip batches and once for gossip acks.
//! Clients connect to any replica; the connection a client's first request
//! arrives on carries all replies to that client.
//!
//! ```rust,ignore
//! use causal_server::{ReplicaServer, ServerConfig};
//!
//! let config = ServerConfig::new(0, peers);
//! let handle = ReplicaServer::new(config)?.start().await?;
//! ```
//!
//! # Concurrency
//!
//! The replica state machine sits behind one mutex. Inbound frames are
//! dispatched under the lock in arrival order per connection; the
//! resulting messages are queued on unbounded per-link channels after the
//! lock is released, and a writer task per link drains its queue.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod config;
mod error;
mod registry;
mod server;
mod transport;

pub use client::ReplicaClient;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use registry::ConnectionRegistry;
pub use server::{ReplicaServer, ServerHandle};
pub use transport::{read_frame, write_frame};
