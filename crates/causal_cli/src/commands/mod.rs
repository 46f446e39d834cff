//! CLI command implementations.

pub mod client;
pub mod serve;
