//! Error types for the replica server.

use causal_engine::EngineError;
use causal_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the replica server and client.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configuration cannot describe a working replica.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The remote side closed the connection.
    #[error("connection closed")]
    ConnectionClosed,
}

impl ServerError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns true if redialing may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Io(_) | ServerError::ConnectionClosed)
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
