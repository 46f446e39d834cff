//! Error types for the replica engine.
//!
//! The state machine itself never fails: a request that cannot be served
//! yet is deferred, and malformed input is dropped. Errors only come from
//! constructing a replica with an impossible configuration.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur when setting up a replica.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The cluster has no replicas.
    #[error("cluster must have at least one replica")]
    EmptyCluster,

    /// Replica id is not a valid index into the cluster.
    #[error("replica id {replica_id} out of range for {replicas} replicas")]
    ReplicaOutOfRange {
        /// Offending replica id.
        replica_id: u64,
        /// Number of replicas in the cluster.
        replicas: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::ReplicaOutOfRange {
            replica_id: 5,
            replicas: 3,
        };
        assert_eq!(err.to_string(), "replica id 5 out of range for 3 replicas");
        assert_eq!(
            EngineError::EmptyCluster.to_string(),
            "cluster must have at least one replica"
        );
    }
}
