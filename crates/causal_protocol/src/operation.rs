//! Replicated operations.

use crate::clock::VectorClock;
use serde::{Deserialize, Serialize};

/// Kind of client operation.
///
/// On the wire a read is code `0`; every other code is a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub enum OperationType {
    /// Return the current value.
    Read,
    /// Replace the current value.
    Write,
}

impl OperationType {
    /// Converts to a numeric code for encoding.
    pub fn to_code(&self) -> u64 {
        match self {
            OperationType::Read => 0,
            OperationType::Write => 1,
        }
    }

    /// Converts from a numeric code. Any non-zero code is a write.
    pub fn from_code(code: u64) -> Self {
        if code == 0 {
            OperationType::Read
        } else {
            OperationType::Write
        }
    }
}

impl From<u64> for OperationType {
    fn from(code: u64) -> Self {
        Self::from_code(code)
    }
}

impl From<OperationType> for u64 {
    fn from(op_type: OperationType) -> Self {
        op_type.to_code()
    }
}

/// A write that has been admitted by its origin replica.
///
/// `version_vector` is the origin's clock right after the write was
/// admitted. It identifies the operation (two operations with equal version
/// vectors are the same operation) and encodes its causal predecessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Clock snapshot at admission.
    pub version_vector: VectorClock,
    /// Written value.
    pub data: u64,
}

impl Operation {
    /// Creates a new operation.
    pub fn new(version_vector: impl Into<VectorClock>, data: u64) -> Self {
        Self {
            version_vector: version_vector.into(),
            data,
        }
    }
}
