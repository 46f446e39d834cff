//! Sorted, deduplicated operation log.

use crate::operation::Operation;
use std::slice::Iter;

/// An ordered collection of operations.
///
/// Entries are kept sorted by the lexicographic order of their version
/// vectors, so insertion is a binary search and duplicates are detected in
/// place.
///
/// # Invariants
///
/// - No two entries share a version vector
/// - Entries are in lexicographic order, not causal or arrival order
///
/// The order is only used for deduplication and for picking the value
/// returned to reads. It never decides causal readiness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationLog {
    entries: Vec<Operation>,
}

impl OperationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an operation at its sorted position.
    ///
    /// Inserting an operation whose version vector is already present is a
    /// no-op. Returns true if the log changed.
    pub fn insert(&mut self, op: Operation) -> bool {
        let index = self.position(&op);
        if let Some(existing) = self.entries.get(index) {
            if existing.version_vector == op.version_vector {
                return false;
            }
        }
        self.entries.insert(index, op);
        true
    }

    /// Returns true if an operation with the same version vector is present.
    pub fn contains(&self, op: &Operation) -> bool {
        self.entries
            .get(self.position(op))
            .is_some_and(|existing| existing.version_vector == op.version_vector)
    }

    /// Data of the lexicographically greatest entry, or `0` if empty.
    ///
    /// A deterministic tie-break among concurrent writes, not "latest by
    /// wall time".
    pub fn latest_value(&self) -> u64 {
        self.entries.last().map(|op| op.data).unwrap_or(0)
    }

    /// Entries starting at `index`, or an empty slice past the end.
    pub fn suffix_from(&self, index: u64) -> &[Operation] {
        match usize::try_from(index) {
            Ok(start) if start < self.entries.len() => &self.entries[start..],
            _ => &[],
        }
    }

    /// Keeps only entries for which `keep` returns true.
    ///
    /// Entries are visited once, in log order. Sortedness is preserved.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Operation) -> bool,
    {
        self.entries.retain(keep);
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in log order.
    pub fn iter(&self) -> Iter<'_, Operation> {
        self.entries.iter()
    }

    /// Returns the entries as a slice.
    pub fn as_slice(&self) -> &[Operation] {
        &self.entries
    }

    /// First index whose entry is not lexicographically below `op`.
    fn position(&self, op: &Operation) -> usize {
        self.entries.partition_point(|existing| {
            op.version_vector
                .lexicographic_greater(&existing.version_vector)
        })
    }
}

impl FromIterator<Operation> for OperationLog {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut log = Self::new();
        for op in iter {
            log.insert(op);
        }
        log
    }
}

impl<'a> IntoIterator for &'a OperationLog {
    type Item = &'a Operation;
    type IntoIter = Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
