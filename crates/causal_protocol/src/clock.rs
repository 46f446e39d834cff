//! Vector clock algebra.
//!
//! All functions here are total over vectors of the same length `N`, where
//! `N` is the number of replicas. Mixing lengths is a caller bug: it trips a
//! `debug_assert!` in debug builds and is otherwise unspecified. Clocks that
//! arrive from the network are checked with [`VectorClock::check_len`] before
//! they reach this module.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Returns true iff `a[i] >= b[i]` for every index.
///
/// "`a` has already seen everything `b` represents."
pub fn dominates(a: &[u64], b: &[u64]) -> bool {
    debug_assert_eq!(a.len(), b.len(), "vector clock length mismatch");
    a.iter().zip(b).all(|(x, y)| x >= y)
}

/// Component-wise maximum of two clocks.
pub fn merge(a: &[u64], b: &[u64]) -> Vec<u64> {
    debug_assert_eq!(a.len(), b.len(), "vector clock length mismatch");
    a.iter().zip(b).map(|(x, y)| *x.max(y)).collect()
}

/// Returns true iff `b` is exactly one increment ahead of `a` in exactly one
/// coordinate and not ahead anywhere else.
///
/// An operation whose version vector is an immediate successor of the
/// current clock can be applied without skipping any causal dependency.
pub fn is_immediate_successor(a: &[u64], b: &[u64]) -> bool {
    debug_assert_eq!(a.len(), b.len(), "vector clock length mismatch");
    let mut bumped = false;
    for (&have, &want) in a.iter().zip(b) {
        if !bumped && have.checked_add(1) == Some(want) {
            bumped = true;
            continue;
        }
        if have < want {
            return false;
        }
    }
    bumped
}

/// Strict dictionary order: the first differing index decides.
///
/// Carries no causal meaning; used for log ordering and tie-breaks only.
pub fn lexicographic_greater(a: &[u64], b: &[u64]) -> bool {
    lexicographic_cmp(a, b) == Ordering::Greater
}

/// Total lexicographic comparison of two clocks.
pub fn lexicographic_cmp(a: &[u64], b: &[u64]) -> Ordering {
    debug_assert_eq!(a.len(), b.len(), "vector clock length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// A fixed-length vector of per-replica counters.
///
/// Slot `i` counts the operations originated at replica `i` that the owner
/// of this clock has causally incorporated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(Vec<u64>);

impl VectorClock {
    /// Creates an all-zero clock for `replicas` replicas.
    pub fn zeroed(replicas: usize) -> Self {
        Self(vec![0; replicas])
    }

    /// Creates a clock from raw counters.
    pub fn from_counters(counters: Vec<u64>) -> Self {
        Self(counters)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the clock has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the counter for `replica`, if in range.
    pub fn get(&self, replica: usize) -> Option<u64> {
        self.0.get(replica).copied()
    }

    /// Returns the counters as a slice.
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Consumes the clock and returns its counters.
    pub fn into_counters(self) -> Vec<u64> {
        self.0
    }

    /// Fails unless the clock has exactly `expected` slots.
    pub fn check_len(&self, expected: usize) -> ProtocolResult<()> {
        if self.0.len() == expected {
            Ok(())
        } else {
            Err(ProtocolError::ClockLength {
                expected,
                actual: self.0.len(),
            })
        }
    }

    /// Increments the counter for `replica`.
    ///
    /// Returns the new value, or `None` if the index is out of range or the
    /// counter would overflow. The clock is unchanged on `None`.
    pub fn increment(&mut self, replica: usize) -> Option<u64> {
        let slot = self.0.get_mut(replica)?;
        *slot = slot.checked_add(1)?;
        Some(*slot)
    }

    /// See [`dominates`].
    pub fn dominates(&self, other: &VectorClock) -> bool {
        dominates(&self.0, &other.0)
    }

    /// See [`merge`].
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        Self(merge(&self.0, &other.0))
    }

    /// Merges `other` into `self` in place.
    pub fn merge_in(&mut self, other: &VectorClock) {
        debug_assert_eq!(self.len(), other.len(), "vector clock length mismatch");
        for (mine, theirs) in self.0.iter_mut().zip(&other.0) {
            *mine = (*mine).max(*theirs);
        }
    }

    /// Returns true if `next` is an immediate successor of `self`.
    ///
    /// See [`is_immediate_successor`].
    pub fn admits_next(&self, next: &VectorClock) -> bool {
        is_immediate_successor(&self.0, &next.0)
    }

    /// See [`lexicographic_greater`].
    pub fn lexicographic_greater(&self, other: &VectorClock) -> bool {
        lexicographic_greater(&self.0, &other.0)
    }
}

impl From<Vec<u64>> for VectorClock {
    fn from(counters: Vec<u64>) -> Self {
        Self(counters)
    }
}

impl<const N: usize> From<[u64; N]> for VectorClock {
    fn from(counters: [u64; N]) -> Self {
        Self(counters.to_vec())
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, counter) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{counter}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dominance() {
        assert!(dominates(&[1, 2, 3], &[1, 2, 3]));
        assert!(dominates(&[2, 2, 3], &[1, 0, 3]));
        assert!(!dominates(&[1, 0, 0], &[0, 1, 0]));
        assert!(!dominates(&[0, 0, 0], &[1, 0, 0]));
    }

    #[test]
    fn merge_takes_max() {
        assert_eq!(merge(&[1, 0, 4], &[0, 3, 2]), vec![1, 3, 4]);
    }

    #[test]
    fn immediate_successor_single_increment() {
        assert!(is_immediate_successor(&[0, 0, 0], &[1, 0, 0]));
        assert!(is_immediate_successor(&[2, 1, 0], &[2, 2, 0]));
        // Behind elsewhere is fine: the successor only needs what we have.
        assert!(is_immediate_successor(&[3, 1, 5], &[3, 2, 0]));
    }

    #[test]
    fn immediate_successor_rejects_gaps() {
        // Two steps ahead in one coordinate.
        assert!(!is_immediate_successor(&[0, 0, 0], &[2, 0, 0]));
        // One step ahead in two coordinates.
        assert!(!is_immediate_successor(&[0, 0, 0], &[1, 1, 0]));
        // One step ahead plus a gap elsewhere.
        assert!(!is_immediate_successor(&[0, 0, 0], &[1, 0, 3]));
        // Nothing new.
        assert!(!is_immediate_successor(&[1, 0, 0], &[1, 0, 0]));
        assert!(!is_immediate_successor(&[2, 0, 0], &[1, 0, 0]));
    }

    #[test]
    fn immediate_successor_at_counter_limit() {
        assert!(!is_immediate_successor(&[u64::MAX], &[0]));
        assert!(is_immediate_successor(&[u64::MAX - 1], &[u64::MAX]));
    }

    #[test]
    fn lexicographic_order() {
        assert!(lexicographic_greater(&[1, 0, 0], &[0, 1, 0]));
        assert!(lexicographic_greater(&[0, 2, 0], &[0, 1, 9]));
        assert!(!lexicographic_greater(&[0, 1, 0], &[0, 1, 0]));
        assert!(!lexicographic_greater(&[0, 1, 0], &[1, 0, 0]));
    }

    #[test]
    fn clock_increment() {
        let mut clock = VectorClock::zeroed(3);
        assert_eq!(clock.increment(1), Some(1));
        assert_eq!(clock.increment(1), Some(2));
        assert_eq!(clock.as_slice(), &[0, 2, 0]);
        assert_eq!(clock.increment(3), None);

        let mut full = VectorClock::from([u64::MAX]);
        assert_eq!(full.increment(0), None);
        assert_eq!(full.as_slice(), &[u64::MAX]);
    }

    #[test]
    fn clock_length_check() {
        let clock = VectorClock::from([0, 0]);
        assert!(clock.check_len(2).is_ok());
        assert_eq!(
            clock.check_len(3),
            Err(ProtocolError::ClockLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn clock_display() {
        assert_eq!(VectorClock::from([1, 0, 42]).to_string(), "[1,0,42]");
    }

    fn clocks(n: usize) -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(0u64..8, n)
    }

    proptest! {
        #[test]
        fn merge_is_join(a in clocks(4), b in clocks(4), c in clocks(4)) {
            let ab = merge(&a, &b);
            prop_assert_eq!(&ab, &merge(&b, &a));
            prop_assert_eq!(merge(&ab, &c), merge(&a, &merge(&b, &c)));
            prop_assert_eq!(merge(&a, &a), a.clone());
            prop_assert!(dominates(&ab, &a));
            prop_assert!(dominates(&ab, &b));
        }

        #[test]
        fn successor_is_dominated_after_merge(a in clocks(4), b in clocks(4)) {
            if is_immediate_successor(&a, &b) {
                prop_assert!(!dominates(&a, &b));
                let merged = merge(&a, &b);
                prop_assert!(dominates(&merged, &b));
                let diff: u64 = merged.iter().zip(&a).map(|(m, x)| m - x).sum();
                prop_assert_eq!(diff, 1);
            }
        }

        #[test]
        fn lexicographic_is_strict_total(a in clocks(3), b in clocks(3)) {
            let gt = lexicographic_greater(&a, &b);
            let lt = lexicographic_greater(&b, &a);
            prop_assert!(!(gt && lt));
            prop_assert_eq!(!gt && !lt, a == b);
        }
    }
}
