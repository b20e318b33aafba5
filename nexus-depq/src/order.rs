//! Ordering strategies for the two indexes of a queue.
//!
//! Each index is parameterised by a zero-sized strategy type. Both strategies
//! are total orders over (key, value) pairs; they differ only in which
//! component is compared first.

use core::cmp::Ordering;

/// Compile-time ordering strategy over (key, value) pairs.
pub(crate) trait EntryOrder {
    /// Compares the pair `(key, value)` with `(other_key, other_value)`.
    fn compare<K: Ord, V: Ord>(key: &K, value: &V, other_key: &K, other_value: &V) -> Ordering;
}

/// Orders by key, breaking ties by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ByKey;

impl EntryOrder for ByKey {
    #[inline]
    fn compare<K: Ord, V: Ord>(key: &K, value: &V, other_key: &K, other_value: &V) -> Ordering {
        key.cmp(other_key).then_with(|| value.cmp(other_value))
    }
}

/// Orders by value, breaking ties by key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ByValue;

impl EntryOrder for ByValue {
    #[inline]
    fn compare<K: Ord, V: Ord>(key: &K, value: &V, other_key: &K, other_value: &V) -> Ordering {
        value.cmp(other_value).then_with(|| key.cmp(other_key))
    }
}
