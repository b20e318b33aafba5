//! The (key, value) pair stored once per distinct pair in a queue.

/// An immutable key/value pair together with how many times it occurs.
///
/// Both orderings of a queue refer to the same `Entry` by handle. The key and
/// value are never modified after construction; only the multiplicity moves
/// as equal pairs are inserted and removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<K, V> {
    key: K,
    value: V,
    count: usize,
}

impl<K, V> Entry<K, V> {
    /// Creates an entry occurring `count` times.
    #[inline]
    pub(crate) fn with_count(key: K, value: V, count: usize) -> Self {
        debug_assert!(count > 0, "entry multiplicity must be positive");
        Self { key, value, count }
    }

    /// Returns the key.
    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value (the priority).
    #[inline]
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    /// Returns how many equal pairs this entry stands for.
    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Returns the key and value together.
    #[inline]
    pub(crate) fn key_value(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    #[inline]
    pub(crate) fn acquire(&mut self, count: usize) {
        self.count += count;
    }

    /// Drops `count` occurrences. Returns `true` once none are left.
    #[inline]
    pub(crate) fn release(&mut self, count: usize) -> bool {
        debug_assert!(count <= self.count);
        self.count -= count;
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let entry = Entry::with_count(1u32, "one", 1);
        assert_eq!(entry.key(), &1);
        assert_eq!(entry.value(), &"one");
        assert_eq!(entry.count(), 1);
    }

    #[test]
    fn acquire_release() {
        let mut entry = Entry::with_count(1u32, 10u32, 1);

        entry.acquire(2);
        assert_eq!(entry.count(), 3);

        assert!(!entry.release(2));
        assert_eq!(entry.count(), 1);
        assert!(entry.release(1));
        assert_eq!(entry.count(), 0);
    }
}
