//! Double-ended priority queue over (key, value) pairs.
//!
//! The queue keeps one arena of entries and two skip-list indexes over it:
//!
//! ```text
//!              ┌──────────── entries (slab) ────────────┐
//!              │  0: (1, 10) x1   1: (2, 5) x1   2: (1, 20) x1
//!              └────────────────────────────────────────┘
//! by_key:    (1,10) ──► (1,20) ──► (2,5)      key, then value
//! by_value:  (2,5)  ──► (1,10) ──► (1,20)     value, then key
//! ```
//!
//! Min/max queries read the ends of the value index in O(1). Updates go
//! through a transaction that links or unlinks the entry in both indexes, or
//! in neither.

use core::cmp::Ordering;
use core::fmt;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use slab::Slab;
use tracing::{debug, trace};

use crate::config::QueueConfig;
use crate::entry::Entry;
use crate::error::{QueueError, Result};
use crate::index::{IndexNode, Link, OrderedIndex};
use crate::order::{ByKey, ByValue};
use crate::txn::{Restore, Transaction};

/// Maximum skip list height. Efficient up to ~65K distinct pairs at p=0.5;
/// larger queues degrade gracefully, or use a level ratio of 4.
pub(crate) const MAX_LEVEL: usize = 16;

pub(crate) type Nodes = Slab<IndexNode<usize, MAX_LEVEL>>;
pub(crate) type KeyIndex = OrderedIndex<ByKey, Nodes, usize, SmallRng, MAX_LEVEL>;
pub(crate) type ValueIndex = OrderedIndex<ByValue, Nodes, usize, SmallRng, MAX_LEVEL>;
pub(crate) type IndexLink = Link<usize, MAX_LEVEL>;

/// A priority queue of (key, value) pairs, ordered by value, addressable by key.
///
/// Keys and values may both repeat, including whole duplicate pairs. The
/// value acts as the priority: [`min_value`](Self::min_value) and
/// [`max_value`](Self::max_value) read the extremes, and
/// [`min_key`](Self::min_key)/[`max_key`](Self::max_key) return the keys
/// attached to them. Ties on value are broken by key.
///
/// # Guarantees
///
/// Every operation either completes or leaves the queue exactly as it was,
/// including when `K` or `V` panics inside `Ord::cmp` or `Clone::clone`.
/// `swap`, `clear` and drop never call into `K`/`V` comparisons.
///
/// | Operation | Complexity |
/// |-----------|------------|
/// | `new`, `len`, `is_empty`, `swap` | O(1) |
/// | `min_*`, `max_*` | O(1) |
/// | `insert`, `delete_min`, `delete_max`, `change_value` | O(log n) expected |
/// | `merge` | O(n + m log(n + m)) |
/// | `clone`, `==`, `cmp` | O(n) |
///
/// # Example
///
/// ```
/// use nexus_depq::PriorityQueue;
///
/// let mut queue = PriorityQueue::new();
/// queue.insert("disk", 40);
/// queue.insert("net", 5);
/// queue.insert("disk", 90);
///
/// assert_eq!(queue.min_key(), Ok(&"net"));
/// assert_eq!(queue.max_value(), Ok(&90));
///
/// queue.change_value("net", 100).unwrap();
/// assert_eq!(queue.max_key(), Ok(&"net"));
///
/// queue.delete_min();
/// assert_eq!(queue.min_value(), Ok(&90));
/// ```
///
/// Merging a queue into itself is rejected at compile time:
///
/// ```compile_fail
/// use nexus_depq::PriorityQueue;
///
/// let mut queue: PriorityQueue<u32, u32> = PriorityQueue::new();
/// queue.merge(&mut queue);
/// ```
pub struct PriorityQueue<K, V> {
    pub(crate) entries: Slab<Entry<K, V>>,
    pub(crate) by_key: KeyIndex,
    pub(crate) by_value: ValueIndex,
    /// Sum of entry multiplicities.
    pub(crate) len: usize,
}

impl<K, V> PriorityQueue<K, V> {
    /// Creates an empty queue. Does not allocate.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates an empty queue with room for `capacity` distinct pairs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(QueueConfig::default().with_capacity(capacity))
    }

    /// Creates an empty queue from explicit parameters.
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            entries: Slab::with_capacity(config.capacity),
            by_key: OrderedIndex::new(
                Slab::with_capacity(config.capacity),
                SmallRng::seed_from_u64(config.seed),
                config.level_ratio,
            ),
            by_value: OrderedIndex::new(
                Slab::with_capacity(config.capacity),
                SmallRng::seed_from_u64(config.seed.rotate_left(32)),
                config.level_ratio,
            ),
            len: 0,
        }
    }

    /// Returns the number of pairs, counting duplicates.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the queue holds no pairs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every pair.
    pub fn clear(&mut self) {
        trace!(len = self.len, "clearing queue");
        self.by_key.clear();
        self.by_value.clear();
        self.entries.clear();
        self.len = 0;
    }

    /// Exchanges the contents of two queues. O(1), never fails.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Returns the pair with the smallest value, or `None` if empty.
    #[inline]
    pub fn peek_min(&self) -> Option<(&K, &V)> {
        self.by_value
            .first()
            .map(|h| self.entries[h].key_value())
    }

    /// Returns the pair with the largest value, or `None` if empty.
    #[inline]
    pub fn peek_max(&self) -> Option<(&K, &V)> {
        self.by_value
            .last()
            .map(|h| self.entries[h].key_value())
    }

    /// Returns the smallest value.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] if the queue is empty.
    #[inline]
    pub fn min_value(&self) -> Result<&V> {
        self.peek_min().map(|(_, v)| v).ok_or(QueueError::Empty)
    }

    /// Returns the largest value.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] if the queue is empty.
    #[inline]
    pub fn max_value(&self) -> Result<&V> {
        self.peek_max().map(|(_, v)| v).ok_or(QueueError::Empty)
    }

    /// Returns the key paired with the smallest value.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] if the queue is empty.
    #[inline]
    pub fn min_key(&self) -> Result<&K> {
        self.peek_min().map(|(k, _)| k).ok_or(QueueError::Empty)
    }

    /// Returns the key paired with the largest value.
    ///
    /// # Errors
    ///
    /// [`QueueError::Empty`] if the queue is empty.
    #[inline]
    pub fn max_key(&self) -> Result<&K> {
        self.peek_max().map(|(k, _)| k).ok_or(QueueError::Empty)
    }

    /// Pairs in ascending key order, duplicates repeated.
    fn pairs(&self) -> impl Iterator<Item = (&K, &V)> {
        self.by_key.iter().flat_map(move |h| {
            let entry = &self.entries[h];
            core::iter::repeat_n(entry.key_value(), entry.count())
        })
    }
}

impl<K: Ord, V: Ord> PriorityQueue<K, V> {
    /// Inserts a pair. Equal pairs accumulate.
    pub fn insert(&mut self, key: K, value: V) {
        let mut txn = Transaction::begin(self);
        txn.insert(key, value, 1);
        txn.commit();
    }

    /// Removes one pair with the smallest value. Does nothing if empty.
    pub fn delete_min(&mut self) {
        if let Some(entry) = self.by_value.first() {
            self.release(entry);
        }
    }

    /// Removes one pair with the largest value. Does nothing if empty.
    pub fn delete_max(&mut self) {
        if let Some(entry) = self.by_value.last() {
            self.release(entry);
        }
    }

    /// Replaces the value of one pair with key `key`.
    ///
    /// When several pairs share the key, the one with the smallest value is
    /// replaced; the others are untouched. Setting a pair to the value it
    /// already has is a no-op.
    ///
    /// # Errors
    ///
    /// [`QueueError::KeyNotFound`] if no pair has key `key`. The queue is
    /// unchanged.
    pub fn change_value(&mut self, key: K, value: V) -> Result<()> {
        let search = self
            .by_key
            .search_by(&self.entries, |entry| entry.key().cmp(&key));
        let Some(old) = search.entry() else {
            return Err(QueueError::KeyNotFound);
        };

        if *self.entries[old].value() == value {
            return Ok(());
        }

        let mut txn = Transaction::begin(self);
        txn.insert(key, value, 1);
        txn.stage_release(old);
        txn.commit();
        Ok(())
    }

    /// Moves every pair of `other` into `self`, leaving `other` empty.
    ///
    /// If a comparison or clone panics part way, both queues are left as
    /// they were before the call.
    pub fn merge(&mut self, other: &mut Self)
    where
        K: Clone,
        V: Clone,
    {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.swap(other);
            return;
        }

        let incoming = other.len;
        let mut restore = Restore::new(self);
        for h in other.by_key.iter() {
            let entry = &other.entries[h];
            let mut txn = Transaction::begin(restore.queue());
            txn.insert(entry.key().clone(), entry.value().clone(), entry.count());
            txn.commit();
        }
        restore.commit();
        other.clear();

        debug!(incoming, len = self.len, "merged queues");
    }

    fn release(&mut self, entry: usize) {
        let mut txn = Transaction::begin(self);
        txn.stage_release(entry);
        txn.commit();
    }

    /// Asserts that both indexes hold the same entries in their own order.
    #[cfg(test)]
    pub(crate) fn check(&self) {
        self.by_key.check(&self.entries);
        self.by_value.check(&self.entries);

        assert_eq!(self.by_key.len(), self.entries.len());
        assert_eq!(self.by_value.len(), self.entries.len());

        let mut by_key: Vec<usize> = self.by_key.iter().collect();
        let mut by_value: Vec<usize> = self.by_value.iter().collect();
        by_key.sort_unstable();
        by_value.sort_unstable();
        assert_eq!(by_key, by_value, "indexes disagree on entries");

        let total: usize = self.entries.iter().map(|(_, e)| e.count()).sum();
        assert_eq!(total, self.len, "len out of sync with multiplicities");
        assert!(self.entries.iter().all(|(_, e)| e.count() > 0));
    }
}

impl<K, V> Default for PriorityQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for PriorityQueue<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            by_key: self.by_key.clone(),
            by_value: self.by_value.clone(),
            len: self.len,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // Build the copy first so a panicking clone leaves `self` intact.
        let mut copy = source.clone();
        self.swap(&mut copy);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PriorityQueue<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pairs()).finish()
    }
}

impl<K: Ord, V: Ord> PartialEq for PriorityQueue<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.pairs().eq(other.pairs())
    }
}

impl<K: Ord, V: Ord> Eq for PriorityQueue<K, V> {}

impl<K: Ord, V: Ord> PartialOrd for PriorityQueue<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic over pairs in ascending key order: first differing key,
/// then first differing value; a strict prefix orders first.
impl<K: Ord, V: Ord> Ord for PriorityQueue<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pairs().cmp(other.pairs())
    }
}

impl<K: Ord, V: Ord> Extend<(K, V)> for PriorityQueue<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V: Ord> FromIterator<(K, V)> for PriorityQueue<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}
