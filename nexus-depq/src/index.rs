//! Ordered index over entry handles.
//!
//! A probabilistic skip list whose nodes point at entries held in a separate
//! arena. The ordering comes from an [`EntryOrder`] strategy, so the same
//! arena can be indexed by key and by value at once.
//!
//! ```text
//! Level 2:  HEAD ────────────► n3 ─────────────────► NIL
//!             │                 │
//! Level 1:  HEAD ──► n1 ──────► n3 ──────► n5 ─────► NIL
//!             │       │         │          │
//! Level 0:  HEAD ──► n1 ──► n2 ► n3 ──► n4 ► n5 ──► NIL
//!                     │      │    │      │    │
//!                     ▼      ▼    ▼      ▼    ▼
//!                   entries arena (shared with the other index)
//! ```
//!
//! Mutation is split into a read-only locate step, which compares pairs and
//! records the predecessor at every level, and a link/unlink step that only
//! rewires handles. The second step never calls into `K` or `V`, so it cannot
//! fail once the first step has returned.

use core::cmp::Ordering;
use core::marker::PhantomData;

use rand_core::RngCore;

use crate::handle::Handle;
use crate::entry::Entry;
use crate::order::EntryOrder;
use crate::storage::Storage;

/// Upper bound for the level ratio; anything larger leaves a single level.
const MAX_LEVEL_RATIO: u32 = 1 << 16;

/// A node in the index: one entry handle plus forward links.
#[derive(Debug, Clone)]
pub(crate) struct IndexNode<H, const MAX_LEVEL: usize> {
    /// Entry this node orders.
    entry: H,
    /// `forward[i]` is the next node at level i.
    forward: [H; MAX_LEVEL],
    /// Node participates in levels `0..=level`.
    level: u8,
}

/// A node together with its predecessor at every level.
///
/// Valid until the index is next mutated. Unlinking through a `Link` performs
/// no comparisons.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Link<H, const MAX_LEVEL: usize> {
    node: H,
    update: [H; MAX_LEVEL],
}

/// Outcome of a predecessor search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Search<H, const MAX_LEVEL: usize> {
    /// First node not ordered before the target, or `NONE` past the end.
    node: H,
    /// Entry of `node` when it compared equal to the target, else `NONE`.
    entry: H,
    update: [H; MAX_LEVEL],
}

impl<H: Handle, const MAX_LEVEL: usize> Search<H, MAX_LEVEL> {
    /// Returns the matching entry, if the search hit one.
    #[inline]
    pub(crate) fn entry(&self) -> Option<H> {
        self.entry.get()
    }

    /// Predecessors of the search position at each level.
    #[inline]
    pub(crate) fn update(&self) -> &[H; MAX_LEVEL] {
        &self.update
    }

    #[inline]
    fn into_link(self) -> Option<Link<H, MAX_LEVEL>> {
        if self.entry.is_none() {
            return None;
        }
        Some(Link {
            node: self.node,
            update: self.update,
        })
    }
}

/// A skip list ordering entry handles by `O`.
///
/// Owns its node storage `S`; entries live in an arena passed in by the
/// caller. Every entry appears at most once.
#[derive(Debug, Clone)]
pub(crate) struct OrderedIndex<O, S, H, R, const MAX_LEVEL: usize> {
    nodes: S,
    /// `head[i]` is the first node at level i.
    head: [H; MAX_LEVEL],
    /// Last node at level 0, for O(1) `last()`.
    tail: H,
    rng: R,
    /// Highest level currently in use (0-indexed).
    level: usize,
    len: usize,
    /// log2(level_ratio). Scales the geometric distribution in `random_level`.
    level_divisor: u8,
    _order: PhantomData<O>,
}

#[inline]
fn entry_at<K, V, A>(entries: &A, handle: A::Handle) -> &Entry<K, V>
where
    A: Storage<Entry<K, V>>,
{
    entries.get(handle).expect("index refers to a vacant entry")
}

impl<O, S, H, R, const MAX_LEVEL: usize> OrderedIndex<O, S, H, R, MAX_LEVEL>
where
    O: EntryOrder,
    H: Handle,
    S: Storage<IndexNode<H, MAX_LEVEL>, Handle = H>,
{
    /// Creates an empty index over `nodes`.
    ///
    /// `level_ratio` must be a power of 2 and >= 2; other values are rounded
    /// to the nearest valid one. 2 gives p=0.5, 4 gives the sparser p=0.25.
    pub(crate) fn new(nodes: S, rng: R, level_ratio: u32) -> Self {
        let level_ratio = level_ratio.clamp(2, MAX_LEVEL_RATIO).next_power_of_two();
        Self {
            nodes,
            head: [H::NONE; MAX_LEVEL],
            tail: H::NONE,
            rng,
            level: 0,
            len: 0,
            level_divisor: level_ratio.trailing_zeros() as u8,
            _order: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entry ordered first, O(1).
    #[inline]
    pub(crate) fn first(&self) -> Option<H> {
        self.head[0].get().map(|node| self.node(node).entry)
    }

    /// Entry ordered last, O(1) through the tail link.
    #[inline]
    pub(crate) fn last(&self) -> Option<H> {
        self.tail.get().map(|node| self.node(node).entry)
    }

    /// Entry handles in ascending order.
    #[inline]
    pub(crate) fn iter(&self) -> Iter<'_, S, H, MAX_LEVEL> {
        Iter {
            nodes: &self.nodes,
            current: self.head[0],
        }
    }

    /// Removes every node. Entries are left to the caller.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.head = [H::NONE; MAX_LEVEL];
        self.tail = H::NONE;
        self.level = 0;
        self.len = 0;
    }

    /// Finds the first entry `e` with `f(e) != Less`, recording predecessors.
    ///
    /// `f` reports how an indexed entry compares to the target and must be
    /// consistent with `O`. The search only reads.
    pub(crate) fn search_by<K, V, A, F>(&self, entries: &A, mut f: F) -> Search<H, MAX_LEVEL>
    where
        A: Storage<Entry<K, V>, Handle = H>,
        F: FnMut(&Entry<K, V>) -> Ordering,
    {
        let mut update = [H::NONE; MAX_LEVEL];
        let mut current = H::NONE;

        // Start from the highest level
        for i in (0..=self.level).rev() {
            let mut next = if current.is_none() {
                self.head[i]
            } else {
                self.node(current).forward[i]
            };

            while next.is_some() {
                let node = self.node(next);
                if f(entry_at(entries, node.entry)) != Ordering::Less {
                    break;
                }
                current = next;
                next = node.forward[i];
            }

            update[i] = current;
        }

        let node = if current.is_none() {
            self.head[0]
        } else {
            self.node(current).forward[0]
        };

        let mut entry = H::NONE;
        if node.is_some() {
            let candidate = self.node(node).entry;
            if f(entry_at(entries, candidate)) == Ordering::Equal {
                entry = candidate;
            }
        }

        Search {
            node,
            entry,
            update,
        }
    }

    /// Searches for the exact pair `(key, value)`.
    #[inline]
    pub(crate) fn search<K, V, A>(&self, entries: &A, key: &K, value: &V) -> Search<H, MAX_LEVEL>
    where
        K: Ord,
        V: Ord,
        A: Storage<Entry<K, V>, Handle = H>,
    {
        self.search_by(entries, |e| O::compare(e.key(), e.value(), key, value))
    }

    /// Locates the node holding `entry`, ready for [`unlink`](Self::unlink).
    pub(crate) fn locate<K, V, A>(&self, entries: &A, entry: H) -> Option<Link<H, MAX_LEVEL>>
    where
        K: Ord,
        V: Ord,
        A: Storage<Entry<K, V>, Handle = H>,
    {
        let target = entries.get(entry)?;
        let search = self.search(entries, target.key(), target.value());
        if search.entry != entry {
            return None;
        }
        search.into_link()
    }

    /// Removes a located node, returning its entry handle. Never compares.
    pub(crate) fn unlink(&mut self, link: Link<H, MAX_LEVEL>) -> H {
        let (entry, level, forward) = {
            let node = self.node(link.node);
            (node.entry, node.level as usize, node.forward)
        };

        for i in 0..=level {
            if link.update[i].is_none() {
                self.head[i] = forward[i];
            } else {
                self.node_mut(link.update[i]).forward[i] = forward[i];
            }
        }

        // Removed the last node
        if forward[0].is_none() {
            self.tail = link.update[0];
        }

        while self.level > 0 && self.head[self.level].is_none() {
            self.level -= 1;
        }

        self.len -= 1;
        self.nodes.remove(link.node);
        entry
    }

    #[inline]
    fn node(&self, handle: H) -> &IndexNode<H, MAX_LEVEL> {
        self.nodes.get(handle).expect("dangling index node")
    }

    #[inline]
    fn node_mut(&mut self, handle: H) -> &mut IndexNode<H, MAX_LEVEL> {
        self.nodes.get_mut(handle).expect("dangling index node")
    }

    /// Asserts ordering, level structure and counters.
    #[cfg(test)]
    pub(crate) fn check<K, V, A>(&self, entries: &A)
    where
        K: Ord,
        V: Ord,
        A: Storage<Entry<K, V>, Handle = H>,
    {
        let ordered = |a: H, b: H| {
            let (a, b) = (entry_at(entries, a), entry_at(entries, b));
            O::compare(a.key(), a.value(), b.key(), b.value()) == Ordering::Less
        };

        let handles: Vec<H> = self.iter().collect();
        assert_eq!(handles.len(), self.len, "len out of sync with level 0");
        assert_eq!(self.nodes.len(), self.len, "node storage out of sync");
        for pair in handles.windows(2) {
            assert!(ordered(pair[0], pair[1]), "level 0 out of order");
        }

        match self.tail.get() {
            None => assert!(self.head[0].is_none(), "tail missing"),
            Some(tail) => {
                assert!(self.node(tail).forward[0].is_none(), "tail has a successor");
                assert_eq!(Some(self.node(tail).entry), handles.last().copied());
            }
        }

        for i in 1..MAX_LEVEL {
            if i > self.level {
                assert!(self.head[i].is_none(), "head above current level");
                continue;
            }
            let mut prev: Option<H> = None;
            let mut current = self.head[i];
            while current.is_some() {
                let node = self.node(current);
                assert!(node.level as usize >= i, "node linked above its level");
                if let Some(prev) = prev {
                    assert!(ordered(prev, node.entry), "level {i} out of order");
                }
                prev = Some(node.entry);
                current = node.forward[i];
            }
        }
    }
}

impl<O, S, H, R, const MAX_LEVEL: usize> OrderedIndex<O, S, H, R, MAX_LEVEL>
where
    O: EntryOrder,
    H: Handle,
    S: Storage<IndexNode<H, MAX_LEVEL>, Handle = H>,
    R: RngCore,
{
    /// Links `entry` after the predecessors recorded in `update`.
    ///
    /// `update` must come from a search on this index with no mutation in
    /// between. Never compares.
    pub(crate) fn link(&mut self, entry: H, update: &[H; MAX_LEVEL]) -> Link<H, MAX_LEVEL> {
        let level = self.random_level();

        let mut forward = [H::NONE; MAX_LEVEL];
        for i in 0..=level {
            forward[i] = if update[i].is_none() {
                self.head[i]
            } else {
                self.node(update[i]).forward[i]
            };
        }

        let node = self.nodes.insert(IndexNode {
            entry,
            forward,
            level: level as u8,
        });

        for i in 0..=level {
            if update[i].is_none() {
                self.head[i] = node;
            } else {
                self.node_mut(update[i]).forward[i] = node;
            }
        }

        if forward[0].is_none() {
            self.tail = node;
        }

        if level > self.level {
            self.level = level;
        }

        self.len += 1;
        debug_assert_eq!(self.nodes.len(), self.len, "node storage out of sync");

        Link {
            node,
            update: *update,
        }
    }

    /// Searches for `entry`'s position and links it there.
    ///
    /// The entry must not already be indexed. Comparisons happen before any
    /// mutation.
    pub(crate) fn insert<K, V, A>(&mut self, entries: &A, entry: H) -> Link<H, MAX_LEVEL>
    where
        K: Ord,
        V: Ord,
        A: Storage<Entry<K, V>, Handle = H>,
    {
        let target = entry_at(entries, entry);
        let search = self.search(entries, target.key(), target.value());
        debug_assert!(search.entry.is_none(), "pair indexed twice");
        self.link(entry, &search.update)
    }

    /// Geometric level: trailing ones of a random word, scaled by the ratio.
    #[inline]
    fn random_level(&mut self) -> usize {
        let r = self.rng.next_u32();
        let level = (r.trailing_ones() as usize) / (self.level_divisor as usize);
        level.min(MAX_LEVEL - 1)
    }
}

/// Iterator over entry handles in index order.
pub(crate) struct Iter<'a, S, H, const MAX_LEVEL: usize> {
    nodes: &'a S,
    current: H,
}

impl<'a, S, H, const MAX_LEVEL: usize> Iterator for Iter<'a, S, H, MAX_LEVEL>
where
    H: Handle,
    S: Storage<IndexNode<H, MAX_LEVEL>, Handle = H>,
{
    type Item = H;

    fn next(&mut self) -> Option<H> {
        let current = self.current.get()?;
        let node = self.nodes.get(current).expect("dangling index node");
        self.current = node.forward[0];
        Some(node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{ByKey, ByValue};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use slab::Slab;
    use std::collections::BTreeSet;

    type Entries = Slab<Entry<u32, u32>>;
    type Nodes = Slab<IndexNode<usize, 8>>;
    type KeyIdx = OrderedIndex<ByKey, Nodes, usize, SmallRng, 8>;
    type ValueIdx = OrderedIndex<ByValue, Nodes, usize, SmallRng, 8>;

    fn make_rng() -> SmallRng {
        SmallRng::seed_from_u64(12345)
    }

    fn key_index() -> KeyIdx {
        OrderedIndex::new(Slab::new(), make_rng(), 2)
    }

    fn add(entries: &mut Entries, index: &mut KeyIdx, key: u32, value: u32) -> usize {
        let h = entries.insert(Entry::with_count(key, value, 1));
        index.insert(&*entries, h);
        h
    }

    fn pairs(entries: &Entries, handles: impl Iterator<Item = usize>) -> Vec<(u32, u32)> {
        handles
            .map(|h| (*entries[h].key(), *entries[h].value()))
            .collect()
    }

    #[test]
    fn new_is_empty() {
        let index = key_index();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.first(), None);
        assert_eq!(index.last(), None);
        assert_eq!(index.iter().count(), 0);
    }

    #[test]
    fn insert_keeps_order() {
        let mut entries = Entries::new();
        let mut index = key_index();

        add(&mut entries, &mut index, 30, 1);
        add(&mut entries, &mut index, 10, 2);
        add(&mut entries, &mut index, 20, 3);
        add(&mut entries, &mut index, 10, 1);

        assert_eq!(
            pairs(&entries, index.iter()),
            vec![(10, 1), (10, 2), (20, 3), (30, 1)]
        );
        index.check(&entries);
    }

    #[test]
    fn same_arena_two_orders() {
        let mut entries = Entries::new();
        let mut by_key = key_index();
        let mut by_value: ValueIdx = OrderedIndex::new(Slab::new(), make_rng(), 2);

        for (k, v) in [(1, 10), (2, 5), (1, 20)] {
            let h = entries.insert(Entry::with_count(k, v, 1));
            by_key.insert(&entries, h);
            by_value.insert(&entries, h);
        }

        assert_eq!(
            pairs(&entries, by_key.iter()),
            vec![(1, 10), (1, 20), (2, 5)]
        );
        assert_eq!(
            pairs(&entries, by_value.iter()),
            vec![(2, 5), (1, 10), (1, 20)]
        );
        by_key.check(&entries);
        by_value.check(&entries);
    }

    #[test]
    fn first_and_last() {
        let mut entries = Entries::new();
        let mut index = key_index();

        let mid = add(&mut entries, &mut index, 50, 0);
        assert_eq!(index.first(), Some(mid));
        assert_eq!(index.last(), Some(mid));

        let low = add(&mut entries, &mut index, 10, 0);
        let high = add(&mut entries, &mut index, 90, 0);
        assert_eq!(index.first(), Some(low));
        assert_eq!(index.last(), Some(high));
    }

    #[test]
    fn search_exact_pair() {
        let mut entries = Entries::new();
        let mut index = key_index();

        let h = add(&mut entries, &mut index, 5, 50);
        add(&mut entries, &mut index, 5, 60);

        assert_eq!(index.search(&entries, &5, &50).entry(), Some(h));
        assert_eq!(index.search(&entries, &5, &55).entry(), None);
        assert_eq!(index.search(&entries, &6, &50).entry(), None);
    }

    #[test]
    fn search_by_key_finds_smallest_value() {
        let mut entries = Entries::new();
        let mut index = key_index();

        add(&mut entries, &mut index, 1, 100);
        add(&mut entries, &mut index, 2, 30);
        let lowest = add(&mut entries, &mut index, 2, 10);
        add(&mut entries, &mut index, 2, 20);
        add(&mut entries, &mut index, 3, 0);

        let found = index.search_by(&entries, |e| e.key().cmp(&2)).entry();
        assert_eq!(found, Some(lowest));

        let missing = index.search_by(&entries, |e| e.key().cmp(&4)).entry();
        assert_eq!(missing, None);
    }

    #[test]
    fn locate_and_unlink() {
        let mut entries = Entries::new();
        let mut index = key_index();

        let a = add(&mut entries, &mut index, 10, 0);
        let b = add(&mut entries, &mut index, 20, 0);
        let c = add(&mut entries, &mut index, 30, 0);

        let link = index.locate(&entries, b).unwrap();
        assert_eq!(index.unlink(link), b);
        assert_eq!(index.len(), 2);
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![a, c]);
        index.check(&entries);

        let link = index.locate(&entries, c).unwrap();
        assert_eq!(index.unlink(link), c);
        assert_eq!(index.last(), Some(a));
        index.check(&entries);
    }

    #[test]
    fn locate_unindexed_entry_is_none() {
        let mut entries = Entries::new();
        let mut index = key_index();

        add(&mut entries, &mut index, 10, 0);
        let stray = entries.insert(Entry::with_count(20, 0, 1));

        assert!(index.locate(&entries, stray).is_none());
        assert!(index.locate(&entries, 999).is_none());
    }

    #[test]
    fn unlink_through_insert_link_restores_index() {
        let mut entries = Entries::new();
        let mut index = key_index();

        for k in [5, 1, 9, 3, 7] {
            add(&mut entries, &mut index, k, 0);
        }
        let before: Vec<_> = index.iter().collect();

        let h = entries.insert(Entry::with_count(4, 0, 1));
        let link = index.insert(&entries, h);
        assert_eq!(index.len(), 6);

        assert_eq!(index.unlink(link), h);
        assert_eq!(index.iter().collect::<Vec<_>>(), before);
        index.check(&entries);
    }

    #[test]
    fn clear_resets() {
        let mut entries = Entries::new();
        let mut index = key_index();

        for k in 0..20 {
            add(&mut entries, &mut index, k, k);
        }
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.first(), None);
        assert_eq!(index.last(), None);
        index.check(&Entries::new());
    }

    #[test]
    fn level_ratio_is_normalised() {
        let index: KeyIdx = OrderedIndex::new(Slab::new(), make_rng(), 3);
        assert_eq!(index.level_divisor, 2);

        let index: KeyIdx = OrderedIndex::new(Slab::new(), make_rng(), 0);
        assert_eq!(index.level_divisor, 1);

        let index: KeyIdx = OrderedIndex::new(Slab::new(), make_rng(), u32::MAX);
        assert_eq!(index.level_divisor, 16);
    }

    #[test]
    fn stress_random_operations() {
        let mut entries = Entries::new();
        let mut index = key_index();
        let mut reference: BTreeSet<(u32, u32)> = BTreeSet::new();
        let mut rng = SmallRng::seed_from_u64(99999);

        for _ in 0..2000 {
            let key = rng.random_range(0..50);
            let value = rng.random_range(0..50);

            if rng.random_range(0..100) < 60 {
                if reference.insert((key, value)) {
                    add(&mut entries, &mut index, key, value);
                }
            } else if let Some(h) = index.search(&entries, &key, &value).entry() {
                let link = index.locate(&entries, h).unwrap();
                index.unlink(link);
                entries.remove(h);
                assert!(reference.remove(&(key, value)));
            } else {
                assert!(!reference.contains(&(key, value)));
            }
        }

        index.check(&entries);
        assert_eq!(
            pairs(&entries, index.iter()),
            reference.into_iter().collect::<Vec<_>>()
        );
    }
}
