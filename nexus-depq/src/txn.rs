//! Commit-or-rollback guards for queue mutations.
//!
//! Every mutation that touches both indexes goes through a [`Transaction`].
//! Comparisons on `K`/`V` can unwind at any point; the guard records what has
//! already been linked and undoes it in `Drop` unless the transaction was
//! committed. Undo and commit steps only rewire handles, so they cannot
//! unwind themselves.

use tracing::debug;

use crate::entry::Entry;
use crate::queue::{IndexLink, PriorityQueue};

/// How to revert the insertion made by a transaction.
enum Undo {
    /// An equal pair was present; its multiplicity was raised by `count`.
    Acquired { entry: usize, count: usize },
    /// A new entry was created and linked into the key index, and into the
    /// value index once `value_link` is set.
    Created {
        entry: usize,
        key_link: IndexLink,
        value_link: Option<IndexLink>,
    },
}

/// A removal that has been located in both indexes and waits for commit.
enum Release {
    /// Other equal pairs remain; drop one occurrence.
    Decrement(usize),
    /// Last occurrence; the entry leaves both indexes and the arena.
    Unlink {
        entry: usize,
        key_link: IndexLink,
        value_link: IndexLink,
    },
}

/// Groups at most one insertion and one removal into an atomic update.
///
/// The insertion is applied eagerly and rolled back on drop. The removal is
/// located eagerly (the fallible part) and applied on [`commit`](Self::commit).
pub(crate) struct Transaction<'a, K, V> {
    queue: &'a mut PriorityQueue<K, V>,
    undo: Option<Undo>,
    release: Option<Release>,
}

impl<'a, K: Ord, V: Ord> Transaction<'a, K, V> {
    pub(crate) fn begin(queue: &'a mut PriorityQueue<K, V>) -> Self {
        Self {
            queue,
            undo: None,
            release: None,
        }
    }

    /// Adds `count` occurrences of `(key, value)`.
    ///
    /// An equal pair already in the queue is reused. Otherwise the pair is
    /// linked into the key index, then the value index.
    pub(crate) fn insert(&mut self, key: K, value: V, count: usize) {
        debug_assert!(self.undo.is_none(), "one insertion per transaction");
        let queue = &mut *self.queue;

        let search = queue.by_key.search(&queue.entries, &key, &value);
        if let Some(entry) = search.entry() {
            queue.entries[entry].acquire(count);
            queue.len += count;
            self.undo = Some(Undo::Acquired { entry, count });
            return;
        }

        let entry = queue.entries.insert(Entry::with_count(key, value, count));
        let key_link = queue.by_key.link(entry, search.update());
        queue.len += count;
        self.undo = Some(Undo::Created {
            entry,
            key_link,
            value_link: None,
        });

        // Compares while searching; an unwind here is undone by Drop.
        let value_link = queue.by_value.insert(&queue.entries, entry);
        if let Some(Undo::Created { value_link: slot, .. }) = self.undo.as_mut() {
            *slot = Some(value_link);
        }
    }

    /// Locates one occurrence of `entry` for removal on commit.
    pub(crate) fn stage_release(&mut self, entry: usize) {
        debug_assert!(self.release.is_none(), "one removal per transaction");
        let queue = &*self.queue;

        let release = if queue.entries[entry].count() > 1 {
            Release::Decrement(entry)
        } else {
            let key_link = queue
                .by_key
                .locate(&queue.entries, entry)
                .expect("entry missing from key index");
            let value_link = queue
                .by_value
                .locate(&queue.entries, entry)
                .expect("entry missing from value index");
            Release::Unlink {
                entry,
                key_link,
                value_link,
            }
        };

        self.release = Some(release);
    }

    /// Keeps the insertion and applies the staged removal.
    pub(crate) fn commit(mut self) {
        self.undo = None;
        let queue = &mut *self.queue;

        match self.release.take() {
            None => {}
            Some(Release::Decrement(entry)) => {
                queue.entries[entry].release(1);
                queue.len -= 1;
            }
            Some(Release::Unlink {
                entry,
                key_link,
                value_link,
            }) => {
                queue.by_key.unlink(key_link);
                queue.by_value.unlink(value_link);
                queue.entries.remove(entry);
                queue.len -= 1;
            }
        }
    }
}

impl<K, V> Drop for Transaction<'_, K, V> {
    fn drop(&mut self) {
        let Some(undo) = self.undo.take() else {
            return;
        };
        let queue = &mut *self.queue;

        match undo {
            Undo::Acquired { entry, count } => {
                queue.entries[entry].release(count);
                queue.len -= count;
            }
            Undo::Created {
                entry,
                key_link,
                value_link,
            } => {
                if let Some(link) = value_link {
                    queue.by_value.unlink(link);
                }
                queue.by_key.unlink(key_link);
                let removed = queue.entries.remove(entry);
                queue.len -= removed.count();
            }
        }

        debug!(len = queue.len, "rolled back queue transaction");
    }
}

/// Holds a full copy of a queue and puts it back on drop unless committed.
///
/// Used by bulk operations made of many transactions, where undoing each
/// step individually would cost as much as the copy.
pub(crate) struct Restore<'a, K, V> {
    queue: &'a mut PriorityQueue<K, V>,
    backup: Option<PriorityQueue<K, V>>,
}

impl<'a, K: Clone, V: Clone> Restore<'a, K, V> {
    pub(crate) fn new(queue: &'a mut PriorityQueue<K, V>) -> Self {
        let backup = queue.clone();
        Self {
            queue,
            backup: Some(backup),
        }
    }
}

impl<K, V> Restore<'_, K, V> {
    #[inline]
    pub(crate) fn queue(&mut self) -> &mut PriorityQueue<K, V> {
        &mut *self.queue
    }

    pub(crate) fn commit(mut self) {
        self.backup = None;
    }
}

impl<K, V> Drop for Restore<'_, K, V> {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.queue = backup;
            debug!(len = self.queue.len, "restored queue from backup");
        }
    }
}
