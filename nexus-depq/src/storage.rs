//! Arena storage with stable handles.
//!
//! Storage provides insert/remove/get where handles remain valid until the
//! slot is explicitly removed. Entries and index nodes both live in storage,
//! which lets the two orderings of a queue share a single copy of each pair.

use crate::handle::Handle;

/// Slab-like storage with stable handles.
///
/// # Requirements
///
/// Implementations must provide:
/// - **Stable handles**: a handle remains valid until explicitly removed
/// - **O(1)** insert, remove, get operations
/// - **Slot reuse**: removed slots can be reused by future inserts
/// - **Growth**: insertion never fails for lack of capacity
///
/// `slab::Slab<T>` is the provided implementation.
pub(crate) trait Storage<T> {
    /// Handle type for this storage.
    type Handle: Handle;

    /// Inserts a value, returning its stable handle.
    fn insert(&mut self, value: T) -> Self::Handle;

    /// Removes and returns the value at `handle`, if present.
    fn remove(&mut self, handle: Self::Handle) -> Option<T>;

    /// Returns a reference to the value at `handle`, if present.
    fn get(&self, handle: Self::Handle) -> Option<&T>;

    /// Returns a mutable reference to the value at `handle`, if present.
    fn get_mut(&mut self, handle: Self::Handle) -> Option<&mut T>;

    /// Returns the number of occupied slots.
    fn len(&self) -> usize;

    /// Drops every stored value.
    fn clear(&mut self);
}

impl<T> Storage<T> for slab::Slab<T> {
    type Handle = usize;

    #[inline]
    fn insert(&mut self, value: T) -> usize {
        self.insert(value)
    }

    #[inline]
    fn remove(&mut self, handle: usize) -> Option<T> {
        self.try_remove(handle)
    }

    #[inline]
    fn get(&self, handle: usize) -> Option<&T> {
        self.get(handle)
    }

    #[inline]
    fn get_mut(&mut self, handle: usize) -> Option<&mut T> {
        self.get_mut(handle)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn clear(&mut self) {
        self.clear();
    }
}
