//! Stable handles into arena storage.
//!
//! Index nodes link to each other and to their entries through handles rather
//! than pointers. A reserved sentinel (`NONE`) marks an empty link, which keeps
//! forward-pointer arrays free of `Option` overhead.

use core::fmt::Debug;

/// A copyable handle type with a sentinel "no handle" value.
pub(crate) trait Handle: Copy + Eq + Debug {
    /// Sentinel value representing "no handle".
    ///
    /// For integer types this is `MAX`, which storage never hands out.
    const NONE: Self;

    /// Returns `true` if this is the sentinel value.
    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Returns `true` if this is not the sentinel value.
    #[inline]
    fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Converts the sentinel to `None`.
    #[inline]
    fn get(self) -> Option<Self> {
        if self.is_none() { None } else { Some(self) }
    }
}

impl Handle for usize {
    const NONE: Self = usize::MAX;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel() {
        assert!(usize::NONE.is_none());
        assert!(!usize::NONE.is_some());
        assert!(0usize.is_some());
        assert!((usize::MAX - 1).is_some());
    }

    #[test]
    fn get_maps_sentinel_to_none() {
        assert_eq!(usize::NONE.get(), None);
        assert_eq!(3usize.get(), Some(3));
    }
}
