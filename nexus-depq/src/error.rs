//! Error types for queue operations.

/// Recoverable failures of queue operations.
///
/// Neither variant changes the queue: the operation is rejected before any
/// mutation takes place.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueError {
    /// A min/max accessor was called on an empty queue.
    #[error("invalid operation on empty queue")]
    Empty,

    /// `change_value` was given a key the queue does not hold.
    #[error("key doesn't exist in queue")]
    KeyNotFound,
}

/// Result type for queue operations.
pub type Result<T> = core::result::Result<T, QueueError>;
