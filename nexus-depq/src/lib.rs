//! Double-ended priority queue over (key, value) pairs.
//!
//! [`PriorityQueue`] orders pairs by value, so the smallest and largest value
//! are always one step away, while still finding pairs by key for
//! [`change_value`](PriorityQueue::change_value). Keys, values and whole
//! pairs may repeat.
//!
//! # Design
//!
//! Pairs are stored once in an arena and indexed twice:
//!
//! ```text
//! Storage (Slab)        - owns entries, provides stable handles
//! KeyIndex / ValueIndex - skip lists of handles, one per ordering
//! ```
//!
//! Equal pairs share one entry with a multiplicity count, so each index
//! holds every distinct pair exactly once and removal never has to pick
//! between indistinguishable nodes.
//!
//! # Quick Start
//!
//! ```
//! use nexus_depq::{PriorityQueue, QueueError};
//!
//! let mut queue = PriorityQueue::new();
//! queue.insert(1, 10);
//! queue.insert(2, 5);
//! queue.insert(1, 20);
//!
//! assert_eq!(queue.len(), 3);
//! assert_eq!(queue.min_key(), Ok(&2));
//! assert_eq!(queue.max_value(), Ok(&20));
//!
//! queue.delete_min();
//! assert_eq!(queue.min_value(), Ok(&10));
//!
//! assert_eq!(queue.change_value(7, 0), Err(QueueError::KeyNotFound));
//! ```
//!
//! # Failure Model
//!
//! Empty-queue accessors and unknown keys return [`QueueError`]. Everything
//! else that can go wrong comes from `K`/`V` panicking in `Ord` or `Clone`;
//! mutating operations roll back before the panic leaves the call, so a
//! caught panic observes the queue exactly as it was.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `min_*` / `max_*` | O(1) |
//! | `insert`, `delete_*`, `change_value` | O(log n) expected |
//! | `merge` | O(n + m log(n + m)) |

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod queue;

mod entry;
mod handle;
mod index;
mod order;
mod storage;
mod txn;

pub use config::QueueConfig;
pub use error::{QueueError, Result};
pub use queue::PriorityQueue;
