//! Construction parameters for [`PriorityQueue`](crate::PriorityQueue).

/// Seed used when none is configured. Level assignment only needs to be
/// well spread, not unpredictable.
pub const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Default skip list level ratio (p=0.5).
pub const DEFAULT_LEVEL_RATIO: u32 = 2;

/// Queue construction parameters.
///
/// # Example
///
/// ```
/// use nexus_depq::{PriorityQueue, QueueConfig};
///
/// let config = QueueConfig::default()
///     .with_capacity(1024)
///     .with_level_ratio(4)
///     .with_seed(7);
///
/// let mut queue: PriorityQueue<u64, u64> = PriorityQueue::with_config(config);
/// queue.insert(1, 10);
/// assert_eq!(queue.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueConfig {
    /// Number of distinct pairs to pre-allocate for. A hint, never a limit.
    pub capacity: usize,
    /// Skip list level ratio. Must be a power of 2 and >= 2; other values are
    /// rounded to the nearest valid one.
    ///
    /// - 2: Standard (p=0.5), ~2 links per node average
    /// - 4: Redis-style (p=0.25), ~1.33 links per node average
    pub level_ratio: u32,
    /// Seed for level assignment.
    pub seed: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            level_ratio: DEFAULT_LEVEL_RATIO,
            seed: DEFAULT_SEED,
        }
    }
}

impl QueueConfig {
    /// Sets the pre-allocation hint.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the skip list level ratio.
    pub fn with_level_ratio(mut self, level_ratio: u32) -> Self {
        self.level_ratio = level_ratio;
        self
    }

    /// Sets the level assignment seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
