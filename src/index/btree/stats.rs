//! B+Tree I/O and split statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by a [`BPlusTree`](super::BPlusTree).
///
/// Atomic so that read-only operations (`&self`) can count page reads.
/// All updates use `Ordering::Relaxed`: the counters are independent and
/// only ever read as a point-in-time snapshot.
///
/// # Example
/// ```
/// use flatindex::TreeStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TreeStats::new();
/// stats.pages_read.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().pages_read, 1);
/// ```
#[derive(Debug)]
pub struct TreeStats {
    /// Node and header pages read from disk.
    pub pages_read: AtomicU64,

    /// Node and header pages written to disk.
    pub pages_written: AtomicU64,

    /// Leaf nodes split.
    pub leaf_splits: AtomicU64,

    /// Internal nodes split.
    pub internal_splits: AtomicU64,

    /// Splits that created a new root (tree height grew by one).
    pub root_splits: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            leaf_splits: AtomicU64::new(0),
            internal_splits: AtomicU64::new(0),
            root_splits: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            leaf_splits: self.leaf_splits.load(Ordering::Relaxed),
            internal_splits: self.internal_splits.load(Ordering::Relaxed),
            root_splits: self.root_splits.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.pages_read.store(0, Ordering::Relaxed);
        self.pages_written.store(0, Ordering::Relaxed);
        self.leaf_splits.store(0, Ordering::Relaxed);
        self.internal_splits.store(0, Ordering::Relaxed);
        self.root_splits.store(0, Ordering::Relaxed);
    }
}

impl Default for TreeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`TreeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub pages_read: u64,
    pub pages_written: u64,
    pub leaf_splits: u64,
    pub internal_splits: u64,
    pub root_splits: u64,
}

impl StatsSnapshot {
    /// Total number of node splits of either kind.
    pub fn splits(&self) -> u64 {
        self.leaf_splits + self.internal_splits
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ reads: {}, writes: {}, leaf_splits: {}, internal_splits: {}, root_splits: {} }}",
            self.pages_read,
            self.pages_written,
            self.leaf_splits,
            self.internal_splits,
            self.root_splits
        )
    }
}
