//! Configuration for flatindex.
//!
//! Page size is not a fixed constant: it is derived from the tree order so
//! that a full node (order keys plus their refs or children) fits in one
//! fixed-width record.
//!
//! # Page Layout
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────┬──────────────┐
//! │ Page 0       │ Page 1       │ Page 2       │ ... │ Page N       │
//! │ header       │ legend       │ initial root │     │ split nodes  │
//! └──────────────┴──────────────┴──────────────┴─────┴──────────────┘
//! ```

use crate::common::{Error, PageId, Result};

/// Fixed overhead of a node record (ids, flags and delimiters).
pub const PAGE_SIZE_BASE: usize = 37;

/// Bytes budgeted per key slot (the key plus its ref or child id).
pub const PAGE_SIZE_PER_KEY: usize = 12;

/// Smallest order for which an internal split leaves both halves non-empty.
pub const MIN_ORDER: usize = 2;

/// Page holding `nextId` and `rootId`.
pub const HEADER_PAGE_ID: PageId = PageId(0);

/// Page holding the static schema legend. Never parsed.
pub const LEGEND_PAGE_ID: PageId = PageId(1);

/// Page of the empty root leaf written when the file is initialized.
pub const INITIAL_ROOT_ID: PageId = PageId(2);

/// Size in bytes of every page for a tree of the given order.
///
/// The last byte of each page is a newline, so a record may use at most
/// `page_size(order) - 1` bytes.
#[inline]
pub const fn page_size(order: usize) -> usize {
    PAGE_SIZE_BASE + PAGE_SIZE_PER_KEY * order
}

/// Options used when opening an index file.
///
/// # Example
/// ```
/// use flatindex::IndexConfig;
///
/// let config = IndexConfig::new(3).with_durable_writes(false);
/// assert_eq!(config.order, 3);
/// assert_eq!(config.page_size(), 73);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of keys per node before it splits.
    pub order: usize,
    /// `fsync` after every page write.
    pub durable_writes: bool,
}

impl IndexConfig {
    /// Create a config with durable writes enabled.
    pub fn new(order: usize) -> Self {
        Self {
            order,
            durable_writes: true,
        }
    }

    /// Enable or disable `fsync` after each page write.
    pub fn with_durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = durable_writes;
        self
    }

    /// Page size implied by this order.
    #[inline]
    pub fn page_size(&self) -> usize {
        page_size(self.order)
    }

    /// Reject orders that cannot split into two non-empty halves.
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER {
            return Err(Error::InvalidOrder(self.order));
        }
        Ok(())
    }
}
