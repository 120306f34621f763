//! Page identifier type.

use std::fmt;

/// Identifies a page in the index file.
///
/// A node's id is its physical page index: node `N` lives at byte offset
/// `N × page_size`. Ids are never reused or relocated.
///
/// # Example
/// ```
/// use flatindex::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.offset(73), 42 * 73);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel for "no page": a root's parent, or the ends of the leaf chain.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// `None` for the sentinel, `Some(self)` otherwise.
    #[inline]
    pub fn get(self) -> Option<PageId> {
        self.is_valid().then_some(self)
    }

    /// Byte offset of this page in a file of `page_size`-byte pages.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        (self.0 as u64) * (page_size as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
