//! Tree header page and schema legend.
//!
//! Page 0 holds the only mutable tree-wide state:
//! - `nextId` - the next page id handed out by a split
//! - `rootId` - the page id of the current root
//!
//! Both are re-read from disk on every tree operation, so the header page
//! is the single source of truth after each mutation.

use tracing::trace;

use crate::common::config::{HEADER_PAGE_ID, INITIAL_ROOT_ID};
use crate::common::{Error, PageId, Result};
use crate::storage::PageStore;

/// Static legend stored in page 1. Occupies a page slot but is never parsed.
pub const LEGEND: &str = "id;leaf;keys;parent;children;prev;next;refs";

const NEXT_ID_FIELD: &str = "nextId";
const ROOT_ID_FIELD: &str = "rootId";

/// Contents of the header page.
///
/// # Format
/// ```text
/// nextId:<int>;rootId:<int>
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    /// Next unallocated page id. Never decreases.
    pub next_id: PageId,
    /// Page id of the root node.
    pub root_id: PageId,
}

impl TreeHeader {
    /// Header of a freshly initialized file: root at page 2, next id 3.
    pub fn initial() -> Self {
        Self {
            next_id: PageId::new(INITIAL_ROOT_ID.0 + 1),
            root_id: INITIAL_ROOT_ID,
        }
    }

    /// Serialize to the header record.
    pub fn encode(&self) -> String {
        format!(
            "{}:{};{}:{}",
            NEXT_ID_FIELD, self.next_id.0, ROOT_ID_FIELD, self.root_id.0
        )
    }

    /// Parse a header record.
    ///
    /// # Errors
    /// Returns `Error::MalformedRecord` if either field is missing or the
    /// root does not lie below `nextId`.
    pub fn decode(record: &str) -> Result<Self> {
        let (next, root) = record
            .split_once(';')
            .ok_or_else(|| Error::malformed(format!("header {:?} lacks ';'", record)))?;

        let header = Self {
            next_id: parse_field(next, NEXT_ID_FIELD)?,
            root_id: parse_field(root, ROOT_ID_FIELD)?,
        };

        if header.root_id < INITIAL_ROOT_ID || header.root_id >= header.next_id {
            return Err(Error::malformed(format!(
                "header root {} outside allocated range [{}, {})",
                header.root_id.0, INITIAL_ROOT_ID.0, header.next_id.0
            )));
        }
        Ok(header)
    }

    /// Read the header page.
    pub fn load(store: &PageStore) -> Result<Self> {
        let record = store.read_page(HEADER_PAGE_ID)?;
        let header = Self::decode(&record)?;
        trace!(next_id = header.next_id.0, root_id = header.root_id.0, "loaded header");
        Ok(header)
    }

    /// Overwrite the header page.
    pub fn save(&self, store: &PageStore) -> Result<()> {
        trace!(next_id = self.next_id.0, root_id = self.root_id.0, "saving header");
        store.write_page(HEADER_PAGE_ID, &self.encode())
    }
}

fn parse_field(field: &str, name: &str) -> Result<PageId> {
    let value = field
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| Error::malformed(format!("header field {:?} is not {}", field, name)))?;

    value
        .trim()
        .parse::<u32>()
        .map(PageId::new)
        .map_err(|e| Error::malformed(format!("header field {}: {}", name, e)))
}

// ============================================================================
// TESTS
// ============================================================================
