//! B+Tree node and its fixed-width record codec.
//!
//! # Record Format
//! ```text
//! id;leafFlag;keys;parent;children;prev;next;refs
//! ```
//! - `leafFlag` is `1` for a leaf, `0` for an internal node
//! - `keys` and `refs` are comma lists, empty when there are none
//! - `children` is a comma list, or `-` when there are none
//! - `parent`, `prev` and `next` are page ids, or `-` when absent
//!
//! The `id` field is informational only: [`Node::decode`] takes the id
//! from the page the record was read from.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

const FIELD_SEP: char = ';';
const LIST_SEP: char = ',';
const EMPTY_MARKER: &str = "-";
const FIELD_COUNT: usize = 8;

/// A key in the index (e.g. a harvest year).
pub type Key = i64;

/// An opaque reference to a record in the indexed file (e.g. a row number).
pub type RecordRef = i64;

/// One B+Tree node, as stored in a single page.
///
/// Leaves use `refs`, `prev` and `next`; internal nodes use `children`.
/// Unused fields stay empty / [`PageId::INVALID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Page index of this node.
    pub id: PageId,
    pub is_leaf: bool,
    /// Ascending, duplicates allowed.
    pub keys: Vec<Key>,
    /// Bookkeeping only; splits propagate via the descent path instead.
    pub parent: PageId,
    /// Internal only: `keys.len() + 1` entries.
    pub children: Vec<PageId>,
    /// Leaf only: previous leaf in the sibling chain.
    pub prev: PageId,
    /// Leaf only: next leaf in the sibling chain.
    pub next: PageId,
    /// Leaf only: one reference per key.
    pub refs: Vec<RecordRef>,
}

impl Node {
    /// An empty leaf with no parent and no siblings.
    pub fn new_leaf(id: PageId) -> Self {
        Self {
            id,
            is_leaf: true,
            keys: Vec::new(),
            parent: PageId::INVALID,
            children: Vec::new(),
            prev: PageId::INVALID,
            next: PageId::INVALID,
            refs: Vec::new(),
        }
    }

    /// An internal node with the given separators and children.
    pub fn new_internal(id: PageId, keys: Vec<Key>, children: Vec<PageId>) -> Self {
        Self {
            id,
            is_leaf: false,
            keys,
            parent: PageId::INVALID,
            children,
            prev: PageId::INVALID,
            next: PageId::INVALID,
            refs: Vec::new(),
        }
    }

    /// Number of keys held.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the child covering `key` (internal nodes).
    #[inline]
    pub fn child_slot(&self, key: Key) -> usize {
        route(&self.keys, key)
    }

    /// Serialize to a record that fits in a page of `page_size` bytes.
    ///
    /// # Errors
    /// Returns `Error::LineTooLong` if the record exceeds `page_size - 1`
    /// bytes; with a fixed page size this bounds how many wide keys and refs
    /// one node can carry.
    pub fn encode(&self, page_size: usize) -> Result<String> {
        let mut out = String::with_capacity(page_size);
        // Writing into a String cannot fail.
        let _ = write!(out, "{}", self.id.0);
        out.push(FIELD_SEP);
        out.push(if self.is_leaf { '1' } else { '0' });
        out.push(FIELD_SEP);
        push_list(&mut out, self.keys.iter());
        out.push(FIELD_SEP);
        push_id(&mut out, self.parent);
        out.push(FIELD_SEP);
        if self.children.is_empty() {
            out.push_str(EMPTY_MARKER);
        } else {
            push_list(&mut out, self.children.iter().map(|c| c.0));
        }
        out.push(FIELD_SEP);
        push_id(&mut out, self.prev);
        out.push(FIELD_SEP);
        push_id(&mut out, self.next);
        out.push(FIELD_SEP);
        push_list(&mut out, self.refs.iter());

        let max = Page::capacity(page_size);
        if out.len() > max {
            return Err(Error::LineTooLong { len: out.len(), max });
        }
        Ok(out)
    }

    /// Parse a record read from page `id`.
    ///
    /// The id stored in the record is parsed but replaced by `id`, so the
    /// physical position of the page is authoritative.
    ///
    /// # Errors
    /// Returns `Error::MalformedRecord` on a wrong field count, an
    /// unparsable number, or a key/ref/child count mismatch.
    pub fn decode(record: &str, id: PageId) -> Result<Self> {
        let fields: Vec<&str> = record.split(FIELD_SEP).collect();
        if fields.len() != FIELD_COUNT {
            return Err(Error::malformed(format!(
                "node {} has {} fields, expected {}",
                id.0,
                fields.len(),
                FIELD_COUNT
            )));
        }

        let _stored_id: u32 = parse_num(fields[0], "id")?;
        let is_leaf = match fields[1] {
            "1" => true,
            "0" => false,
            other => {
                return Err(Error::malformed(format!(
                    "node {} has leaf flag {:?}",
                    id.0, other
                )))
            }
        };

        let children = if fields[4] == EMPTY_MARKER {
            Vec::new()
        } else {
            parse_list::<u32>(fields[4], "children")?
                .into_iter()
                .map(PageId::new)
                .collect()
        };

        let node = Self {
            id,
            is_leaf,
            keys: parse_list(fields[2], "keys")?,
            parent: parse_id(fields[3], "parent")?,
            children,
            prev: parse_id(fields[5], "prev")?,
            next: parse_id(fields[6], "next")?,
            refs: parse_list(fields[7], "refs")?,
        };
        node.check_shape()?;
        Ok(node)
    }

    fn check_shape(&self) -> Result<()> {
        if self.is_leaf {
            if self.refs.len() != self.keys.len() {
                return Err(Error::malformed(format!(
                    "leaf {} has {} keys but {} refs",
                    self.id.0,
                    self.keys.len(),
                    self.refs.len()
                )));
            }
            if !self.children.is_empty() {
                return Err(Error::malformed(format!("leaf {} has children", self.id.0)));
            }
        } else if self.children.len() != self.keys.len() + 1 {
            return Err(Error::malformed(format!(
                "internal node {} has {} keys but {} children",
                self.id.0,
                self.keys.len(),
                self.children.len()
            )));
        }
        Ok(())
    }
}

/// Shared routing rule for descent and in-node placement.
///
/// Returns the number of keys `<= key`: a key equal to a separator is routed
/// to the right of it, and a key inserted into a leaf lands after any equal
/// keys already present.
#[inline]
pub fn route(keys: &[Key], key: Key) -> usize {
    keys.partition_point(|&k| k <= key)
}

fn push_list<T: std::fmt::Display>(out: &mut String, items: impl Iterator<Item = T>) {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(LIST_SEP);
        }
        let _ = write!(out, "{}", item);
    }
}

fn push_id(out: &mut String, id: PageId) {
    match id.get() {
        Some(id) => {
            let _ = write!(out, "{}", id.0);
        }
        None => out.push_str(EMPTY_MARKER),
    }
}

fn parse_num<T: FromStr>(field: &str, name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    field
        .parse::<T>()
        .map_err(|e| Error::malformed(format!("{} {:?}: {}", name, field, e)))
}

fn parse_list<T: FromStr>(field: &str, name: &str) -> Result<Vec<T>>
where
    T::Err: std::fmt::Display,
{
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(LIST_SEP)
        .map(|item| parse_num(item, name))
        .collect()
}

fn parse_id(field: &str, name: &str) -> Result<PageId> {
    if field == EMPTY_MARKER {
        Ok(PageId::INVALID)
    } else {
        parse_num(field, name).map(PageId::new)
    }
}
