//! Page - one fixed-width text record of the index file.
//!
//! A [`Page`] is exactly `page_size` bytes: the record content, space
//! padding, and a single trailing newline. Fixed width is what lets the
//! [`PageStore`](crate::storage::PageStore) address pages by
//! `id × page_size` without an offset table.

use crate::common::{Error, Result};

/// Padding byte between the record content and the trailing newline.
const PAD: u8 = b' ';

/// Terminator written as the final byte of every page.
const TERMINATOR: u8 = b'\n';

/// A fixed-width page of text.
///
/// # Layout
/// ```text
/// ┌──────────────────────────────┬──────────────┬────┐
/// │ content (≤ page_size - 1)    │ ' ' padding  │ \n │
/// └──────────────────────────────┴──────────────┴────┘
/// ```
///
/// # Example
/// ```
/// use flatindex::storage::page::Page;
///
/// let page = Page::from_content("nextId:3;rootId:2", 61).unwrap();
/// assert_eq!(page.as_slice().len(), 61);
/// assert_eq!(page.content().unwrap(), "nextId:3;rootId:2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    /// Create a blank page (all padding plus terminator).
    pub fn new(page_size: usize) -> Self {
        let mut data = vec![PAD; page_size];
        if let Some(last) = data.last_mut() {
            *last = TERMINATOR;
        }
        Self { data }
    }

    /// Build a page holding `content`, padded to `page_size`.
    ///
    /// # Errors
    /// - `Error::LineTooLong` if `content` needs more than `page_size - 1` bytes
    /// - `Error::MalformedRecord` if `content` contains a newline
    pub fn from_content(content: &str, page_size: usize) -> Result<Self> {
        let max = Self::capacity(page_size);
        if content.len() > max {
            return Err(Error::LineTooLong {
                len: content.len(),
                max,
            });
        }
        if content.contains('\n') {
            return Err(Error::malformed("record content contains a newline"));
        }

        let mut page = Self::new(page_size);
        page.data[..content.len()].copy_from_slice(content.as_bytes());
        Ok(page)
    }

    /// Wrap raw bytes read from disk.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Record content with padding and terminator stripped.
    ///
    /// # Errors
    /// Returns `Error::MalformedRecord` if the page does not end with a
    /// newline (misaligned read) or is not valid UTF-8.
    pub fn content(&self) -> Result<&str> {
        match self.data.last() {
            Some(&TERMINATOR) => {}
            _ => return Err(Error::malformed("page is not newline-terminated")),
        }
        let text = std::str::from_utf8(&self.data)
            .map_err(|e| Error::malformed(format!("page is not valid UTF-8: {}", e)))?;
        Ok(text.trim_end_matches(|c| c == '\n' || c == ' '))
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Largest record that fits in a page of `page_size` bytes.
    #[inline]
    pub const fn capacity(page_size: usize) -> usize {
        page_size.saturating_sub(1)
    }
}

// ============================================================================
// TESTS
// ============================================================================
