//! Page Store - fixed-width random-access file of text records.
//!
//! The [`PageStore`] handles all direct file operations:
//! - Reading and writing pages by id
//! - Appending new pages at the end of the file
//! - Tracking how many pages are allocated
//!
//! It never interprets record contents; node semantics live in
//! [`crate::index::btree`].

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{info, trace};

use crate::common::config::IndexConfig;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages I/O for a single index file.
///
/// # File Layout
/// The index is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ header  │ legend  │ node    │         │ node    │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0         P        2P    ...      N×P
/// ```
///
/// Page N is located at file offset `N × page_size`, where `page_size`
/// follows from the tree order (see [`IndexConfig::page_size`]).
///
/// # Thread Safety
/// The file handle sits behind a `parking_lot::Mutex` so that read-only
/// callers can share `&PageStore`. Each read or write is one locked
/// seek + transfer; there is no multi-page atomicity.
///
/// # Durability
/// With `durable_writes` enabled every write is followed by `fsync()`.
pub struct PageStore {
    inner: Mutex<StoreFile>,
    page_size: usize,
    durable_writes: bool,
}

struct StoreFile {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

impl PageStore {
    /// Create a new, empty index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        info!(path = %path.as_ref().display(), page_size = config.page_size(), "created index file");
        Ok(Self::from_parts(file, 0, config))
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// - I/O errors if the file doesn't exist or cannot be opened
    /// - `Error::MalformedRecord` if the file length is not a whole number of
    ///   pages (typically a file written with a different order)
    pub fn open<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;

        // Calculate page count from file size
        let file_size = file.metadata()?.len();
        let page_size = config.page_size() as u64;
        if file_size % page_size != 0 {
            return Err(Error::malformed(format!(
                "file length {} is not a multiple of page size {}",
                file_size, page_size
            )));
        }
        let page_count = u32::try_from(file_size / page_size)
            .map_err(|_| Error::malformed(format!("file length {} exceeds page id range", file_size)))?;

        info!(
            path = %path.as_ref().display(),
            page_size,
            page_count,
            "opened index file"
        );
        Ok(Self::from_parts(file, page_count, config))
    }

    /// Open an existing index file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, config)
        } else {
            Self::create(path, config)
        }
    }

    fn from_parts(file: File, page_count: u32, config: &IndexConfig) -> Self {
        Self {
            inner: Mutex::new(StoreFile { file, page_count }),
            page_size: config.page_size(),
            durable_writes: config.durable_writes,
        }
    }

    /// Read a page and return its trimmed record content.
    ///
    /// # Errors
    /// - `Error::NodeNotFound` if the page lies beyond the allocated region
    /// - `Error::MalformedRecord` if the page is not a well-formed record
    pub fn read_page(&self, page_id: PageId) -> Result<String> {
        let mut inner = self.inner.lock();
        if page_id.0 >= inner.page_count {
            return Err(Error::NodeNotFound(page_id.0));
        }

        inner.file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;

        let mut buf = vec![0u8; self.page_size];
        inner.file.read_exact(&mut buf)?;
        drop(inner);

        trace!(page = page_id.0, "read page");
        let page = Page::from_bytes(buf);
        Ok(page.content()?.to_owned())
    }

    /// Write a record to a page, padding it to the fixed width.
    ///
    /// `page_id` may name an existing page (overwrite) or the next
    /// unallocated page (append).
    ///
    /// # Errors
    /// - `Error::LineTooLong` if `content` does not fit in one page
    /// - `Error::NodeNotFound` if `page_id` is past the next unallocated page
    pub fn write_page(&self, page_id: PageId, content: &str) -> Result<()> {
        let page = Page::from_content(content, self.page_size)?;

        let mut inner = self.inner.lock();
        if page_id.0 > inner.page_count {
            return Err(Error::NodeNotFound(page_id.0));
        }

        inner.file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        inner.file.write_all(page.as_slice())?;
        if self.durable_writes {
            inner.file.sync_data()?;
        }

        if page_id.0 == inner.page_count {
            inner.page_count += 1;
        }

        trace!(page = page_id.0, len = content.len(), "wrote page");
        Ok(())
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.inner.lock().page_count
    }

    /// Size of every page in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (self.page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config() -> IndexConfig {
        IndexConfig::new(3).with_durable_writes(false)
    }

    #[test]
    fn test_create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let store = PageStore::create(&path, &config()).unwrap();
        assert_eq!(store.page_count(), 0);
        assert_eq!(store.file_size(), 0);
        assert_eq!(store.page_size(), 73);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        PageStore::create(&path, &config()).unwrap();
        assert!(PageStore::create(&path, &config()).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.idx");

        assert!(matches!(
            PageStore::open(&path, &config()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_append_and_read_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        store.write_page(PageId::new(0), "hello").unwrap();
        assert_eq!(store.page_count(), 1);
        assert_eq!(store.read_page(PageId::new(0)).unwrap(), "hello");
    }

    #[test]
    fn test_overwrite_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        store.write_page(PageId::new(0), "a much longer first record").unwrap();
        store.write_page(PageId::new(0), "short").unwrap();

        assert_eq!(store.page_count(), 1);
        assert_eq!(store.read_page(PageId::new(0)).unwrap(), "short");
    }

    #[test]
    fn test_fixed_width_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        store.write_page(PageId::new(0), "zero").unwrap();
        store.write_page(PageId::new(1), "one").unwrap();
        drop(store);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 2 * 73);
        assert_eq!(&bytes[..4], b"zero");
        assert_eq!(bytes[72], b'\n');
        assert_eq!(&bytes[73..76], b"one");
        assert_eq!(bytes[145], b'\n');
        assert!(bytes[76..145].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        // Create and write
        {
            let store = PageStore::create(&path, &config()).unwrap();
            store.write_page(PageId::new(0), "persisted").unwrap();
        }

        // Reopen and verify
        {
            let store = PageStore::open(&path, &config()).unwrap();
            assert_eq!(store.page_count(), 1);
            assert_eq!(store.read_page(PageId::new(0)).unwrap(), "persisted");
        }
    }

    #[test]
    fn test_multiple_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        for i in 0..10 {
            store.write_page(PageId::new(i), &format!("page-{}", i)).unwrap();
        }

        assert_eq!(store.page_count(), 10);
        assert_eq!(store.file_size(), 10 * 73);

        for i in (0..10).rev() {
            assert_eq!(
                store.read_page(PageId::new(i)).unwrap(),
                format!("page-{}", i)
            );
        }
    }

    #[test]
    fn test_read_invalid_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();
        store.write_page(PageId::new(0), "x").unwrap();

        assert!(matches!(
            store.read_page(PageId::new(1)),
            Err(Error::NodeNotFound(1))
        ));
    }

    #[test]
    fn test_write_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        // Page 0 is the next unallocated page; page 1 is not reachable yet.
        assert!(matches!(
            store.write_page(PageId::new(1), "x"),
            Err(Error::NodeNotFound(1))
        ));
        assert_eq!(store.page_count(), 0);
    }

    #[test]
    fn test_write_too_long() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &config()).unwrap();

        let record = "9".repeat(73);
        assert!(matches!(
            store.write_page(PageId::new(0), &record),
            Err(Error::LineTooLong { len: 73, max: 72 })
        ));
        assert_eq!(store.page_count(), 0);
    }

    #[test]
    fn test_open_with_mismatched_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        {
            let store = PageStore::create(&path, &config()).unwrap();
            store.write_page(PageId::new(0), "x").unwrap();
        }

        let other = IndexConfig::new(4).with_durable_writes(false);
        assert!(matches!(
            PageStore::open(&path, &other),
            Err(Error::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_durable_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let store = PageStore::create(&path, &IndexConfig::new(3)).unwrap();

        store.write_page(PageId::new(0), "synced").unwrap();
        assert_eq!(store.read_page(PageId::new(0)).unwrap(), "synced");
    }

    #[test]
    fn test_open_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        // First call creates
        {
            let store = PageStore::open_or_create(&path, &config()).unwrap();
            assert_eq!(store.page_count(), 0);
            store.write_page(PageId::new(0), "x").unwrap();
        }

        // Second call opens existing
        {
            let store = PageStore::open_or_create(&path, &config()).unwrap();
            assert_eq!(store.page_count(), 1);
        }
    }
}
