//! flatindex - a disk-backed B+Tree secondary index over flat record files.
//!
//! Maps an integer key (e.g. a harvest year) to the references (row
//! positions) of every record carrying that key.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           flatindex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              B+Tree Engine (index/btree)                 │   │
//! │  │   insert · search · height · entries · check             │   │
//! │  │   descent path stack → split propagation → new root      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────┐  ┌────────────────────────────┐   │
//! │  │ Node codec              │  │ TreeHeader (page 0)        │   │
//! │  │ fixed-width text record │  │ nextId · rootId            │   │
//! │  └─────────────────────────┘  └────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     PageStore: page id = page index, 37 + 12×order bytes │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - Page file and page formats
//! - [`index`] - The B+Tree
//!
//! # Quick Start
//! ```no_run
//! use flatindex::{BPlusTree, IndexConfig};
//!
//! let mut tree = BPlusTree::open("wines.idx", IndexConfig::new(3)).unwrap();
//! tree.insert(1990, 4).unwrap();
//! tree.insert(1988, 9).unwrap();
//!
//! assert_eq!(tree.search(1990).unwrap(), vec![4]);
//! assert_eq!(tree.height().unwrap(), 0);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::IndexConfig;
pub use common::{Error, PageId, Result};

pub use index::btree::{BPlusTree, Key, Node, RecordRef, StatsSnapshot, TreeReport, TreeStats};
pub use storage::page::{Page, TreeHeader};
pub use storage::PageStore;
