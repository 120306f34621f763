//! Disk-backed B+Tree index.
//!
//! - [`BPlusTree`] - insert, search, height and leaf-chain traversal
//! - [`Node`] - one node and its fixed-width record codec
//! - [`TreeStats`] - page I/O and split counters
//! - [`TreeReport`] - result of a structural [`BPlusTree::check`]
//!
//! Nodes refer to each other only by [`PageId`](crate::PageId); there are no
//! in-memory pointers between nodes.

mod check;
mod node;
mod stats;
mod tree;

pub use check::TreeReport;
pub use node::{route, Key, Node, RecordRef};
pub use stats::{StatsSnapshot, TreeStats};
pub use tree::BPlusTree;
