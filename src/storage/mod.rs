//! Storage layer - the index file and its page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] - Fixed-width random-access page file
//! - [`page`] - Page record, header and legend formats

pub mod page;
mod page_store;

pub use page_store::PageStore;
