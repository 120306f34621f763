//! Common types and utilities shared across flatindex.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (order, page size, reserved page ids)
//! - Error types
//! - Page identifiers

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result};
pub use page_id::PageId;
