//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - One fixed-width, newline-terminated text record
//! - [`TreeHeader`] - The metadata record stored in page 0
//! - [`LEGEND`] - The static schema legend stored in page 1

#[allow(clippy::module_inception)]
mod page;
mod tree_header;

pub use page::Page;
pub use tree_header::{TreeHeader, LEGEND};
