//! Error types for flatindex.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index.
///
/// Every variant is fatal to the call that produced it. The engine performs
/// no retries, so a failure in the middle of a split may leave the file
/// partially updated.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying index file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page lies outside the allocated region of the file.
    #[error("Node {0} not found")]
    NodeNotFound(u32),

    /// An encoded record does not fit in a fixed-width page.
    ///
    /// This is a capacity-planning error: the order is too large for the
    /// numbers being stored, or one leaf accumulated too many wide refs.
    #[error("Record of {len} bytes exceeds page capacity of {max} bytes")]
    LineTooLong { len: usize, max: usize },

    /// A page could not be decoded (bad delimiters, numbers or shape).
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The configured order cannot produce two non-empty halves on split.
    #[error("Invalid order {0}: must be at least {min}", min = crate::common::config::MIN_ORDER)]
    InvalidOrder(usize),

    /// A structural invariant does not hold on disk.
    #[error("Corruption detected: {0}")]
    Corruption(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedRecord(msg.into())
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }
}
