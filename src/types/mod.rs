#![forbid(unsafe_code)]

//! Shared error type and result alias.

use thiserror::Error;

/// Errors surfaced by the graph store, the search engine and the handle facade.
#[derive(Error, Debug)]
pub enum DejavuError {
    /// An argument is out of range (vertex id, size, self-loop, error bound).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A handle is unknown or was deleted. Carries the handle kind.
    #[error("invalid {0} handle")]
    InvalidHandle(&'static str),
    /// The operation conflicts with the current state of the object.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// The operation is not supported for this object.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// A search was stopped through its cancellation token.
    #[error("search cancelled")]
    Cancelled,
    /// IO failure while reading or writing DIMACS files.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed DIMACS input.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// Configuration could not be loaded.
    #[error("configuration: {0}")]
    Config(String),
}

impl DejavuError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DejavuError::InvalidArgument(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DejavuError>;

/// Converts a caller-supplied signed index into a `usize` below `bound`.
pub(crate) fn checked_index(value: i64, bound: usize, what: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&v| v < bound)
        .ok_or_else(|| DejavuError::invalid(format!("{what} {value} out of range 0..{bound}")))
}
