//! Error types for the source-map engine

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine.
///
/// The four kinds below are exhaustive by design (§7): no retries
/// happen internally, and no operation partially applies before
/// returning one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The `mappings` VLQ string is syntactically invalid, or a delta
    /// application produced a negative absolute value.
    #[error("malformed mappings: {0}")]
    MalformedMappings(String),

    /// A snapshot blob is truncated, corrupt, or carries an unknown
    /// schema version.
    #[error("incompatible snapshot: {0}")]
    IncompatibleSnapshot(String),

    /// An operation was attempted on an engine after `destroy()`.
    #[error("operation attempted after destroy")]
    UseAfterDestroy,

    /// An id-form accessor was given an index outside the table's range.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds {
        /// The index that was requested.
        index: u32,
        /// The length of the table that was indexed.
        len: u32,
    },
}

impl Error {
    /// Build a [`Error::MalformedMappings`] with a formatted message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedMappings(message.into())
    }

    /// Build a [`Error::IncompatibleSnapshot`] with a formatted message.
    pub fn incompatible_snapshot(message: impl Into<String>) -> Self {
        Error::IncompatibleSnapshot(message.into())
    }

    /// Build a [`Error::OutOfBounds`] for `index` against a table of `len`.
    pub fn out_of_bounds(index: u32, len: u32) -> Self {
        Error::OutOfBounds { index, len }
    }
}
