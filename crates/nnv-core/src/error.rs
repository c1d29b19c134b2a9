//! Error types for the HNSW index.

use thiserror::Error;

use crate::config::ConfigError;

/// Index error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Get/Remove on an absent or already-deleted id.
    #[error("Item not found: {0}")]
    NotFound(u64),

    /// Insert with an id that is already stored.
    #[error("Item already exists: {0}")]
    AlreadyExists(u64),

    /// A snapshot carries a distance tag this build does not know.
    #[error("Invalid distance kind tag: {0}")]
    InvalidDistanceKind(u8),

    /// The graph claims live vertices but has no entrypoint.
    #[error("No entrypoint")]
    NoEntrypoint,

    /// Vector length differs from the graph dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the graph.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// The search context was cancelled.
    #[error("Search cancelled")]
    Cancelled,

    /// The search context deadline passed.
    #[error("Search deadline exceeded")]
    DeadlineExceeded,

    /// Structurally inconsistent snapshot stream.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Metadata cannot be encoded or decoded.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Index configuration rejected at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors raised by a [`SearchContext`](crate::SearchContext).
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;
