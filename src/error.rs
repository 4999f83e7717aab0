//! Error types for the sedum search engine.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SedumError>;

/// All errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum SedumError {
    /// A document was requested that is deleted or absent from the snapshot.
    #[error("document {0} not found")]
    NotFound(u64),

    /// A second writer attempted to open a store whose lock is held.
    #[error("store is locked: {0}")]
    StoreLocked(String),

    /// The commit descriptor is unreadable or inconsistent with the segment
    /// files present. Fatal; the store must be repaired or rebuilt.
    #[error("corrupt commit: {0}")]
    CorruptCommit(String),

    /// A structured query is malformed (inverted range bounds, unknown
    /// field, empty parse input). Store state is unaffected.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A document does not conform to the declared field schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Internal index invariant failures (bad segment data, codec errors).
    #[error("index error: {0}")]
    Index(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SedumError {
    /// Create an [`SedumError::InvalidQuery`] from any message.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        SedumError::InvalidQuery(msg.into())
    }

    /// Create an [`SedumError::SchemaViolation`] from any message.
    pub fn schema(msg: impl Into<String>) -> Self {
        SedumError::SchemaViolation(msg.into())
    }

    /// Create an [`SedumError::CorruptCommit`] from any message.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        SedumError::CorruptCommit(msg.into())
    }

    /// Create an [`SedumError::Index`] from any message.
    pub fn index(msg: impl Into<String>) -> Self {
        SedumError::Index(msg.into())
    }

    /// Create an [`SedumError::StoreLocked`] from any message.
    pub fn locked(msg: impl Into<String>) -> Self {
        SedumError::StoreLocked(msg.into())
    }
}
