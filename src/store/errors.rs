//! # Document Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a document store.
///
/// Duplicate-key conflicts on insert are not errors; they are reported as
/// [`InsertOutcome::Conflict`](super::InsertOutcome::Conflict).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store operation {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("index {name} already exists on {collection} with different options")]
    IndexConflict { collection: String, name: String },

    #[error("cursor failed: {0}")]
    Cursor(String),

    #[error("store operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// True for failures that mean the store itself is unreachable
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}
