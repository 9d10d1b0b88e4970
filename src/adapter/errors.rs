//! # Adapter Errors

use thiserror::Error;

use crate::document::DecodeError;
use crate::store::StoreError;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors surfaced to RPC callers
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    // Store errors
    #[error("{operation} on table {table} (hash {hash:?}): {source}")]
    Store {
        operation: &'static str,
        table: String,
        hash: String,
        #[source]
        source: StoreError,
    },

    #[error("replace after conflict matched nothing on table {table} (hash {hash:?})")]
    ReplaceMissed { table: String, hash: String },

    // Data errors
    #[error("malformed document in table {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: DecodeError,
    },

    // Request errors
    #[error("not supported")]
    NotSupported,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AdapterError {
    /// Wrap a store failure with the coordinate it happened at
    pub fn store(
        operation: &'static str,
        table: impl Into<String>,
        hash: impl Into<String>,
        source: StoreError,
    ) -> Self {
        AdapterError::Store {
            operation,
            table: table.into(),
            hash: hash.into(),
            source,
        }
    }

    /// Wrap a store failure that is not tied to a hash (table lifecycle)
    pub fn table_op(operation: &'static str, table: impl Into<String>, source: StoreError) -> Self {
        Self::store(operation, table, "", source)
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AdapterError::Store { source, .. } => match source {
                StoreError::Timeout { .. } => 504,
                _ => 502,
            },
            AdapterError::ReplaceMissed { .. } => 502,
            AdapterError::Decode { .. } => 500,
            AdapterError::NotSupported => 501,
            AdapterError::InvalidRequest(_) => 400,
        }
    }

    /// Stable machine-readable code for error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::Store { source, .. } => match source {
                StoreError::Timeout { .. } => "STORE_TIMEOUT",
                StoreError::Connection(_) => "STORE_UNAVAILABLE",
                _ => "STORE_FAILURE",
            },
            AdapterError::ReplaceMissed { .. } => "STORE_FAILURE",
            AdapterError::Decode { .. } => "DECODE_FAILURE",
            AdapterError::NotSupported => "NOT_SUPPORTED",
            AdapterError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}
