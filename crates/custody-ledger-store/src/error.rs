//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// An idempotency key was reused for a different event.
    #[error("idempotency key {idempotency_key} already committed with hash {existing_hash}")]
    IdempotencyConflict {
        idempotency_key: String,
        existing_hash: String,
        attempted_hash: String,
    },

    /// The monotonic index cannot advance.
    #[error("monotonic index exhausted")]
    IndexExhausted,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
