//! Core error types

use thiserror::Error;

/// Errors raised while reading or writing the lock file.
///
/// None of these reach an HTTP caller. The store logs them and keeps
/// serving from memory.
#[derive(Debug, Error)]
pub enum LockStoreError {
    /// IO error
    #[error("Lock file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock file contents could not be (de)serialized
    #[error("Lock file serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for lock file operations.
pub type LockStoreResult<T> = Result<T, LockStoreError>;
