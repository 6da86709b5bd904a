//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is not available in this environment (private mode, quota
    /// disabled, no window...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the storage is full.
    #[error("storage quota exceeded for key: {0}")]
    QuotaExceeded(String),

    /// Invalid key.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
