use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by the embedding slot store.
pub enum StorageError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Slot has never been written.
    #[error("embedding slot '{slot}' not found")]
    NotFound {
        /// Slot key.
        slot: &'static str,
    },

    /// Slot contents do not describe a valid matrix.
    #[error("embedding slot '{slot}' is malformed: {reason}")]
    Malformed {
        /// Slot key.
        slot: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Storage root could not be created.
    #[error("storage path unavailable: {path}")]
    StorageUnavailable {
        /// Path that was unavailable.
        path: PathBuf,
    },
}

/// Convenience result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
