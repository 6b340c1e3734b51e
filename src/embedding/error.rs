use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model not found at path: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load embedding model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("embedding inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid model configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("invalid embedding shape: {reason}")]
    InvalidShape { reason: String },

    #[error("no video found in {dir}")]
    NoVideoFound { dir: PathBuf },

    #[error("failed to scan {dir} for videos: {reason}")]
    ScanFailed { dir: PathBuf, reason: String },

    #[error("video file not found: {path}")]
    VideoNotFound { path: PathBuf },

    #[error("frame sampling failed: {reason}")]
    FrameSamplingFailed { reason: String },

    #[error("no frames could be sampled from {path}")]
    EmptyVideo { path: PathBuf },

    #[error("failed to persist embedding: {0}")]
    Storage(#[from] StorageError),
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EmbeddingError {
    fn from(err: std::io::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}
