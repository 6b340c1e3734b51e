use thiserror::Error;

use crate::storage::{Slot, StorageError};

#[derive(Debug, Error)]
/// Errors returned by the grounding engine and network.
pub enum GroundingError {
    /// A required embedding is absent or unreadable.
    #[error("missing embedding '{slot}': {reason}")]
    MissingEmbedding {
        /// Slot key (`vid` or `txt`).
        slot: &'static str,
        /// Why it could not be used.
        reason: String,
    },

    /// Embedding shapes do not match each other or the model.
    #[error("malformed embedding: {reason}")]
    MalformedEmbedding { reason: String },

    /// Forward pass failed (including accelerator memory exhaustion).
    #[error("inference failure: {reason}")]
    InferenceFailure { reason: String },

    /// Checkpoint or network config could not be loaded.
    #[error("failed to load grounding model: {reason}")]
    ModelLoadFailed { reason: String },
}

impl GroundingError {
    /// Maps a slot read failure. Absent and unreadable slots are both missing.
    pub fn from_storage(slot: Slot, err: StorageError) -> Self {
        let reason = match err {
            StorageError::NotFound { .. } => "not found".to_string(),
            StorageError::Malformed { reason, .. } => reason,
            other => other.to_string(),
        };
        GroundingError::MissingEmbedding {
            slot: slot.key(),
            reason,
        }
    }
}

impl From<candle_core::Error> for GroundingError {
    fn from(err: candle_core::Error) -> Self {
        GroundingError::InferenceFailure {
            reason: err.to_string(),
        }
    }
}
