use std::path::PathBuf;

use thiserror::Error;

use crate::decoding::DecodeError;
use crate::embedding::EmbeddingError;
use crate::grounding::GroundingError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no non-empty query provided")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Grounding(#[from] GroundingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A batch member failed; the batch was aborted.
    #[error("query '{query}' failed: {source}")]
    QueryFailed {
        query: String,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("failed to save upload to {path}: {source}")]
    UploadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {reason}")]
    TaskFailed { reason: String },
}

impl ServiceError {
    /// Caller-side mistakes (reported as 4xx by the gateway).
    ///
    /// A failed batch member is never one: the batch was validated before it
    /// ran, so `QueryFailed` is always a server error.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::EmptyQuery | ServiceError::Embedding(EmbeddingError::InvalidQuery { .. })
        )
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::TaskFailed {
            reason: err.to_string(),
        }
    }
}
