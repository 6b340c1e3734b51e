//! The seam between the service and the perception model.

use std::path::Path;

use super::error::EmbeddingError;
use super::types::{TextEmbedding, VideoEmbedding};

/// Turns raw video files and query strings into embeddings in a shared space.
///
/// Implementations are blocking; callers on an async runtime should invoke them
/// from `spawn_blocking`.
pub trait FeatureExtractor: Send + Sync {
    /// Embeds a video as one row per `clip_len`-second clip.
    fn embed_video(&self, path: &Path) -> Result<VideoEmbedding, EmbeddingError>;

    /// Embeds a single query string.
    fn embed_text(&self, text: &str) -> Result<TextEmbedding, EmbeddingError>;

    /// Output dimension shared by video and text embeddings.
    fn embedding_dim(&self) -> usize;

    /// Returns `true` if embeddings are synthetic.
    fn is_stub(&self) -> bool {
        false
    }
}
