//! Text Embedder: one query string in, one embedding out.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::error::EmbeddingError;
use super::extractor::FeatureExtractor;
use super::types::TextEmbedding;
use crate::storage::EmbeddingStore;

/// Embeds queries, optionally mirroring the result into the "txt" slot.
///
/// The returned embedding is what inference consumes. The slot is a
/// write-only record of the last query and is never read back by the
/// query path.
#[derive(Clone)]
pub struct TextEmbedder {
    extractor: Arc<dyn FeatureExtractor>,
    store: Option<EmbeddingStore>,
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field("stub", &self.extractor.is_stub())
            .field("persist", &self.store.is_some())
            .finish()
    }
}

impl TextEmbedder {
    /// In-memory only.
    pub fn new(extractor: Arc<dyn FeatureExtractor>) -> Self {
        Self {
            extractor,
            store: None,
        }
    }

    /// Also overwrites the text slot of `store` on every call.
    pub fn with_store(mut self, store: EmbeddingStore) -> Self {
        self.store = Some(store);
        self
    }

    #[instrument(skip(self), fields(query_len = query.len()))]
    pub fn embed(&self, query: &str) -> Result<TextEmbedding, EmbeddingError> {
        let query = validate_query(query)?;
        let embedding = self.extractor.embed_text(query)?;

        if let Some(store) = &self.store {
            store.ensure_root()?;
            store.save_text(&embedding)?;
            debug!("Text slot overwritten");
        }

        Ok(embedding)
    }
}

/// Trims `query` and rejects empty or whitespace-only input.
pub fn validate_query(query: &str) -> Result<&str, EmbeddingError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(EmbeddingError::InvalidQuery {
            reason: "query must not be empty".to_string(),
        });
    }
    Ok(trimmed)
}
