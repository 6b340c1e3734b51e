//! Video Embedder: one video file in, the "vid" slot overwritten.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::error::EmbeddingError;
use super::extractor::FeatureExtractor;
use super::types::VideoEmbedding;
use crate::config::{SelectionPolicy, list_candidates, select_file};
use crate::storage::EmbeddingStore;

/// Embeds videos and persists the result as the current video.
#[derive(Clone)]
pub struct VideoEmbedder {
    extractor: Arc<dyn FeatureExtractor>,
    store: EmbeddingStore,
}

impl std::fmt::Debug for VideoEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEmbedder")
            .field("stub", &self.extractor.is_stub())
            .field("store", &self.store.root())
            .finish()
    }
}

impl VideoEmbedder {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, store: EmbeddingStore) -> Self {
        Self { extractor, store }
    }

    /// Embeds `path` and fully overwrites the video slot.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn embed_file(&self, path: &Path) -> Result<VideoEmbedding, EmbeddingError> {
        let video = self.extractor.embed_video(path)?;

        self.store.ensure_root()?;
        let slot = self.store.save_video(&video)?;

        info!(
            clips = video.ctx_len(),
            dim = video.dim(),
            slot = %slot.display(),
            "Video embedding persisted"
        );
        Ok(video)
    }

    /// Embeds the video selected from `dir`.
    pub fn embed_from_dir(
        &self,
        dir: &Path,
        extensions: &[String],
        policy: SelectionPolicy,
    ) -> Result<(PathBuf, VideoEmbedding), EmbeddingError> {
        let path = resolve_video(dir, extensions, policy)?;
        let video = self.embed_file(&path)?;
        Ok((path, video))
    }
}

/// Picks exactly one video from `dir`. Several matches are not an error: the
/// policy decides and a warning is logged.
pub fn resolve_video(
    dir: &Path,
    extensions: &[String],
    policy: SelectionPolicy,
) -> Result<PathBuf, EmbeddingError> {
    let candidates = list_candidates(dir, extensions).map_err(|e| EmbeddingError::ScanFailed {
        dir: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let selection = select_file(candidates, policy).ok_or_else(|| EmbeddingError::NoVideoFound {
        dir: dir.to_path_buf(),
    })?;

    if selection.is_ambiguous() {
        warn!(
            dir = %dir.display(),
            candidates = selection.candidates,
            chosen = %selection.path.display(),
            %policy,
            "Multiple videos found; using one"
        );
    }

    Ok(selection.path)
}
