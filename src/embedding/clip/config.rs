use std::path::PathBuf;

use crate::config::Config;
use crate::constants::{CLIP_EMBEDDING_DIM, DEFAULT_CLIP_LEN, DEFAULT_STUB_CLIP_COUNT};
use crate::embedding::error::EmbeddingError;

#[derive(Debug, Clone)]
/// Configuration for [`ClipExtractor`](super::ClipExtractor).
pub struct ClipConfig {
    /// Directory holding `model.safetensors` and `tokenizer.json`.
    /// `None` runs in stub mode.
    pub model_path: Option<PathBuf>,
    /// ffmpeg executable.
    pub ffmpeg_path: PathBuf,
    /// Seconds per clip (frame sampling interval).
    pub clip_len: f32,
    /// Accelerator ordinal.
    pub device_index: usize,
    /// Output embedding dimension.
    pub embedding_dim: usize,
    /// Clips produced per video in stub mode.
    pub stub_clip_count: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            clip_len: DEFAULT_CLIP_LEN,
            device_index: 0,
            embedding_dim: CLIP_EMBEDDING_DIM,
            stub_clip_count: DEFAULT_STUB_CLIP_COUNT,
        }
    }
}

impl ClipConfig {
    /// Creates a config for a CLIP weights directory.
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Default::default()
        }
    }

    /// Creates a stub config (no model files; deterministic embeddings).
    pub fn stub() -> Self {
        Self::default()
    }

    /// Derives the extractor config from process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_path: config.clip_model_path.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            clip_len: config.clip_len,
            device_index: config.device_index,
            ..Default::default()
        }
    }

    pub fn with_clip_len(mut self, clip_len: f32) -> Self {
        self.clip_len = clip_len;
        self
    }

    pub fn with_stub_clip_count(mut self, count: usize) -> Self {
        self.stub_clip_count = count;
        self
    }

    /// Returns `true` if no weights are configured.
    pub fn is_stub(&self) -> bool {
        self.model_path.is_none()
    }

    /// Validates basic invariants; model files are checked on load.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if !(self.clip_len.is_finite() && self.clip_len > 0.0) {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!("clip_len must be positive, got {}", self.clip_len),
            });
        }

        if self.embedding_dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding_dim must be non-zero".to_string(),
            });
        }

        if self.is_stub() && self.stub_clip_count == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "stub_clip_count must be non-zero".to_string(),
            });
        }

        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model_path cannot be empty when provided".to_string(),
            });
        }

        Ok(())
    }
}
