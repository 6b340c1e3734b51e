//! CLIP ViT-B/32 feature extractor (safetensors + tokenizer).
//!
//! Use [`ClipConfig::stub`] for tests and model-less runs.

/// CLIP extractor configuration.
pub mod config;
/// ffmpeg frame sampling.
pub mod frames;


pub use config::ClipConfig;
pub use frames::{FrameSampler, split_frames};

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig as ClipModelConfig, ClipModel};
use tracing::{debug, info, warn};

use crate::constants::{
    CLIP_FRAME_BATCH, CLIP_IMAGE_SIZE, CLIP_MAX_SEQ_LEN, CLIP_PIXEL_MEAN, CLIP_PIXEL_STD,
};
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::extractor::FeatureExtractor;
use crate::embedding::types::{TextEmbedding, VideoEmbedding};
use crate::embedding::utils::{l2_normalize_in_place, load_clip_tokenizer};

enum ExtractorBackend {
    Model {
        model: ClipModel,
        tokenizer: tokenizers::Tokenizer,
        sampler: FrameSampler,
        device: Device,
    },
    Stub,
}

/// Video/text embedder in CLIP space (supports stub mode).
pub struct ClipExtractor {
    backend: ExtractorBackend,
    config: ClipConfig,
}

impl std::fmt::Debug for ClipExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipExtractor")
            .field(
                "backend",
                &match &self.backend {
                    ExtractorBackend::Model { device, .. } => format!("Model({:?})", device),
                    ExtractorBackend::Stub => "Stub".to_string(),
                },
            )
            .field("embedding_dim", &self.config.embedding_dim)
            .field("clip_len", &self.config.clip_len)
            .finish()
    }
}

impl ClipExtractor {
    /// Loads the extractor from a config (stub mode is supported).
    pub fn load(config: ClipConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let Some(model_dir) = config.model_path.clone() else {
            warn!("CLIP extractor running in STUB mode (synthetic embeddings)");
            return Ok(Self {
                backend: ExtractorBackend::Stub,
                config,
            });
        };

        let device = select_device(config.device_index)?;
        debug!(?device, "Selected compute device for CLIP");

        let (model, tokenizer) = Self::load_model(&model_dir, &device)?;
        let sampler = FrameSampler::new(config.ffmpeg_path.clone(), config.clip_len);

        info!(
            model_path = %model_dir.display(),
            embedding_dim = config.embedding_dim,
            clip_len = config.clip_len,
            "CLIP model loaded successfully"
        );

        Ok(Self {
            backend: ExtractorBackend::Model {
                model,
                tokenizer,
                sampler,
                device,
            },
            config,
        })
    }

    /// Stub extractor with default settings.
    pub fn stub() -> Result<Self, EmbeddingError> {
        Self::load(ClipConfig::stub())
    }

    fn load_model(
        model_dir: &Path,
        device: &Device,
    ) -> Result<(ClipModel, tokenizers::Tokenizer), EmbeddingError> {
        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.is_file() {
            return Err(EmbeddingError::ModelNotFound { path: weights_path });
        }

        let tokenizer = load_clip_tokenizer(model_dir, CLIP_MAX_SEQ_LEN)?;

        let model_config = ClipModelConfig::vit_base_patch32();

        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device) }
                .map_err(|e| EmbeddingError::ModelLoadFailed {
                    reason: format!("Failed to map CLIP weights: {}", e),
                })?;

        let model =
            ClipModel::new(vb, &model_config).map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to build CLIP model: {}", e),
            })?;

        Ok((model, tokenizer))
    }

    fn text_with_model(
        &self,
        text: &str,
        model: &ClipModel,
        tokenizer: &tokenizers::Tokenizer,
        device: &Device,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let encoding =
            tokenizer
                .encode(text, true)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let tokens = encoding.get_ids();
        if tokens.is_empty() {
            return Err(EmbeddingError::TokenizationFailed {
                reason: "query produced no tokens".to_string(),
            });
        }

        debug!(token_count = tokens.len(), "Encoding query with CLIP text tower");

        let input_ids = Tensor::new(tokens, device)?.unsqueeze(0)?;
        let features = model.get_text_features(&input_ids)?;
        let mut embedding = features.squeeze(0)?.to_vec1::<f32>()?;

        l2_normalize_in_place(&mut embedding);
        Ok(embedding)
    }

    fn video_with_model(
        &self,
        path: &Path,
        model: &ClipModel,
        sampler: &FrameSampler,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let raw = sampler.sample(path)?;
        let frames = split_frames(&raw);
        if frames.is_empty() {
            return Err(EmbeddingError::EmptyVideo {
                path: path.to_path_buf(),
            });
        }

        debug!(frames = frames.len(), "Encoding frames with CLIP vision tower");

        let mut rows = Vec::with_capacity(frames.len());
        for batch in frames.chunks(CLIP_FRAME_BATCH) {
            let pixels = frames_to_tensor(batch, device)?;
            let features = model.get_image_features(&pixels)?;
            for mut row in features.to_vec2::<f32>()? {
                l2_normalize_in_place(&mut row);
                rows.push(row);
            }
        }

        Ok(rows)
    }

    fn stub_vector(&self, seed: &[u8]) -> Vec<f32> {
        let hash = blake3::hash(seed);
        let mut state = u64::from_le_bytes(
            hash.as_bytes()[..8]
                .try_into()
                .unwrap_or([0u8; 8]),
        );

        let mut embedding = Vec::with_capacity(self.config.embedding_dim);
        for _ in 0..self.config.embedding_dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        l2_normalize_in_place(&mut embedding);
        embedding
    }

    fn video_stub(&self, path: &Path) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let contents = std::fs::read(path).map_err(|_| EmbeddingError::VideoNotFound {
            path: path.to_path_buf(),
        })?;
        let fingerprint = blake3::hash(&contents);

        debug!(
            clips = self.config.stub_clip_count,
            fingerprint = %fingerprint,
            "Generating stub video embedding"
        );

        Ok((0..self.config.stub_clip_count)
            .map(|i| {
                let mut seed = fingerprint.as_bytes().to_vec();
                seed.extend_from_slice(&(i as u64).to_le_bytes());
                self.stub_vector(&seed)
            })
            .collect())
    }

    /// Returns the extractor configuration.
    pub fn config(&self) -> &ClipConfig {
        &self.config
    }
}

impl FeatureExtractor for ClipExtractor {
    fn embed_video(&self, path: &Path) -> Result<VideoEmbedding, EmbeddingError> {
        let rows = match &self.backend {
            ExtractorBackend::Model {
                model,
                sampler,
                device,
                ..
            } => self.video_with_model(path, model, sampler, device)?,
            ExtractorBackend::Stub => self.video_stub(path)?,
        };
        VideoEmbedding::from_rows(rows)
    }

    fn embed_text(&self, text: &str) -> Result<TextEmbedding, EmbeddingError> {
        let embedding = match &self.backend {
            ExtractorBackend::Model {
                model,
                tokenizer,
                device,
                ..
            } => self.text_with_model(text, model, tokenizer, device)?,
            ExtractorBackend::Stub => {
                debug!(text_len = text.len(), "Generating stub text embedding");
                self.stub_vector(text.as_bytes())
            }
        };
        TextEmbedding::new(embedding)
    }

    fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn is_stub(&self) -> bool {
        matches!(self.backend, ExtractorBackend::Stub)
    }
}

/// Converts RGB24 frames into a normalized `[n, 3, H, W]` pixel tensor.
pub fn frames_to_tensor(frames: &[&[u8]], device: &Device) -> Result<Tensor, EmbeddingError> {
    let mut flat = Vec::with_capacity(frames.iter().map(|f| f.len()).sum());
    for frame in frames {
        flat.extend_from_slice(frame);
    }

    let pixels = Tensor::from_vec(
        flat,
        (frames.len(), CLIP_IMAGE_SIZE, CLIP_IMAGE_SIZE, 3),
        device,
    )?
    .permute((0, 3, 1, 2))?
    .to_dtype(DType::F32)?;
    let pixels = (pixels / 255.0)?;

    let mean = Tensor::new(&CLIP_PIXEL_MEAN, device)?.reshape((1, 3, 1, 1))?;
    let std = Tensor::new(&CLIP_PIXEL_STD, device)?.reshape((1, 3, 1, 1))?;

    Ok(pixels.broadcast_sub(&mean)?.broadcast_div(&std)?)
}
