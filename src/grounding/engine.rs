//! Grounding Inference Engine: embeddings in, host-side model output out.

use std::sync::Arc;

use candle_core::Tensor;
use tracing::{debug, instrument};

use super::error::GroundingError;
use super::features::{TemporalFeatures, l2_normalize_rows};
use super::model::GroundingModel;
use super::types::{GroundingInput, GroundingTensors, ModelOutput};
use crate::constants::TEF_CHANNELS;
use crate::embedding::{TextEmbedding, VideoEmbedding};
use crate::storage::{EmbeddingStore, Slot};

/// One inference: the raw output and the features needed to decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub output: ModelOutput,
    pub features: TemporalFeatures,
}

/// Runs the shared grounding model over one video/query pair at a time.
///
/// Blocking; callers serialize access (one forward pass per device at a time).
#[derive(Clone)]
pub struct GroundingEngine {
    model: Arc<dyn GroundingModel>,
    clip_len: f32,
}

impl std::fmt::Debug for GroundingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundingEngine")
            .field("input_dim", &self.model.input_dim())
            .field("device", self.model.device())
            .field("clip_len", &self.clip_len)
            .finish()
    }
}

impl GroundingEngine {
    pub fn new(model: Arc<dyn GroundingModel>, clip_len: f32) -> Self {
        Self { model, clip_len }
    }

    pub fn clip_len(&self) -> f32 {
        self.clip_len
    }

    pub fn input_dim(&self) -> usize {
        self.model.input_dim()
    }

    /// Normalizes, appends TEF, and builds batch-of-one tensors with all-ones masks.
    pub fn prepare(
        &self,
        video: &VideoEmbedding,
        text: &TextEmbedding,
    ) -> Result<(GroundingInput, TemporalFeatures), GroundingError> {
        let dim = video.dim();
        if text.dim() != dim {
            return Err(GroundingError::MalformedEmbedding {
                reason: format!("video dim {dim} does not match text dim {}", text.dim()),
            });
        }
        if dim != self.model.input_dim() {
            return Err(GroundingError::MalformedEmbedding {
                reason: format!(
                    "embedding dim {dim} does not match model input dim {}",
                    self.model.input_dim()
                ),
            });
        }

        let ctx_len = video.ctx_len();
        let features = TemporalFeatures::new(ctx_len, self.clip_len)?;

        let mut video_rows = video.as_slice().to_vec();
        l2_normalize_rows(&mut video_rows, dim);
        let augmented = features.augment(&video_rows, dim)?;

        let mut query = text.as_slice().to_vec();
        l2_normalize_rows(&mut query, dim);

        let device = self.model.device();
        let input = GroundingInput {
            video: Tensor::from_vec(augmented, (1, ctx_len, dim + TEF_CHANNELS), device)?,
            video_mask: Tensor::ones((1, ctx_len), candle_core::DType::F32, device)?,
            text: Tensor::from_vec(query, (1, 1, dim), device)?,
            text_mask: Tensor::ones((1, 1), candle_core::DType::F32, device)?,
        };

        Ok((input, features))
    }

    /// Runs one forward pass and copies the result to host memory.
    #[instrument(skip_all, fields(ctx_len = video.ctx_len()))]
    pub fn infer(
        &self,
        video: &VideoEmbedding,
        text: &TextEmbedding,
    ) -> Result<Inference, GroundingError> {
        let (input, features) = self.prepare(video, text)?;

        let tensors: GroundingTensors = self.model.forward(&input)?;
        let output = ModelOutput::from_tensors(&tensors)?;

        if output.spans.len() != output.num_spans() {
            return Err(GroundingError::InferenceFailure {
                reason: format!(
                    "{} span offsets for {} logits",
                    output.spans.len(),
                    output.num_spans()
                ),
            });
        }
        if output.saliency.len() != features.ctx_len() {
            return Err(GroundingError::InferenceFailure {
                reason: format!(
                    "{} saliency scores for {} clips",
                    output.saliency.len(),
                    features.ctx_len()
                ),
            });
        }

        debug!(spans = output.num_spans(), "Grounding forward pass complete");
        Ok(Inference { output, features })
    }

    /// Reads both slots from `store` and runs [`infer`](Self::infer).
    pub fn infer_stored(&self, store: &EmbeddingStore) -> Result<Inference, GroundingError> {
        let video = store
            .load_video()
            .map_err(|e| GroundingError::from_storage(Slot::Video, e))?;
        let text = store
            .load_text()
            .map_err(|e| GroundingError::from_storage(Slot::Text, e))?;
        self.infer(&video, &text)
    }
}
