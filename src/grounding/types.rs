use candle_core::Tensor;

use super::error::GroundingError;

/// Batch-of-one model input.
#[derive(Debug, Clone)]
pub struct GroundingInput {
    /// `[1, ctx_len, dim + 2]` video features with TEF appended.
    pub video: Tensor,
    /// `[1, ctx_len]` all-ones.
    pub video_mask: Tensor,
    /// `[1, 1, dim]` query feature.
    pub text: Tensor,
    /// `[1, 1]` all-ones.
    pub text_mask: Tensor,
}

/// Raw forward-pass outputs, still on the model device.
#[derive(Debug, Clone)]
pub struct GroundingTensors {
    /// `[1, num_spans]` span confidence logits.
    pub logits: Tensor,
    /// `[1, num_spans, 2]` offsets relative to clip centers.
    pub spans: Tensor,
    /// `[1, ctx_len]` per-clip saliency.
    pub saliency: Tensor,
}

/// Host-side model output for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub logits: Vec<f32>,
    pub spans: Vec<[f32; 2]>,
    pub saliency: Vec<f32>,
}

impl ModelOutput {
    /// Copies tensors to host memory, dropping the batch axis.
    pub fn from_tensors(tensors: &GroundingTensors) -> Result<Self, GroundingError> {
        let logits = tensors.logits.squeeze(0)?.to_vec1::<f32>()?;
        let spans = tensors
            .spans
            .squeeze(0)?
            .to_vec2::<f32>()?
            .into_iter()
            .map(|pair| match pair.as_slice() {
                [start, end] => Ok([*start, *end]),
                other => Err(GroundingError::InferenceFailure {
                    reason: format!("span offsets must have 2 columns, got {}", other.len()),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let saliency = tensors.saliency.squeeze(0)?.to_vec1::<f32>()?;

        Ok(Self {
            logits,
            spans,
            saliency,
        })
    }

    /// Number of candidate spans.
    pub fn num_spans(&self) -> usize {
        self.logits.len()
    }
}
