use std::time::Duration;

use candle_core::{Device, Result, Tensor};
use parking_lot::Mutex;

use super::model::GroundingModel;
use super::types::{GroundingInput, GroundingTensors};

/// Similarity-based stand-in for the trained network (tests and demos).
///
/// Every clip is a candidate span covering exactly that clip; logits and
/// saliency are the dot product of the clip row and the query. Each call
/// records the query vector it saw.
pub struct MockGroundingModel {
    input_dim: usize,
    delay: Option<Duration>,
    fail: bool,
    device: Device,
    seen: Mutex<Vec<Vec<f32>>>,
}

impl MockGroundingModel {
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            delay: None,
            fail: false,
            device: Device::Cpu,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps inside every forward pass.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails every forward pass.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Query vectors seen so far, in call order.
    pub fn seen_queries(&self) -> Vec<Vec<f32>> {
        self.seen.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl std::fmt::Debug for MockGroundingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGroundingModel")
            .field("input_dim", &self.input_dim)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl GroundingModel for MockGroundingModel {
    fn forward(&self, input: &GroundingInput) -> Result<GroundingTensors> {
        let text = input.text.flatten_all()?.to_vec1::<f32>()?;
        self.seen.lock().push(text.clone());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            candle_core::bail!("mock grounding model failure");
        }

        let video = input.video.squeeze(0)?.to_vec2::<f32>()?;
        let ctx_len = video.len();
        let half = 0.5 / ctx_len as f32;

        let scores: Vec<f32> = video
            .iter()
            .map(|row| row.iter().zip(&text).map(|(a, b)| a * b).sum())
            .collect();
        let spans: Vec<f32> = (0..ctx_len).flat_map(|_| [-half, half]).collect();

        Ok(GroundingTensors {
            logits: Tensor::from_vec(scores.clone(), (1, ctx_len), &self.device)?,
            spans: Tensor::from_vec(spans, (1, ctx_len, 2), &self.device)?,
            saliency: Tensor::from_vec(scores, (1, ctx_len), &self.device)?,
        })
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }
}
