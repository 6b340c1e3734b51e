//! Instrumented extractor and model that log every embed and infer call.
//!
//! Queries are named `q<N>`; the extractor encodes them as a one-hot vector at
//! index `N`, so the model can tell which query's embedding it received.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use candle_core::{Device, Result as CandleResult};
use parking_lot::Mutex;

use moonwalk::embedding::{EmbeddingError, FeatureExtractor, TextEmbedding, VideoEmbedding};
use moonwalk::grounding::{
    GroundingInput, GroundingModel, GroundingTensors, MockGroundingModel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Embed(usize),
    Infer(usize),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }
}

pub fn query_index(query: &str) -> usize {
    query
        .trim()
        .trim_start_matches('q')
        .parse()
        .unwrap_or_else(|_| panic!("test queries must look like q<N>, got {query:?}"))
}

fn one_hot(index: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[index % dim] = 1.0;
    v
}

pub struct RecordingExtractor {
    pub log: EventLog,
    pub dim: usize,
    pub clips: usize,
    pub embed_delay: Duration,
}

impl FeatureExtractor for RecordingExtractor {
    fn embed_video(&self, path: &Path) -> Result<VideoEmbedding, EmbeddingError> {
        if !path.is_file() {
            return Err(EmbeddingError::VideoNotFound {
                path: path.to_path_buf(),
            });
        }
        let rows = (0..self.clips).map(|i| one_hot(i, self.dim)).collect();
        VideoEmbedding::from_rows(rows)
    }

    fn embed_text(&self, text: &str) -> Result<TextEmbedding, EmbeddingError> {
        let index = query_index(text);
        self.log.push(Event::Embed(index));
        std::thread::sleep(self.embed_delay);
        TextEmbedding::new(one_hot(index, self.dim))
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn is_stub(&self) -> bool {
        true
    }
}

pub struct RecordingModel {
    pub log: EventLog,
    pub inner: MockGroundingModel,
}

impl GroundingModel for RecordingModel {
    fn forward(&self, input: &GroundingInput) -> CandleResult<GroundingTensors> {
        let text = input.text.flatten_all()?.to_vec1::<f32>()?;
        let index = text
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.log.push(Event::Infer(index));
        self.inner.forward(input)
    }

    fn device(&self) -> &Device {
        self.inner.device()
    }

    fn input_dim(&self) -> usize {
        self.inner.input_dim()
    }
}
