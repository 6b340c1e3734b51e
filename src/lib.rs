//! Moonwalk library crate (used by the server binary and integration tests).
//!
//! Text-to-video moment retrieval: a video is embedded once as per-clip CLIP
//! features, then each natural-language query is grounded against it to
//! produce a top-1 time interval and a top-1 highlight timestamp.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`], [`SelectionPolicy`] - Process configuration
//! - [`MomentService`] - Owns the models, the current video, and the inference lock
//! - [`QueryResult`] - Externally visible per-query answer
//!
//! ## Pipeline
//! - [`VideoEmbedder`], [`TextEmbedder`] - Embedding with persistence
//! - [`GroundingEngine`], [`TemporalFeatures`] - Grounding inference
//! - [`decode`] - Prediction decoding
//!
//! ## Models
//! - [`FeatureExtractor`], [`ClipExtractor`] - Video/text feature extraction
//! - [`GroundingModel`], [`GroundingNet`] - Grounding network
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod decoding;
pub mod embedding;
pub mod gateway;
pub mod grounding;
pub mod service;
pub mod storage;

pub use config::{Config, ConfigError, SelectionPolicy};
pub use decoding::{DecodeError, QueryResult, decode};
pub use embedding::{
    ClipConfig, ClipExtractor, EmbeddingError, FeatureExtractor, TextEmbedder, TextEmbedding,
    VideoEmbedder, VideoEmbedding,
};
#[cfg(any(test, feature = "mock"))]
pub use grounding::MockGroundingModel;
pub use grounding::{
    GroundingEngine, GroundingError, GroundingModel, GroundingNet, GroundingNetConfig,
    ModelOutput, TemporalFeatures,
};
pub use service::{MomentService, ServiceError, ServiceSettings, VideoStatus};
pub use storage::{EmbeddingStore, Slot, StorageError};
