//! Embedding + model utilities.
//!
//! - [`clip`] provides the CLIP-backed [`FeatureExtractor`].
//! - [`video`] and [`text`] persist what the extractor produces.

/// CLIP extractor (video frames and query text).
pub mod clip;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
mod extractor;
/// Text Embedder.
pub mod text;
mod types;
/// Tokenizer loading and vector helpers.
pub mod utils;
/// Video Embedder.
pub mod video;


pub use clip::{ClipConfig, ClipExtractor, FrameSampler};
pub use device::select_device;
pub use error::EmbeddingError;
pub use extractor::FeatureExtractor;
pub use text::{TextEmbedder, validate_query};
pub use types::{TextEmbedding, VideoEmbedding};
pub use utils::l2_normalize_in_place;
pub use video::{VideoEmbedder, resolve_video};
