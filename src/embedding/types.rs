//! Embedding value types shared by extraction, storage, and grounding.

use super::error::EmbeddingError;

/// Per-clip video embeddings, row-major `[ctx_len, dim]`.
///
/// One row per `clip_len`-second clip. Rows are expected to be L2-normalized
/// but the grounding engine normalizes again before inference.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEmbedding {
    ctx_len: usize,
    dim: usize,
    data: Vec<f32>,
}

impl VideoEmbedding {
    /// Builds an embedding from flat row-major data.
    pub fn new(ctx_len: usize, dim: usize, data: Vec<f32>) -> Result<Self, EmbeddingError> {
        if ctx_len == 0 || dim == 0 {
            return Err(EmbeddingError::InvalidShape {
                reason: format!("video embedding must be non-empty, got [{ctx_len}, {dim}]"),
            });
        }
        if data.len() != ctx_len * dim {
            return Err(EmbeddingError::InvalidShape {
                reason: format!(
                    "expected {} values for [{ctx_len}, {dim}], got {}",
                    ctx_len * dim,
                    data.len()
                ),
            });
        }
        Ok(Self { ctx_len, dim, data })
    }

    /// Builds an embedding from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        let ctx_len = rows.len();
        let dim = rows.first().map(Vec::len).unwrap_or(0);

        if let Some(bad) = rows.iter().position(|r| r.len() != dim) {
            return Err(EmbeddingError::InvalidShape {
                reason: format!(
                    "row {bad} has {} values, expected {dim}",
                    rows[bad].len()
                ),
            });
        }

        Self::new(ctx_len, dim, rows.into_iter().flatten().collect())
    }

    /// Number of clips.
    pub fn ctx_len(&self) -> usize {
        self.ctx_len
    }

    /// Feature dimension per clip.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row `i` (panics if out of range).
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterates rows in clip order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }

    /// Flat row-major view.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Video duration covered by the clips.
    pub fn duration_secs(&self, clip_len: f32) -> f32 {
        self.ctx_len as f32 * clip_len
    }
}

/// A single query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEmbedding {
    data: Vec<f32>,
}

impl TextEmbedding {
    /// Wraps a non-empty vector.
    pub fn new(data: Vec<f32>) -> Result<Self, EmbeddingError> {
        if data.is_empty() {
            return Err(EmbeddingError::InvalidShape {
                reason: "text embedding must be non-empty".to_string(),
            });
        }
        Ok(Self { data })
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// Vector view.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
