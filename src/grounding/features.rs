//! Temporal features and row normalization.

use crate::constants::TEF_CHANNELS;
use crate::embedding::l2_normalize_in_place;

use super::error::GroundingError;

/// L2-normalizes each `dim`-wide row of `data` in place.
///
/// Zero rows stay zero; every other row ends with unit norm.
pub fn l2_normalize_rows(data: &mut [f32], dim: usize) {
    if dim == 0 {
        return;
    }
    for row in data.chunks_exact_mut(dim) {
        l2_normalize_in_place(row);
    }
}

/// Per-clip position features for a video of `ctx_len` clips.
///
/// `start[i] = i / ctx_len`, `end[i] = start[i] + 1 / ctx_len`, and
/// `center[i] = (i + clip_len / 2) / ctx_len`. Centers anchor decoded spans;
/// `(start, end)` is appended to each clip as the temporal-extent feature.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalFeatures {
    ctx_len: usize,
    center: Vec<f32>,
    start: Vec<f32>,
    end: Vec<f32>,
}

impl TemporalFeatures {
    pub fn new(ctx_len: usize, clip_len: f32) -> Result<Self, GroundingError> {
        if ctx_len == 0 {
            return Err(GroundingError::MalformedEmbedding {
                reason: "video has no clips".to_string(),
            });
        }

        let n = ctx_len as f32;
        let step = 1.0 / n;

        let center = (0..ctx_len)
            .map(|i| (i as f32 + clip_len / 2.0) / n)
            .collect();
        let start: Vec<f32> = (0..ctx_len).map(|i| i as f32 / n).collect();
        let end = start.iter().map(|s| s + step).collect();

        Ok(Self {
            ctx_len,
            center,
            start,
            end,
        })
    }

    pub fn ctx_len(&self) -> usize {
        self.ctx_len
    }

    /// Center-time fraction of every clip.
    pub fn centers(&self) -> &[f32] {
        &self.center
    }

    pub fn center_fraction(&self, i: usize) -> f32 {
        self.center[i]
    }

    pub fn start_fraction(&self, i: usize) -> f32 {
        self.start[i]
    }

    pub fn end_fraction(&self, i: usize) -> f32 {
        self.end[i]
    }

    /// Returns `video` (`[ctx_len, dim]`) with `(start, end)` appended to each
    /// row, giving `[ctx_len, dim + 2]`.
    pub fn augment(&self, video: &[f32], dim: usize) -> Result<Vec<f32>, GroundingError> {
        if video.len() != self.ctx_len * dim {
            return Err(GroundingError::MalformedEmbedding {
                reason: format!(
                    "{} values do not form [{}, {dim}]",
                    video.len(),
                    self.ctx_len
                ),
            });
        }

        let mut out = Vec::with_capacity(self.ctx_len * (dim + TEF_CHANNELS));
        for (i, row) in video.chunks_exact(dim).enumerate() {
            out.extend_from_slice(row);
            out.push(self.start[i]);
            out.push(self.end[i]);
        }
        Ok(out)
    }
}
