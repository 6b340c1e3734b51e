//! Prediction Decoder: model output to a human-readable interval and highlight.
//!
//! Span windows are reconstructed as
//! `(offset + center_fraction) * ctx_len * clip_len` seconds. The interval comes
//! from the highest-logit span and the highlight from the highest-saliency clip;
//! the two are chosen independently and need not overlap.

mod error;


pub use error::DecodeError;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::grounding::{ModelOutput, TemporalFeatures};

/// Final per-query answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    /// `"HH:MM:SS - HH:MM:SS"`.
    pub interval: String,
    /// `"HH:MM:SS"`.
    pub highlight: String,
}

/// Index of the largest value. Ties go to the first index; NaN never wins.
pub fn argmax_first(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Formats seconds as a UTC wall-clock `HH:MM:SS`, truncating fractions.
///
/// Negative and non-finite input formats as `00:00:00`. Durations of a day or
/// more wrap, as a time of day does.
pub fn format_hms(seconds: f32) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as i64
    } else {
        0
    };

    DateTime::from_timestamp(whole, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// Absolute `[start, end]` windows in seconds, one per candidate span.
pub fn reconstruct_windows(
    output: &ModelOutput,
    features: &TemporalFeatures,
    clip_len: f32,
) -> Result<Vec<[f32; 2]>, DecodeError> {
    let centers = features.centers();
    if output.spans.len() != centers.len() {
        return Err(DecodeError::ShapeMismatch {
            reason: format!(
                "{} span offsets for {} clip centers",
                output.spans.len(),
                centers.len()
            ),
        });
    }

    let scale = features.ctx_len() as f32 * clip_len;
    Ok(output
        .spans
        .iter()
        .zip(centers)
        .map(|([start, end], center)| [(start + center) * scale, (end + center) * scale])
        .collect())
}

/// Decodes one query's output into a [`QueryResult`].
pub fn decode(
    query: &str,
    output: &ModelOutput,
    features: &TemporalFeatures,
    clip_len: f32,
) -> Result<QueryResult, DecodeError> {
    if output.logits.len() != output.spans.len() {
        return Err(DecodeError::ShapeMismatch {
            reason: format!(
                "{} logits for {} span offsets",
                output.logits.len(),
                output.spans.len()
            ),
        });
    }

    let windows = reconstruct_windows(output, features, clip_len)?;
    let best_span = argmax_first(&output.logits).ok_or(DecodeError::NoCandidate { what: "span" })?;
    let best_clip =
        argmax_first(&output.saliency).ok_or(DecodeError::NoCandidate { what: "saliency" })?;

    let [start, end] = windows[best_span];
    Ok(QueryResult {
        query: query.to_string(),
        interval: format!("{} - {}", format_hms(start), format_hms(end)),
        highlight: format_hms(best_clip as f32 * clip_len),
    })
}
