use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing to pick from (empty or all-NaN scores).
    #[error("no {what} candidate to select")]
    NoCandidate { what: &'static str },

    #[error("model output shape mismatch: {reason}")]
    ShapeMismatch { reason: String },
}
