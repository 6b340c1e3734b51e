use std::path::{Path, PathBuf};

use tokenizers::{Tokenizer, TruncationParams};

use super::error::EmbeddingError;

/// `tokenizer.json` next to the weights, or `model_path` itself if it names one.
fn tokenizer_path(model_path: &Path) -> PathBuf {
    if model_path.file_name().is_some_and(|n| n == "tokenizer.json") {
        model_path.to_path_buf()
    } else if model_path.is_dir() {
        model_path.join("tokenizer.json")
    } else {
        model_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("tokenizer.json")
    }
}

/// Loads the CLIP tokenizer, cutting queries longer than `max_len` tokens.
pub fn load_clip_tokenizer(model_path: &Path, max_len: usize) -> Result<Tokenizer, EmbeddingError> {
    let path = tokenizer_path(model_path);
    if !path.is_file() {
        return Err(EmbeddingError::ModelNotFound { path });
    }

    let mut tokenizer =
        Tokenizer::from_file(&path).map_err(|e| EmbeddingError::TokenizationFailed {
            reason: format!("failed to load {}: {e}", path.display()),
        })?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: format!("failed to configure truncation: {e}"),
        })?;

    Ok(tokenizer)
}

/// L2-normalizes `values` in place. Zero vectors are left unchanged.
pub fn l2_normalize_in_place(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        for x in values {
            *x /= norm;
        }
    }
}
