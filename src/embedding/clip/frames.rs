//! Frame sampling through an external `ffmpeg` process.
//!
//! One RGB24 frame is taken per clip, resized to cover the CLIP input square
//! and center-cropped, then streamed raw over stdout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::constants::{CLIP_FRAME_BYTES, CLIP_IMAGE_SIZE};
use crate::embedding::error::EmbeddingError;

#[derive(Debug, Clone)]
/// Samples one frame every `clip_len` seconds.
pub struct FrameSampler {
    ffmpeg: PathBuf,
    clip_len: f32,
}

impl FrameSampler {
    pub fn new<P: Into<PathBuf>>(ffmpeg: P, clip_len: f32) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            clip_len,
        }
    }

    /// The `-vf` filter chain.
    pub fn filter_chain(&self) -> String {
        format!(
            "fps=1/{clip},scale={s}:{s}:force_original_aspect_ratio=increase,crop={s}:{s}",
            clip = self.clip_len,
            s = CLIP_IMAGE_SIZE
        )
    }

    /// Full ffmpeg argument list for `input`.
    pub fn ffmpeg_args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-nostdin", "-v", "error", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_os_string());
        args.extend(
            [
                "-vf".to_string(),
                self.filter_chain(),
                "-f".to_string(),
                "rawvideo".to_string(),
                "-pix_fmt".to_string(),
                "rgb24".to_string(),
                "pipe:1".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }

    /// Runs ffmpeg and returns the raw RGB24 stream.
    pub fn sample(&self, input: &Path) -> Result<Vec<u8>, EmbeddingError> {
        if !input.is_file() {
            return Err(EmbeddingError::VideoNotFound {
                path: input.to_path_buf(),
            });
        }

        debug!(
            input = %input.display(),
            filter = %self.filter_chain(),
            "Sampling frames with ffmpeg"
        );

        let output = Command::new(&self.ffmpeg)
            .args(self.ffmpeg_args(input))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| EmbeddingError::FrameSamplingFailed {
                reason: format!("failed to spawn {}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EmbeddingError::FrameSamplingFailed {
                reason: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}

/// Splits a raw RGB24 stream into whole frames. A trailing partial frame is dropped.
pub fn split_frames(raw: &[u8]) -> Vec<&[u8]> {
    let chunks = raw.chunks_exact(CLIP_FRAME_BYTES);
    let remainder = chunks.remainder().len();
    if remainder != 0 {
        warn!(remainder, "Dropping truncated trailing frame");
    }
    chunks.collect()
}
