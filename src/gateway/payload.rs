use serde::{Deserialize, Serialize};

use crate::service::VideoStatus;

/// Body of `POST /api/query`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QueryRequest {
    /// One or more queries separated by `;`.
    pub query: String,
}

/// Body returned by a successful `POST /api/extract-video`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractResponse {
    pub status: String,
    pub message: String,
}

impl ExtractResponse {
    pub fn success(filename: &str, video: &VideoStatus) -> Self {
        Self {
            status: "success".to_string(),
            message: format!(
                "Video '{}' processed: {} clips ({:.0}s)",
                filename, video.clips, video.duration_secs
            ),
        }
    }
}
