use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
};
use tracing::{debug, info, instrument};

use crate::decoding::QueryResult;
use crate::gateway::error::GatewayError;
use crate::gateway::payload::{ExtractResponse, QueryRequest};
use crate::gateway::state::AppState;

/// Multipart field carrying the uploaded video.
pub const VIDEO_FIELD: &str = "video";

#[instrument(skip_all)]
pub async fn query_handler(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Vec<QueryResult>>, GatewayError> {
    let Json(body) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let request: QueryRequest = serde_json::from_value(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;

    debug!(raw_len = request.query.len(), "Processing query batch");

    let results = state.service.run_queries(&request.query).await?;

    info!(results = results.len(), "Query batch answered");
    Ok(Json(results))
}

#[instrument(skip_all)]
pub async fn extract_video_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, GatewayError> {
    let mut multipart = multipart.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().trim().to_string();
        if filename.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "No selected file".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

        debug!(filename = %filename, bytes = data.len(), "Video upload received");

        let status = state.service.extract_upload(data).await?;

        info!(filename = %filename, clips = status.clips, "Uploaded video extracted");
        return Ok(Json(ExtractResponse::success(&filename, &status)));
    }

    Err(GatewayError::InvalidRequest(
        "No video file provided".to_string(),
    ))
}
