//! HTTP gateway (Axum) for video extraction and moment queries.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::{extract_video_handler, query_handler};
pub use state::AppState;

use crate::service::VideoStatus;

pub fn create_router_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/ready", get(ready_handler))
        .route("/api/query", post(query_handler))
        .route("/api/extract-video", post(extract_video_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub video: &'static str,
    pub video_info: Option<VideoStatus>,
    pub extractor_mode: &'static str,
    pub checkpoint: Option<String>,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let video_info = state.service.video_status().await;
    let is_ready = video_info.is_some();

    let components = ComponentStatus {
        http: "ready",
        video: if is_ready { "ready" } else { "pending" },
        video_info,
        extractor_mode: if state.service.extractor_is_stub() {
            "stub"
        } else {
            "real"
        },
        checkpoint: state
            .service
            .settings()
            .checkpoint
            .as_ref()
            .map(|p| p.display().to_string()),
    };

    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if is_ready { "ok" } else { "pending" };

    (status_code, Json(ReadyResponse { status, components })).into_response()
}
