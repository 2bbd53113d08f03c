use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Absolute storage root path.
    pub storage: String,
    /// Whether the storage root exists and is a directory.
    pub storage_healthy: bool,
}

/// GET /health -- returns service and storage health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let root = state.storage.root();
    let storage_healthy = root.is_dir();

    let status = if storage_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage: root.display().to_string(),
        storage_healthy,
    })
}

/// GET / -- service metadata and endpoint map.
async fn root_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "modelgen",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "face": "/api/face/generate",
            "video": "/api/video/generate",
            "lipsync": "/api/lipsync/generate",
            "jobs": "/api/jobs/{job_id}",
        },
    }))
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root_info))
        .route("/health", get(health_check))
}
