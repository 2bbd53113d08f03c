//! Route definitions for the `/lipsync` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::lipsync;
use crate::state::AppState;

/// Routes mounted at `/lipsync`.
///
/// ```text
/// POST   /generate           -> generate_lipsync
/// GET    /status/{job_id}    -> get_lipsync_status
/// GET    /history            -> get_lipsync_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(lipsync::generate_lipsync))
        .route("/status/{job_id}", get(lipsync::get_lipsync_status))
        .route("/history", get(lipsync::get_lipsync_history))
}
