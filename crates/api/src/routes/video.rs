//! Route definitions for the `/video` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Routes mounted at `/video`.
///
/// ```text
/// POST   /generate           -> generate_video
/// GET    /status/{job_id}    -> get_video_status
/// GET    /history            -> get_video_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(video::generate_video))
        .route("/status/{job_id}", get(video::get_video_status))
        .route("/history", get(video::get_video_history))
}
