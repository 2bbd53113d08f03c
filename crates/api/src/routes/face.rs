//! Route definitions for the `/face` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::face;
use crate::state::AppState;

/// Routes mounted at `/face`.
///
/// ```text
/// POST   /generate           -> generate_face
/// GET    /status/{job_id}    -> get_face_status
/// GET    /history            -> get_face_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(face::generate_face))
        .route("/status/{job_id}", get(face::get_face_status))
        .route("/history", get(face::get_face_history))
}
