pub mod face;
pub mod health;
pub mod jobs;
pub mod lipsync;
pub mod settings;
pub mod video;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /face/generate              submit a face generation job (multipart)
/// /face/status/{job_id}       face job status
/// /face/history               recent face jobs
///
/// /video/generate             submit a video generation job (multipart)
/// /video/status/{job_id}      video job status
/// /video/history              recent video jobs
///
/// /lipsync/generate           submit a lip sync job (multipart)
/// /lipsync/status/{job_id}    lip sync job status
/// /lipsync/history            recent lip sync jobs
///
/// /jobs                       recent jobs across all types
/// /jobs/{job_id}              status of any job (the polling endpoint)
///
/// /settings                   dashboard settings (GET masked, POST merge)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/face", face::router())
        .nest("/video", video::router())
        .nest("/lipsync", lipsync::router())
        .merge(jobs::router())
        .nest("/settings", settings::router())
}
