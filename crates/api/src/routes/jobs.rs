//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// GET    /jobs               -> list_jobs
/// GET    /jobs/{job_id}      -> get_job_status   (the polling endpoint)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job_status))
}
