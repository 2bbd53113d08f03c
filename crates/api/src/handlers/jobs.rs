//! Handlers for the `/jobs` resource.
//!
//! `GET /jobs/{job_id}` is the endpoint the polling client hits every
//! tick; it serves the full job record for any job type.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use modelgen_core::error::CoreError;
use modelgen_core::types::{JobId, JobStatusResponse, JobSummary};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Default page size for `GET /jobs`.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Query parameters for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Listing response for `GET /jobs`.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub total: usize,
    pub jobs: Vec<JobSummary>,
}

/// GET /api/jobs/{job_id}
///
/// Status of any job by ID. 404 when the job does not exist.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<JobStatusResponse>> {
    let job = state
        .store
        .get(&job_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    Ok(Json(JobStatusResponse::from(&job)))
}

/// GET /api/jobs
///
/// Recent jobs across all types, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<JobListResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let jobs = state.store.list(None).await;

    Ok(Json(JobListResponse {
        total: jobs.len(),
        jobs: jobs.iter().take(limit).map(JobSummary::from).collect(),
    }))
}
