//! Handlers for the `/face` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use modelgen_core::error::CoreError;
use modelgen_core::types::{
    FaceGenerationRequest, JobId, JobStatus, JobStatusResponse, JobSummary, JobType,
};

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::ListQuery;
use crate::handlers::upload::{collect_form, ensure_image};
use crate::state::AppState;

/// Upper bound on reference images per submission; extras are ignored.
const MAX_REFERENCE_IMAGES: usize = 4;

/// Default page size for `GET /face/history`.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Response to a face submission: the pending job's identity.
#[derive(Debug, Serialize)]
pub struct FaceGenerationResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// History response shared by the per-type history endpoints.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub jobs: Vec<JobSummary>,
}

/// POST /api/face/generate
///
/// Submit a face generation job. Multipart fields:
/// - `prompt` (required): description of the face to generate
/// - `aspect_ratio` (optional, default `auto`)
/// - `images` (optional): up to four reference images
pub async fn generate_face(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<FaceGenerationResponse>> {
    let max_bytes = (state.config.gen.max_file_size_mb as usize) * 1024 * 1024;
    let form = collect_form(multipart, max_bytes).await?;

    let request = FaceGenerationRequest {
        prompt: form.require_text("prompt")?.to_string(),
        aspect_ratio: form.parse_or_default("aspect_ratio")?,
    };
    request.validate().map_err(AppError::Core)?;

    let mut reference_images = Vec::new();
    for file in form.file_list("images").iter().take(MAX_REFERENCE_IMAGES) {
        if file.is_empty() {
            continue;
        }
        ensure_image(file, "Reference image")?;
        reference_images.push(file.bytes.clone());
    }

    let job = state.face.generate(request, reference_images).await;

    Ok(Json(FaceGenerationResponse {
        job_id: job.id,
        status: job.status,
        message: job.message,
        created_at: job.created_at,
    }))
}

/// GET /api/face/status/{job_id}
///
/// Status of a face generation job. 400 when the id belongs to another
/// job type.
pub async fn get_face_status(
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

    if job.job_type != JobType::Face {
        return Err(AppError::BadRequest("Not a face generation job".into()));
    }

    Ok(Json(JobStatusResponse::from(&job)))
}

/// GET /api/face/history
pub async fn get_face_history(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let jobs = state.store.list(Some(JobType::Face)).await;

    Ok(Json(HistoryResponse {
        jobs: jobs.iter().take(limit).map(JobSummary::from).collect(),
    }))
}
