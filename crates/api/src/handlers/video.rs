//! Handlers for the `/video` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use modelgen_core::error::CoreError;
use modelgen_core::types::{
    JobId, JobStatus, JobStatusResponse, JobSummary, JobType, VideoGenerationRequest,
};

use crate::error::{AppError, AppResult};
use crate::handlers::face::HistoryResponse;
use crate::handlers::jobs::ListQuery;
use crate::handlers::upload::{collect_form, ensure_image};
use crate::state::AppState;

/// Default page size for `GET /video/history`.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Response to a video submission: the pending job's identity.
#[derive(Debug, Serialize)]
pub struct VideoGenerationResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub provider: Option<String>,
}

/// POST /api/video/generate
///
/// Submit a video generation job. Multipart fields:
/// - `image` (required): start image
/// - `end_image` (optional): end image
/// - `mode` (optional): model-specific mode string
/// - `prompt` (optional)
/// - `aspect_ratio` (optional, `16:9` or `9:16`, default `16:9`)
pub async fn generate_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<VideoGenerationResponse>> {
    let max_bytes = (state.config.gen.max_file_size_mb as usize) * 1024 * 1024;
    let form = collect_form(multipart, max_bytes).await?;

    let image = form
        .file("image")
        .ok_or_else(|| AppError::BadRequest("Image file required".into()))?;
    ensure_image(image, "Image")?;

    // An empty optional end image is treated as absent.
    let end_image = match form.file("end_image") {
        Some(file) if !file.is_empty() => {
            ensure_image(file, "End image")?;
            Some(file.bytes.clone())
        }
        _ => None,
    };

    let request = VideoGenerationRequest {
        mode: form
            .text("mode")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from),
        prompt: form.text("prompt").unwrap_or_default().to_string(),
        aspect_ratio: form.parse_or_default("aspect_ratio")?,
    };

    let job = state
        .video
        .generate(request, image.bytes.clone(), end_image)
        .await;

    let provider = job.metadata["provider"].as_str().map(String::from);
    Ok(Json(VideoGenerationResponse {
        job_id: job.id,
        status: job.status,
        message: job.message,
        created_at: job.created_at,
        provider,
    }))
}

/// GET /api/video/status/{job_id}
pub async fn get_video_status(
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

    if job.job_type != JobType::Video {
        return Err(AppError::BadRequest("Not a video generation job".into()));
    }

    Ok(Json(JobStatusResponse::from(&job)))
}

/// GET /api/video/history
pub async fn get_video_history(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let jobs = state.store.list(Some(JobType::Video)).await;

    Ok(Json(HistoryResponse {
        jobs: jobs.iter().take(limit).map(JobSummary::from).collect(),
    }))
}
