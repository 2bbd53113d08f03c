//! Handlers for the `/lipsync` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use modelgen_core::error::CoreError;
use modelgen_core::types::{
    JobId, JobStatus, JobStatusResponse, JobSummary, JobType, LipSyncRequest,
};

use crate::error::{AppError, AppResult};
use crate::handlers::face::HistoryResponse;
use crate::handlers::jobs::ListQuery;
use crate::handlers::upload::{collect_form, ensure_video};
use crate::state::AppState;

/// Default page size for `GET /lipsync/history`.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Response to a lip sync submission: the pending job's identity.
#[derive(Debug, Serialize)]
pub struct LipSyncResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// POST /api/lipsync/generate
///
/// Submit a lip sync job. Multipart fields:
/// - `video` (required): source video
/// - `text` (required): script to speak
/// - `voice_type` (optional, default `female_young`)
/// - `language` (optional, default `en`)
pub async fn generate_lipsync(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<LipSyncResponse>> {
    let max_bytes = (state.config.gen.max_file_size_mb as usize) * 1024 * 1024;
    let form = collect_form(multipart, max_bytes).await?;

    let video = form
        .file("video")
        .ok_or_else(|| AppError::BadRequest("Video file required".into()))?;
    ensure_video(video, "Video")?;

    let request = LipSyncRequest {
        text: form.require_text("text")?.to_string(),
        voice_type: form.parse_or_default("voice_type")?,
        language: form
            .text("language")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("en")
            .to_string(),
    };
    request.validate().map_err(AppError::Core)?;

    let job = state.lipsync.generate(request, video.bytes.clone()).await;

    Ok(Json(LipSyncResponse {
        job_id: job.id,
        status: job.status,
        message: job.message,
        created_at: job.created_at,
    }))
}

/// GET /api/lipsync/status/{job_id}
pub async fn get_lipsync_status(
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

    if job.job_type != JobType::Lipsync {
        return Err(AppError::BadRequest("Not a lip sync job".into()));
    }

    Ok(Json(JobStatusResponse::from(&job)))
}

/// GET /api/lipsync/history
pub async fn get_lipsync_history(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let jobs = state.store.list(Some(JobType::Lipsync)).await;

    Ok(Json(HistoryResponse {
        jobs: jobs.iter().take(limit).map(JobSummary::from).collect(),
    }))
}
