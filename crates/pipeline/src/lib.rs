//! Background generation services.
//!
//! Each service creates a pending [`Job`](modelgen_core::types::Job),
//! spawns a task that drives the remote provider, and streams progress
//! into the [`JobStore`](modelgen_core::store::JobStore). The spawned
//! task is the job's only writer; any error it surfaces is converted
//! into a terminal `failed` update so no job is ever left dangling.

use std::future::Future;
use std::sync::Arc;

use modelgen_core::config::GenConfig;
use modelgen_core::error::CoreError;
use modelgen_core::settings::SettingsStore;
use modelgen_core::storage::StorageLayout;
use modelgen_core::store::{JobStore, JobUpdate};
use modelgen_core::types::{JobId, JobStatus};

pub mod face;
pub mod lipsync;
pub mod video;

pub use face::FaceService;
pub use lipsync::LipSyncService;
pub use video::VideoService;

/// Everything a generation task needs, shared by cheap clone.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<JobStore>,
    pub settings: Arc<SettingsStore>,
    pub storage: StorageLayout,
    pub config: Arc<GenConfig>,
    /// Shared HTTP client for result downloads.
    pub http: reqwest::Client,
}

/// Errors surfaced by generation tasks.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Replicate(#[from] modelgen_providers::replicate::ReplicateError),

    #[error(transparent)]
    ElevenLabs(#[from] modelgen_providers::elevenlabs::ElevenLabsError),

    #[error(transparent)]
    SyncLabs(#[from] modelgen_providers::synclabs::SyncLabsError),

    #[error(transparent)]
    DId(#[from] modelgen_providers::did::DIdError),

    #[error(transparent)]
    Download(#[from] modelgen_providers::download::DownloadError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// The required model id is configured neither in the environment nor
    /// in the settings store.
    #[error("{0}")]
    ModelNotConfigured(String),

    /// The provider finished without a usable output.
    #[error("{0}")]
    MissingOutput(String),
}


/// Spawn a generation task for `job_id`.
///
/// If the task errors, the job is marked `failed` with `failure_message`
/// as its status line and the error text as the cause.
pub(crate) fn spawn_job<F>(
    ctx: PipelineContext,
    job_id: JobId,
    failure_message: &'static str,
    task: F,
) where
    F: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!(job_id = %job_id, error = %e, "Generation task failed");
            ctx.store
                .update(
                    &job_id,
                    JobUpdate::default()
                        .status(JobStatus::Failed)
                        .message(failure_message)
                        .error(e.to_string()),
                )
                .await;
        }
    });
}
