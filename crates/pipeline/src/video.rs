//! Image-to-video generation via the Replicate prediction API.

use std::time::Duration;

use modelgen_core::store::JobUpdate;
use modelgen_core::types::{Job, JobStatus, JobType, VideoGenerationRequest};
use modelgen_providers::data_uri;
use modelgen_providers::download;
use modelgen_providers::replicate::{
    extract_first_output_url, progress_ramp, PredictionPollConfig, ReplicateClient,
};

use crate::{spawn_job, PipelineContext, PipelineError};

/// Progress value when the prediction is queued; the poll ramp starts here.
const PROGRESS_QUEUED: u8 = 55;

/// Drives video generation jobs.
pub struct VideoService {
    ctx: PipelineContext,
}

impl VideoService {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Create a video generation job from a start image (and optional end
    /// image) and start processing it in the background.
    pub async fn generate(
        &self,
        request: VideoGenerationRequest,
        source_image: Vec<u8>,
        end_image: Option<Vec<u8>>,
    ) -> Job {
        let job = Job::new(JobType::Video, "Initializing video generation...").with_metadata(
            serde_json::json!({
                "prompt": request.prompt,
                "aspect_ratio": request.aspect_ratio.as_str(),
                "has_end_image": end_image.is_some(),
                "provider": "replicate",
            }),
        );
        let job = self.ctx.store.create(job).await;

        let ctx = self.ctx.clone();
        let job_id = job.id.clone();
        spawn_job(
            ctx.clone(),
            job_id.clone(),
            "Video generation failed",
            async move { process_video(ctx, job_id, request, source_image, end_image).await },
        );

        job
    }
}

async fn process_video(
    ctx: PipelineContext,
    job_id: String,
    request: VideoGenerationRequest,
    source_image: Vec<u8>,
    end_image: Option<Vec<u8>>,
) -> Result<(), PipelineError> {
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(10)
                .message("Preparing video request..."),
        )
        .await;

    let token = ctx.settings.replicate_token(&ctx.config).await;
    let client = ReplicateClient::with_client(
        ctx.http.clone(),
        ctx.config.replicate_base_url.as_str(),
        token,
    );

    let model = ctx.settings.video_model(&ctx.config).await;
    if model.is_empty() {
        return Err(PipelineError::ModelNotConfigured(
            "Video model is not configured. Set VIDEO_MODEL in the environment \
             or set it from the Settings dashboard."
                .into(),
        ));
    }

    let image_uri = data_uri("image/png", &source_image);
    let end_image_uri = end_image.as_deref().map(|bytes| data_uri("image/png", bytes));

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .progress(25)
                .message("Sending to video model..."),
        )
        .await;

    let mut input = serde_json::json!({
        "image": image_uri,
        "prompt": request.prompt,
        "aspect_ratio": request.aspect_ratio.as_str(),
    });
    if let Some(uri) = end_image_uri {
        input["end_image"] = serde_json::Value::String(uri);
    }
    if let Some(mode) = request.mode.as_deref().filter(|m| !m.trim().is_empty()) {
        input["mode"] = serde_json::Value::String(mode.trim().to_string());
    }

    ctx.store
        .update(
            &job_id,
            JobUpdate::default().progress(40).message("Generating video..."),
        )
        .await;

    let prediction = client.create_prediction(&model, &input).await?;
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .provider_job_id(&prediction.id)
                .progress(PROGRESS_QUEUED)
                .message("Queued..."),
        )
        .await;

    let interval_secs = ctx.config.polling_interval_seconds;
    let poll_config = PredictionPollConfig {
        timeout: Duration::from_secs(ctx.config.job_timeout_seconds),
        interval: Duration::from_secs(interval_secs),
    };

    let tick_ctx = ctx.clone();
    let tick_job_id = job_id.clone();
    let final_prediction = client
        .wait_for_prediction(&prediction.id, &poll_config, move |pred, elapsed_secs| {
            let update = JobUpdate::default()
                .progress(progress_ramp(PROGRESS_QUEUED, elapsed_secs, interval_secs))
                .message(format!("{}... ({elapsed_secs}s)", pred.status.to_lowercase()));
            let store = tick_ctx.store.clone();
            let job_id = tick_job_id.clone();
            tokio::spawn(async move {
                store.update(&job_id, update).await;
            });
        })
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .progress(80)
                .message("Downloading result..."),
        )
        .await;

    let Some(output_url) = extract_first_output_url(&final_prediction.output) else {
        return Err(PipelineError::MissingOutput(
            final_prediction
                .error_message()
                .unwrap_or_else(|| "No output URL received from Replicate".into()),
        ));
    };

    let downloaded = download::fetch(&ctx.http, &output_url).await?;
    let local_url = ctx
        .storage
        .save_result(JobType::Video, &format!("{job_id}.mp4"), &downloaded.bytes)
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .message("Video generation completed!")
                .result_url(local_url),
        )
        .await;

    Ok(())
}
