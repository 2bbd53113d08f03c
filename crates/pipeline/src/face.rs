//! Face generation via the Replicate prediction API.

use std::time::Duration;

use modelgen_core::store::JobUpdate;
use modelgen_core::types::{AspectRatio, FaceGenerationRequest, Job, JobStatus, JobType};
use modelgen_providers::data_uri;
use modelgen_providers::download;
use modelgen_providers::replicate::{
    extract_first_output_url, progress_ramp, PredictionPollConfig, ReplicateClient,
};

use crate::{spawn_job, PipelineContext, PipelineError};

/// Progress value when the prediction is queued; the poll ramp starts here.
const PROGRESS_QUEUED: u8 = 60;

/// Drives face generation jobs.
pub struct FaceService {
    ctx: PipelineContext,
}

impl FaceService {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Create a face generation job and start processing it in the
    /// background. Returns the pending job immediately.
    pub async fn generate(
        &self,
        request: FaceGenerationRequest,
        reference_images: Vec<Vec<u8>>,
    ) -> Job {
        let job = Job::new(JobType::Face, "Initializing face generation...").with_metadata(
            serde_json::json!({
                "prompt": request.prompt,
                "aspect_ratio": request.aspect_ratio.as_str(),
                "reference_images": reference_images.len(),
            }),
        );
        let job = self.ctx.store.create(job).await;

        let ctx = self.ctx.clone();
        let job_id = job.id.clone();
        spawn_job(
            ctx.clone(),
            job_id.clone(),
            "Face generation failed",
            async move { process_face(ctx, job_id, request, reference_images).await },
        );

        job
    }
}

async fn process_face(
    ctx: PipelineContext,
    job_id: String,
    request: FaceGenerationRequest,
    reference_images: Vec<Vec<u8>>,
) -> Result<(), PipelineError> {
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(10)
                .message("Preparing request..."),
        )
        .await;

    let token = ctx.settings.replicate_token(&ctx.config).await;
    let client = ReplicateClient::with_client(
        ctx.http.clone(),
        ctx.config.replicate_base_url.as_str(),
        token,
    );

    let model = ctx.settings.face_model(&ctx.config).await;
    if model.is_empty() {
        return Err(PipelineError::ModelNotConfigured(
            "Face model is not configured. Set FACE_MODEL in the environment \
             or set it from the Settings dashboard."
                .into(),
        ));
    }

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .progress(30)
                .message("Sending to Nano Banana Pro..."),
        )
        .await;

    // Model schemas differ; keep the payload lean.
    let mut input = serde_json::json!({ "prompt": request.prompt });
    if let Some(first) = reference_images.first() {
        input["image"] = serde_json::Value::String(data_uri("image/png", first));
    }
    if request.aspect_ratio != AspectRatio::Auto {
        input["aspect_ratio"] = serde_json::Value::String(request.aspect_ratio.as_str().into());
    }

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .progress(50)
                .message("Generating face with AI..."),
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
    let ext = download::image_ext(downloaded.content_type.as_deref());
    let local_url = ctx
        .storage
        .save_result(JobType::Face, &format!("{job_id}.{ext}"), &downloaded.bytes)
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .message("Face generation completed!")
                .result_url(local_url),
        )
        .await;

    Ok(())
}
