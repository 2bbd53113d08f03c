//! Lip sync via the configured provider (ElevenLabs, Sync Labs, or D-ID).

use std::time::Duration;

use modelgen_core::config::LipSyncProvider;
use modelgen_core::store::JobUpdate;
use modelgen_core::types::{Job, JobStatus, JobType, LipSyncRequest};
use modelgen_providers::did::{DIdClient, TalkPollConfig};
use modelgen_providers::download;
use modelgen_providers::elevenlabs::ElevenLabsClient;
use modelgen_providers::synclabs::{SyncLabsClient, SyncPollConfig};

use crate::{spawn_job, PipelineContext, PipelineError};

/// Drives lip sync jobs, routing to the configured provider.
pub struct LipSyncService {
    ctx: PipelineContext,
}

impl LipSyncService {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Create a lip sync job for the uploaded video and start processing
    /// it in the background.
    pub async fn generate(&self, request: LipSyncRequest, video: Vec<u8>) -> Job {
        let provider = self.ctx.config.lipsync_provider;
        let job = Job::new(
            JobType::Lipsync,
            format!("Initializing lip sync with {provider}..."),
        )
        .with_metadata(serde_json::json!({
            "text": request.text,
            "voice_type": request.voice_type.as_str(),
            "language": request.language,
            "provider": provider.as_str(),
        }));
        let job = self.ctx.store.create(job).await;

        let ctx = self.ctx.clone();
        let job_id = job.id.clone();
        spawn_job(ctx.clone(), job_id.clone(), "Lip sync failed", async move {
            match provider {
                LipSyncProvider::ElevenLabs => {
                    process_elevenlabs(ctx, job_id, request, video).await
                }
                LipSyncProvider::SyncLabs => process_sync_labs(ctx, job_id, request, video).await,
                LipSyncProvider::DId => process_did(ctx, job_id, request, video).await,
            }
        });

        job
    }
}

/// Progress ramp while a remote sync runs: 4 points per poll, capped at 95.
fn sync_progress(elapsed_secs: u64, interval_secs: u64) -> u8 {
    let ticks = elapsed_secs / interval_secs.max(1);
    (40 + ticks * 4).min(95) as u8
}

/// ElevenLabs path: synthesize speech ourselves, then lip-sync with
/// Sync Labs when a key is available; otherwise keep the source video as
/// the result alongside the generated audio.
async fn process_elevenlabs(
    ctx: PipelineContext,
    job_id: String,
    request: LipSyncRequest,
    video: Vec<u8>,
) -> Result<(), PipelineError> {
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(10)
                .message("Generating voice with ElevenLabs..."),
        )
        .await;

    let tts = ElevenLabsClient::new(
        ctx.config.elevenlabs_base_url.as_str(),
        ctx.config.elevenlabs_api_key.as_str(),
    );
    let audio = tts.synthesize(&request.text, request.voice_type).await?;

    ctx.storage
        .save_result(JobType::Lipsync, &format!("{job_id}_audio.mp3"), &audio)
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default().progress(50).message("Applying lip sync..."),
        )
        .await;

    let sync = SyncLabsClient::new(
        ctx.config.sync_labs_base_url.as_str(),
        ctx.config.sync_labs_api_key.as_str(),
    );
    let result_url = if sync.has_key() {
        let submitted = sync.submit_audio(video, audio).await?;
        ctx.store
            .update(&job_id, JobUpdate::default().provider_job_id(&submitted.id))
            .await;

        let remote_url = wait_for_sync(&ctx, &job_id, &sync, &submitted.id).await?;
        let downloaded = download::fetch(&ctx.http, &remote_url).await?;
        ctx.storage
            .save_result(JobType::Lipsync, &format!("{job_id}.mp4"), &downloaded.bytes)
            .await?
    } else {
        // No sync provider available: keep the source video as the result
        // next to the generated audio track.
        ctx.storage
            .save_result(JobType::Lipsync, &format!("{job_id}.mp4"), &video)
            .await?
    };

    complete(&ctx, &job_id, result_url).await;
    Ok(())
}

/// Sync Labs path: Sync Labs voices the transcript itself.
async fn process_sync_labs(
    ctx: PipelineContext,
    job_id: String,
    request: LipSyncRequest,
    video: Vec<u8>,
) -> Result<(), PipelineError> {
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(15)
                .message("Uploading to Sync Labs..."),
        )
        .await;

    let sync = SyncLabsClient::new(
        ctx.config.sync_labs_base_url.as_str(),
        ctx.config.sync_labs_api_key.as_str(),
    );
    let submitted = sync
        .submit_transcript(video, &request.text, request.voice_type, &request.language)
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .provider_job_id(&submitted.id)
                .progress(40)
                .message("Processing lip sync..."),
        )
        .await;

    let remote_url = wait_for_sync(&ctx, &job_id, &sync, &submitted.id).await?;
    let downloaded = download::fetch(&ctx.http, &remote_url).await?;
    let result_url = ctx
        .storage
        .save_result(JobType::Lipsync, &format!("{job_id}.mp4"), &downloaded.bytes)
        .await?;

    complete(&ctx, &job_id, result_url).await;
    Ok(())
}

/// D-ID path: a talking avatar rendered from the source media.
async fn process_did(
    ctx: PipelineContext,
    job_id: String,
    request: LipSyncRequest,
    video: Vec<u8>,
) -> Result<(), PipelineError> {
    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(15)
                .message("Creating with D-ID..."),
        )
        .await;

    let did = DIdClient::new(
        ctx.config.did_base_url.as_str(),
        ctx.config.did_api_key.as_str(),
    );
    let talk = did
        .create_talk(&video, &request.text, request.voice_type)
        .await?;

    ctx.store
        .update(
            &job_id,
            JobUpdate::default()
                .provider_job_id(&talk.id)
                .progress(40)
                .message("Generating talking video..."),
        )
        .await;

    let interval_secs = ctx.config.polling_interval_seconds;
    let poll_config = TalkPollConfig {
        timeout: Duration::from_secs(ctx.config.job_timeout_seconds),
        interval: Duration::from_secs(interval_secs),
    };

    let tick_ctx = ctx.clone();
    let tick_job_id = job_id.clone();
    let remote_url = did
        .wait_for_talk(&talk.id, &poll_config, move |elapsed_secs| {
            let update = JobUpdate::default()
                .progress(sync_progress(elapsed_secs, interval_secs))
                .message(format!("Creating talking video... ({elapsed_secs}s)"));
            let store = tick_ctx.store.clone();
            let job_id = tick_job_id.clone();
            tokio::spawn(async move {
                store.update(&job_id, update).await;
            });
        })
        .await?;

    let downloaded = download::fetch(&ctx.http, &remote_url).await?;
    let result_url = ctx
        .storage
        .save_result(JobType::Lipsync, &format!("{job_id}.mp4"), &downloaded.bytes)
        .await?;

    complete(&ctx, &job_id, result_url).await;
    Ok(())
}

// ---- shared helpers ----

/// Poll a Sync Labs job to completion, surfacing progress on each tick.
async fn wait_for_sync(
    ctx: &PipelineContext,
    job_id: &str,
    sync: &SyncLabsClient,
    sync_id: &str,
) -> Result<String, PipelineError> {
    let interval_secs = ctx.config.polling_interval_seconds;
    let poll_config = SyncPollConfig {
        timeout: Duration::from_secs(ctx.config.job_timeout_seconds),
        interval: Duration::from_secs(interval_secs),
    };

    let tick_store = ctx.store.clone();
    let tick_job_id = job_id.to_string();
    let url = sync
        .wait_for_completion(sync_id, &poll_config, move |elapsed_secs| {
            let update = JobUpdate::default()
                .progress(sync_progress(elapsed_secs, interval_secs))
                .message(format!("Syncing lips... ({elapsed_secs}s)"));
            let store = tick_store.clone();
            let job_id = tick_job_id.clone();
            tokio::spawn(async move {
                store.update(&job_id, update).await;
            });
        })
        .await?;

    Ok(url)
}

async fn complete(ctx: &PipelineContext, job_id: &str, result_url: String) {
    ctx.store
        .update(
            job_id,
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .message("Lip sync completed!")
                .result_url(result_url),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_ctx;
    use modelgen_core::types::VoiceType;

    #[test]
    fn sync_progress_ramps_by_four_and_caps() {
        assert_eq!(sync_progress(0, 5), 40);
        assert_eq!(sync_progress(10, 5), 48);
        assert_eq!(sync_progress(600, 5), 95);
        assert_eq!(sync_progress(10, 0), 80);
    }

    #[tokio::test]
    async fn generate_records_provider_in_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&dir);
        let service = LipSyncService::new(ctx.clone());

        let job = service
            .generate(
                LipSyncRequest {
                    text: "hello there".into(),
                    voice_type: VoiceType::FemaleSoft,
                    language: "en".into(),
                },
                b"video-bytes".to_vec(),
            )
            .await;

        assert_eq!(job.job_type, JobType::Lipsync);
        assert_eq!(job.metadata["provider"], "elevenlabs");
        assert_eq!(job.metadata["voice_type"], "female_soft");
        assert!(job.message.contains("elevenlabs"));
    }

    #[tokio::test]
    async fn missing_tts_key_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&dir);
        let service = LipSyncService::new(ctx.clone());

        let job = service
            .generate(
                LipSyncRequest {
                    text: "hello".into(),
                    voice_type: VoiceType::FemaleYoung,
                    language: "en".into(),
                },
                b"video".to_vec(),
            )
            .await;

        for _ in 0..50 {
            let current = ctx.store.get(&job.id).await.unwrap();
            if current.status.is_terminal() {
                assert_eq!(current.status, JobStatus::Failed);
                assert_eq!(current.message, "Lip sync failed");
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }
}
