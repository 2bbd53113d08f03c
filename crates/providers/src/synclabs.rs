//! REST client for the Sync Labs lip sync API.
//!
//! Supports transcript-driven sync (`POST /lipsync`, Sync Labs voices the
//! text itself) and custom-audio sync (`POST /lipsync/audio`). Results
//! are retrieved by polling `GET /lipsync/{id}`.

use std::time::Duration;

use serde::Deserialize;

use modelgen_core::types::VoiceType;

/// Statuses Sync Labs reports for a finished sync.
const SUCCESS_STATUSES: &[&str] = &["completed", "done"];
/// Statuses Sync Labs reports for a failed sync.
const FAILURE_STATUSES: &[&str] = &["failed", "error"];

/// Map a platform voice preset to a Sync Labs voice slug.
pub fn voice_slug(voice: VoiceType) -> &'static str {
    // Sync Labs uses the platform naming as-is.
    voice.as_str()
}

/// Response to a sync submission.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned id of the sync job.
    pub id: String,
}

/// A Sync Labs job record as returned by `GET /lipsync/{id}`.
#[derive(Debug, Deserialize)]
pub struct LipSyncJob {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub result: Option<LipSyncResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Nested result object on newer API versions.
#[derive(Debug, Deserialize)]
pub struct LipSyncResult {
    #[serde(default)]
    pub url: Option<String>,
}

impl LipSyncJob {
    /// The produced video URL, wherever this API version put it.
    pub fn output_url(&self) -> Option<String> {
        self.video_url
            .clone()
            .or_else(|| self.result.as_ref().and_then(|r| r.url.clone()))
    }
}

/// Errors from the Sync Labs REST layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncLabsError {
    /// No API key is configured.
    #[error("Missing Sync Labs API key. Set SYNC_LABS_API_KEY or save it from the Settings dashboard.")]
    MissingKey,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Sync Labs returned a non-2xx status code.
    #[error("Sync Labs API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The remote job finished with a failure status.
    #[error("Lip sync failed: {0}")]
    JobFailed(String),

    /// The remote job did not finish within the polling budget.
    #[error("Lip sync timed out after {elapsed_secs}s (id={sync_id})")]
    Timeout { sync_id: String, elapsed_secs: u64 },
}

/// Tunable parameters for [`SyncLabsClient::wait_for_completion`].
pub struct SyncPollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

/// HTTP client for the Sync Labs API.
pub struct SyncLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SyncLabsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
        }
    }

    /// Whether an API key is configured at all.
    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn key(&self) -> Result<&str, SyncLabsError> {
        if self.api_key.is_empty() {
            return Err(SyncLabsError::MissingKey);
        }
        Ok(&self.api_key)
    }

    /// Submit a transcript-driven sync: Sync Labs voices `transcript`
    /// itself and lip-syncs the uploaded video to it.
    pub async fn submit_transcript(
        &self,
        video: Vec<u8>,
        transcript: &str,
        voice: VoiceType,
        language: &str,
    ) -> Result<SubmitResponse, SyncLabsError> {
        let key = self.key()?;

        let form = reqwest::multipart::Form::new()
            .part(
                "video",
                reqwest::multipart::Part::bytes(video)
                    .file_name("input.mp4")
                    .mime_str("video/mp4")?,
            )
            .text("transcript", transcript.to_string())
            .text("voice", voice_slug(voice))
            .text("language", language.to_string());

        let response = self
            .client
            .post(format!("{}/lipsync", self.base_url))
            .header("x-api-key", key)
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit a custom-audio sync: the uploaded video is lip-synced to
    /// the provided audio track.
    pub async fn submit_audio(
        &self,
        video: Vec<u8>,
        audio: Vec<u8>,
    ) -> Result<SubmitResponse, SyncLabsError> {
        let key = self.key()?;

        let form = reqwest::multipart::Form::new()
            .part(
                "video",
                reqwest::multipart::Part::bytes(video)
                    .file_name("input.mp4")
                    .mime_str("video/mp4")?,
            )
            .part(
                "audio",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.mp3")
                    .mime_str("audio/mpeg")?,
            );

        let response = self
            .client
            .post(format!("{}/lipsync/audio", self.base_url))
            .header("x-api-key", key)
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a sync job.
    pub async fn get_job(&self, sync_id: &str) -> Result<LipSyncJob, SyncLabsError> {
        let key = self.key()?;

        let response = self
            .client
            .get(format!("{}/lipsync/{}", self.base_url, sync_id))
            .header("x-api-key", key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Poll a sync job until it completes, returning the produced video
    /// URL. `on_tick` receives the elapsed seconds after each poll.
    pub async fn wait_for_completion(
        &self,
        sync_id: &str,
        config: &SyncPollConfig,
        mut on_tick: impl FnMut(u64),
    ) -> Result<String, SyncLabsError> {
        let started = tokio::time::Instant::now();

        loop {
            tokio::time::sleep(config.interval).await;

            let elapsed_secs = started.elapsed().as_secs();
            on_tick(elapsed_secs);

            let job = self.get_job(sync_id).await?;
            let status = job.status.to_lowercase();

            if SUCCESS_STATUSES.contains(&status.as_str()) {
                return job.output_url().ok_or_else(|| {
                    SyncLabsError::JobFailed("Sync completed without a video URL".into())
                });
            }
            if FAILURE_STATUSES.contains(&status.as_str()) {
                return Err(SyncLabsError::JobFailed(
                    job.error.unwrap_or_else(|| "Sync failed".into()),
                ));
            }

            if started.elapsed() >= config.timeout {
                return Err(SyncLabsError::Timeout {
                    sync_id: sync_id.to_string(),
                    elapsed_secs,
                });
            }
        }
    }

    // ---- private helpers ----

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SyncLabsError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SyncLabsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_url_prefers_video_url_field() {
        let job = LipSyncJob {
            status: "completed".into(),
            video_url: Some("https://sync.so/a.mp4".into()),
            result: Some(LipSyncResult {
                url: Some("https://sync.so/b.mp4".into()),
            }),
            error: None,
        };
        assert_eq!(job.output_url().as_deref(), Some("https://sync.so/a.mp4"));
    }

    #[test]
    fn output_url_falls_back_to_nested_result() {
        let job = LipSyncJob {
            status: "done".into(),
            video_url: None,
            result: Some(LipSyncResult {
                url: Some("https://sync.so/b.mp4".into()),
            }),
            error: None,
        };
        assert_eq!(job.output_url().as_deref(), Some("https://sync.so/b.mp4"));
    }

    #[test]
    fn voice_slug_matches_platform_naming() {
        assert_eq!(voice_slug(VoiceType::MaleDeep), "male_deep");
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_any_request() {
        let client = SyncLabsClient::new("https://api.synclabs.so/v2", "");
        assert!(!client.has_key());
        let err = client.get_job("s1").await.unwrap_err();
        assert!(matches!(err, SyncLabsError::MissingKey));
    }
}
