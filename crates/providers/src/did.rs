//! REST client for the D-ID talking avatar API.
//!
//! Creates a "talk" from a source image/video and a text script, then
//! polls `GET /talks/{id}` until it renders.

use std::time::Duration;

use serde::Deserialize;

use modelgen_core::types::VoiceType;

use crate::data_uri;

/// Statuses D-ID reports for a finished talk.
const SUCCESS_STATUSES: &[&str] = &["done", "completed"];
/// Statuses D-ID reports for a failed talk.
const FAILURE_STATUSES: &[&str] = &["error", "failed"];

/// Map a platform voice preset to a Microsoft neural voice id.
pub fn voice_id(voice: VoiceType) -> &'static str {
    match voice {
        VoiceType::FemaleYoung => "en-US-JennyNeural",
        VoiceType::FemaleMature => "en-US-AriaNeural",
        VoiceType::FemaleSoft => "en-US-SaraNeural",
        VoiceType::MaleYoung => "en-US-GuyNeural",
        VoiceType::MaleDeep => "en-US-DavisNeural",
    }
}

/// Response to a talk creation request.
#[derive(Debug, Deserialize)]
pub struct CreateTalkResponse {
    pub id: String,
}

/// A talk record as returned by `GET /talks/{id}`.
#[derive(Debug, Deserialize)]
pub struct Talk {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error: Option<TalkError>,
}

/// Error detail attached to a failed talk.
#[derive(Debug, Deserialize)]
pub struct TalkError {
    #[serde(default)]
    pub description: Option<String>,
}

/// Errors from the D-ID REST layer.
#[derive(Debug, thiserror::Error)]
pub enum DIdError {
    /// No API key is configured.
    #[error("Missing D-ID API key. Set DID_API_KEY or save it from the Settings dashboard.")]
    MissingKey,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// D-ID returned a non-2xx status code.
    #[error("D-ID API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The talk finished with a failure status.
    #[error("D-ID generation failed: {0}")]
    TalkFailed(String),

    /// The talk did not render within the polling budget.
    #[error("D-ID generation timed out after {elapsed_secs}s (id={talk_id})")]
    Timeout { talk_id: String, elapsed_secs: u64 },
}

/// Tunable parameters for [`DIdClient::wait_for_talk`].
pub struct TalkPollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

/// HTTP client for the D-ID API.
pub struct DIdClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DIdClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
        }
    }

    fn key(&self) -> Result<&str, DIdError> {
        if self.api_key.is_empty() {
            return Err(DIdError::MissingKey);
        }
        Ok(&self.api_key)
    }

    /// Create a talk from raw source media and a text script.
    ///
    /// Sends `POST /talks` with the media inlined as a data URI and a
    /// Microsoft-voiced script.
    pub async fn create_talk(
        &self,
        source: &[u8],
        text: &str,
        voice: VoiceType,
    ) -> Result<CreateTalkResponse, DIdError> {
        let key = self.key()?;

        let payload = serde_json::json!({
            "source_url": data_uri("image/png", source),
            "script": {
                "type": "text",
                "input": text,
                "provider": {
                    "type": "microsoft",
                    "voice_id": voice_id(voice),
                },
            },
        });

        let response = self
            .client
            .post(format!("{}/talks", self.base_url))
            .header("Authorization", format!("Basic {key}"))
            .json(&payload)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a talk.
    pub async fn get_talk(&self, talk_id: &str) -> Result<Talk, DIdError> {
        let key = self.key()?;

        let response = self
            .client
            .get(format!("{}/talks/{}", self.base_url, talk_id))
            .header("Authorization", format!("Basic {key}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Poll a talk until it renders, returning the result URL.
    /// `on_tick` receives the elapsed seconds after each poll.
    pub async fn wait_for_talk(
        &self,
        talk_id: &str,
        config: &TalkPollConfig,
        mut on_tick: impl FnMut(u64),
    ) -> Result<String, DIdError> {
        let started = tokio::time::Instant::now();

        loop {
            tokio::time::sleep(config.interval).await;

            let elapsed_secs = started.elapsed().as_secs();
            on_tick(elapsed_secs);

            let talk = self.get_talk(talk_id).await?;
            let status = talk.status.to_lowercase();

            if SUCCESS_STATUSES.contains(&status.as_str()) {
                return talk
                    .result_url
                    .ok_or_else(|| DIdError::TalkFailed("Talk done without a result URL".into()));
            }
            if FAILURE_STATUSES.contains(&status.as_str()) {
                let cause = talk
                    .error
                    .and_then(|e| e.description)
                    .unwrap_or_else(|| "D-ID failed".into());
                return Err(DIdError::TalkFailed(cause));
            }

            if started.elapsed() >= config.timeout {
                return Err(DIdError::Timeout {
                    talk_id: talk_id.to_string(),
                    elapsed_secs,
                });
            }
        }
    }

    // ---- private helpers ----

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DIdError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DIdError::Api {
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
    fn voices_map_to_microsoft_neural_ids() {
        assert_eq!(voice_id(VoiceType::FemaleYoung), "en-US-JennyNeural");
        assert_eq!(voice_id(VoiceType::MaleDeep), "en-US-DavisNeural");
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_any_request() {
        let client = DIdClient::new("https://api.d-id.com", "");
        let err = client.get_talk("t1").await.unwrap_err();
        assert!(matches!(err, DIdError::MissingKey));
    }
}
