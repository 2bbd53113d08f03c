//! REST client for the ElevenLabs text-to-speech API.

use modelgen_core::types::VoiceType;

/// TTS model used for synthesis.
const TTS_MODEL_ID: &str = "eleven_multilingual_v2";

/// Map a platform voice preset to an ElevenLabs voice id.
pub fn voice_id(voice: VoiceType) -> &'static str {
    match voice {
        VoiceType::FemaleYoung => "EXAVITQu4vr4xnSDxMaL", // Bella
        VoiceType::FemaleMature => "pNInz6obpgDQGcFmaJgB", // Sarah
        VoiceType::FemaleSoft => "jBpfuIE2acCO8z3wKNLl",  // Rachel
        VoiceType::MaleYoung => "pqHfZKP75CvOlQylNhV4",   // Bill
        VoiceType::MaleDeep => "VR6AewLTigWG4xSOukaG",    // Arnold
    }
}

/// Errors from the ElevenLabs REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ElevenLabsError {
    /// No API key is configured.
    #[error("Missing ElevenLabs API key. Set ELEVENLABS_API_KEY or save it from the Settings dashboard.")]
    MissingKey,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ElevenLabs returned a non-2xx status code.
    #[error("ElevenLabs API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// HTTP client for the ElevenLabs API.
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
        }
    }

    /// Synthesize speech for `text` with the given voice preset.
    ///
    /// Sends `POST /text-to-speech/{voice_id}` and returns the raw audio
    /// bytes (MP3).
    pub async fn synthesize(
        &self,
        text: &str,
        voice: VoiceType,
    ) -> Result<Vec<u8>, ElevenLabsError> {
        if self.api_key.is_empty() {
            return Err(ElevenLabsError::MissingKey);
        }

        let payload = serde_json::json!({
            "text": text,
            "model_id": TTS_MODEL_ID,
            "voice_settings": {
                "stability": 0.75,
                "similarity_boost": 0.75,
            },
        });

        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id(voice)))
            .header("xi-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ElevenLabsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
