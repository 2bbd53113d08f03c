//! REST client for the Replicate prediction API.
//!
//! Covers prediction creation, status retrieval, and polling to a
//! terminal state. Docs: <https://replicate.com/docs/reference/http>.

use std::time::Duration;

use serde::Deserialize;

/// Prediction statuses Replicate reports as terminal.
const TERMINAL_STATUSES: &[&str] = &["succeeded", "failed", "canceled"];

/// HTTP client for the Replicate REST API.
pub struct ReplicateClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

/// A Replicate prediction record, as returned by both the create and the
/// get endpoints. Model outputs vary wildly in shape, so `output` stays
/// raw JSON; use [`extract_first_output_url`] to pull a usable locator.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Prediction {
    /// Whether the prediction has finished (succeeded, failed, or canceled).
    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATUSES.contains(&self.status.to_lowercase().as_str())
    }

    /// Human-readable failure cause, if any.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Tunable parameters for [`ReplicateClient::wait_for_prediction`].
pub struct PredictionPollConfig {
    /// Total budget before the poll gives up.
    pub timeout: Duration,
    /// Delay between status queries.
    pub interval: Duration,
}

/// Errors from the Replicate REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    /// No API token is configured in the environment or the settings store.
    #[error(
        "Missing Replicate API token. Set REPLICATE_API_TOKEN in the environment \
         or save it from the Settings dashboard."
    )]
    MissingToken,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Replicate returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The prediction did not reach a terminal state within the budget.
    #[error("Replicate prediction timed out after {elapsed_secs}s (id={prediction_id})")]
    Timeout {
        prediction_id: String,
        elapsed_secs: u64,
    },
}

impl ReplicateClient {
    /// Create a client for the given API base URL and token.
    ///
    /// A trailing slash on `base_url` is stripped. The token may be empty;
    /// requests will then fail with [`ReplicateError::MissingToken`].
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_token)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across services).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_token: api_token.into().trim().to_string(),
        }
    }

    fn token(&self) -> Result<&str, ReplicateError> {
        if self.api_token.is_empty() {
            return Err(ReplicateError::MissingToken);
        }
        Ok(&self.api_token)
    }

    /// Start a prediction for `model` with the given input payload.
    ///
    /// Sends `POST /predictions`; Replicate queues the prediction and
    /// returns its id immediately.
    pub async fn create_prediction(
        &self,
        model: &str,
        input: &serde_json::Value,
    ) -> Result<Prediction, ReplicateError> {
        let token = self.token()?;
        let body = serde_json::json!({
            "model": model,
            "input": input,
        });

        let response = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .header("Authorization", format!("Token {token}"))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a prediction via `GET /predictions/{id}`.
    pub async fn get_prediction(&self, prediction_id: &str) -> Result<Prediction, ReplicateError> {
        let token = self.token()?;

        let response = self
            .client
            .get(format!("{}/predictions/{}", self.base_url, prediction_id))
            .header("Authorization", format!("Token {token}"))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Poll a prediction until it reaches a terminal state.
    ///
    /// `on_tick` is invoked after every poll with the fresh prediction and
    /// the elapsed seconds since the wait began, so callers can surface
    /// progress. Returns [`ReplicateError::Timeout`] when the configured
    /// budget is exhausted first.
    pub async fn wait_for_prediction(
        &self,
        prediction_id: &str,
        config: &PredictionPollConfig,
        mut on_tick: impl FnMut(&Prediction, u64),
    ) -> Result<Prediction, ReplicateError> {
        let started = tokio::time::Instant::now();

        loop {
            let prediction = self.get_prediction(prediction_id).await?;
            let elapsed_secs = started.elapsed().as_secs();

            on_tick(&prediction, elapsed_secs);

            if prediction.is_terminal() {
                return Ok(prediction);
            }

            if started.elapsed() >= config.timeout {
                return Err(ReplicateError::Timeout {
                    prediction_id: prediction_id.to_string(),
                    elapsed_secs,
                });
            }

            tokio::time::sleep(config.interval).await;
        }
    }

    // ---- private helpers ----

    /// Parse a JSON response body, mapping non-2xx statuses to
    /// [`ReplicateError::Api`] with the raw body attached.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// Pull the first usable URL out of a model's output value.
///
/// Model outputs vary: a bare string URL, a list of strings, a list of
/// objects, or an object with a `url`/`video`/`image` key.
pub fn extract_first_output_url(output: &serde_json::Value) -> Option<String> {
    fn from_object(obj: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
        for key in ["url", "video", "image"] {
            if let Some(serde_json::Value::String(s)) = obj.get(key) {
                return Some(s.clone());
            }
        }
        None
    }

    match output {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => match items.first() {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(obj)) => from_object(obj),
            _ => None,
        },
        serde_json::Value::Object(obj) => from_object(obj),
        _ => None,
    }
}

/// Progress ramp used while a prediction runs: starts at `base`, climbs
/// 3 points per poll interval, and saturates at 95 so completion is the
/// only thing that reaches 100.
pub fn progress_ramp(base: u8, elapsed_secs: u64, interval_secs: u64) -> u8 {
    let ticks = elapsed_secs / interval_secs.max(1);
    let ramped = u64::from(base) + ticks * 3;
    ramped.min(95) as u8
}
