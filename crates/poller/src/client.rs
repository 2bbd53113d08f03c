//! Status-query transport for the job poller.

use async_trait::async_trait;
use modelgen_core::types::JobStatusResponse;

/// Errors from a single status query. All of them are treated as
/// transient by the polling loop.
#[derive(Debug, thiserror::Error)]
pub enum StatusClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Status query failed ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// A transport that can fetch the current status of a job.
///
/// Implemented by [`HttpStatusClient`] for production and by scripted
/// fakes in tests.
#[async_trait]
pub trait StatusClient: Send + Sync + 'static {
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, StatusClientError>;
}

/// HTTP transport: `GET {base}/jobs/{job_id}`.
pub struct HttpStatusClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusClient {
    /// Create a transport for the given API base URL
    /// (e.g. `http://localhost:8000/api`). A trailing slash is stripped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a transport reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", self.base_url, job_id)
    }
}

#[async_trait]
impl StatusClient for HttpStatusClient {
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, StatusClientError> {
        let response = self.client.get(self.status_url(job_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StatusClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<JobStatusResponse>().await?)
    }
}
