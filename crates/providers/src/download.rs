//! Fetching produced assets from provider-hosted URLs.

/// Errors while downloading a result file.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The host returned a non-2xx status code.
    #[error("Download failed ({status}) for {url}")]
    Status { status: u16, url: String },
}

/// A downloaded asset: raw bytes plus the reported content type.
pub struct Downloaded {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Fetch `url` fully into memory.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Downloaded, DownloadError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    Ok(Downloaded {
        bytes: response.bytes().await?.to_vec(),
        content_type,
    })
}

/// Pick an image file extension from a content type, defaulting to `png`.
pub fn image_ext(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("jpeg") || ct.contains("jpg") => "jpg",
        Some(ct) if ct.contains("webp") => "webp",
        _ => "png",
    }
}
