//! REST clients for the hosted generation providers.
//!
//! Wraps the Replicate prediction API (face and video models), the
//! ElevenLabs TTS API, the Sync Labs lip sync API, and the D-ID talking
//! avatar API using [`reqwest`]. Each client is a thin typed layer over
//! the provider's HTTP surface; job bookkeeping stays in the pipeline.

pub mod did;
pub mod download;
pub mod elevenlabs;
pub mod replicate;
pub mod synclabs;

/// Encode raw bytes as a `data:` URI for providers that accept inline
/// media (Replicate model inputs).
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_has_mime_and_base64_payload() {
        let uri = data_uri("image/png", b"abc");
        assert_eq!(uri, "data:image/png;base64,YWJj");
    }
}
