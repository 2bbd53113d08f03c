// Each integration test binary compiles this module independently and
// uses a different subset of the helpers.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use modelgen_api::config::ServerConfig;
use modelgen_api::router::build_app_router;
use modelgen_api::state::AppState;
use modelgen_core::config::GenConfig;

/// Build a test `ServerConfig` rooted at `storage_path`.
///
/// No provider credentials or model ids are configured, so generation
/// tasks fail fast without touching the network.
pub fn test_config(storage_path: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: Vec::new(),
        request_timeout_secs: 30,
        gen: GenConfig {
            replicate_base_url: "https://api.replicate.com/v1".into(),
            replicate_api_token: String::new(),
            face_model: String::new(),
            video_model: String::new(),
            lipsync_provider: Default::default(),
            elevenlabs_base_url: "https://api.elevenlabs.io/v1".into(),
            elevenlabs_api_key: String::new(),
            sync_labs_base_url: "https://api.synclabs.so/v2".into(),
            sync_labs_api_key: String::new(),
            did_base_url: "https://api.d-id.com".into(),
            did_api_key: String::new(),
            storage_path: storage_path.display().to_string(),
            max_file_size_mb: 50,
            job_timeout_seconds: 300,
            polling_interval_seconds: 5,
        },
    }
}

/// Build the full application router with all middleware layers, plus the
/// state so tests can seed the job store directly.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(storage_path: &std::path::Path) -> (Router, AppState) {
    let config = test_config(storage_path);
    let state = AppState::from_config(config.clone());
    let app = build_app_router(state.clone(), &config);
    (app, state)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build"),
    )
    .await
    .expect("request should succeed")
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
    )
    .await
    .expect("request should succeed")
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// One part of a multipart form: either a text field or a file upload.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Boundary used by [`post_multipart`].
const BOUNDARY: &str = "------------------------modelgen-test-boundary";

/// Issue a POST request with a hand-built `multipart/form-data` body.
pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let mut body: Vec<u8> = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request should build"),
    )
    .await
    .expect("request should succeed")
}

/// Poll the status endpoint until the job reaches a terminal state.
///
/// Panics after ~2 seconds of wall-clock waiting; the failing paths the
/// tests exercise resolve in microseconds.
pub async fn wait_for_terminal(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/jobs/{job_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] == "completed" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

// Eight magic bytes are enough for image format detection.
pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
