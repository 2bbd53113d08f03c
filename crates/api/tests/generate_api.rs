//! Integration tests for the submission endpoints.
//!
//! No provider credentials are configured in the test environment, so
//! accepted submissions fail fast in the background without touching the
//! network -- which is exactly what the end-to-end assertions rely on.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_multipart, wait_for_terminal, Part, PNG_MAGIC};

// ---------------------------------------------------------------------------
// Test: face submission returns a pending job and the job is pollable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn face_submission_creates_a_pollable_job() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    let response = post_multipart(
        app.clone(),
        "/api/face/generate",
        &[Part::Text("prompt", "young woman with green eyes, freckles")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let job_id = body["job_id"].as_str().expect("job_id in response").to_string();
    assert_eq!(body["status"], "pending");
    assert!(body["created_at"].is_string());

    // The polling endpoint serves it immediately.
    let polled = body_json(get(app.clone(), &format!("/api/jobs/{job_id}")).await).await;
    assert_eq!(polled["job_type"], "face");

    // With no model configured the background task fails fast; the
    // failure must land in the job record, not take the server down.
    let terminal = wait_for_terminal(&app, &job_id).await;
    assert_eq!(terminal["status"], "failed");
    let error = terminal["error"].as_str().unwrap();
    assert!(error.contains("Face model is not configured"), "{error}");
}

// ---------------------------------------------------------------------------
// Test: face submission without a prompt is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn face_submission_requires_a_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    let response = post_multipart(app.clone(), "/api/face/generate", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "Missing required 'prompt' field");

    // A whitespace-only prompt is no better.
    let response = post_multipart(
        app,
        "/api/face/generate",
        &[Part::Text("prompt", "   ")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: face submission accepts reference images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn face_submission_accepts_reference_images() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(dir.path());

    let response = post_multipart(
        app,
        "/api/face/generate",
        &[
            Part::Text("prompt", "portrait"),
            Part::File {
                name: "images",
                file_name: "ref.png",
                content_type: "image/png",
                bytes: PNG_MAGIC,
            },
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let job = state
        .store
        .get(body["job_id"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(job.metadata["reference_images"], 1);
}

// ---------------------------------------------------------------------------
// Test: video submission validates the start image
// ---------------------------------------------------------------------------

#[tokio::test]
async fn video_submission_requires_a_real_image() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    // Missing entirely.
    let response = post_multipart(app.clone(), "/api/video/generate", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Image file required");

    // Wrong content type.
    let response = post_multipart(
        app.clone(),
        "/api/video/generate",
        &[Part::File {
            name: "image",
            file_name: "notes.txt",
            content_type: "text/plain",
            bytes: b"not an image",
        }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Image content type but garbage bytes.
    let response = post_multipart(
        app,
        "/api/video/generate",
        &[Part::File {
            name: "image",
            file_name: "face.png",
            content_type: "image/png",
            bytes: b"garbage",
        }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: accepted video submission records request metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn video_submission_records_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(dir.path());

    let response = post_multipart(
        app,
        "/api/video/generate",
        &[
            Part::File {
                name: "image",
                file_name: "start.png",
                content_type: "image/png",
                bytes: PNG_MAGIC,
            },
            Part::Text("prompt", "slow pan"),
            Part::Text("aspect_ratio", "9:16"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["provider"], "replicate");

    let job = state
        .store
        .get(body["job_id"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(job.metadata["aspect_ratio"], "9:16");
    assert_eq!(job.metadata["has_end_image"], false);
}

// ---------------------------------------------------------------------------
// Test: lip sync submission validates video and text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lipsync_submission_validates_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    // No video.
    let response = post_multipart(
        app.clone(),
        "/api/lipsync/generate",
        &[Part::Text("text", "hello")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Video file required");

    // Blank text.
    let response = post_multipart(
        app.clone(),
        "/api/lipsync/generate",
        &[
            Part::File {
                name: "video",
                file_name: "clip.mp4",
                content_type: "video/mp4",
                bytes: b"fake-video",
            },
            Part::Text("text", "  "),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Text cannot be empty");

    // Valid submission is accepted.
    let response = post_multipart(
        app,
        "/api/lipsync/generate",
        &[
            Part::File {
                name: "video",
                file_name: "clip.mp4",
                content_type: "video/mp4",
                bytes: b"fake-video",
            },
            Part::Text("text", "hello there"),
            Part::Text("voice_type", "male_deep"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "pending");
}
