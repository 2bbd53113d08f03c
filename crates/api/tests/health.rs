//! Integration tests for the health/metadata endpoints and general HTTP
//! behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(dir.path());
    state.storage.ensure_dirs().await.unwrap();

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["storage_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: GET / returns the endpoint map
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_returns_service_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["name"], "modelgen");
    assert_eq!(json["endpoints"]["face"], "/api/face/generate");
    assert_eq!(json["endpoints"]["jobs"], "/api/jobs/{job_id}");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = common::build_test_app(dir.path());

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36);
}

// ---------------------------------------------------------------------------
// Test: produced assets are served under /storage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn storage_files_are_served_statically() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(dir.path());
    state.storage.ensure_dirs().await.unwrap();

    state
        .storage
        .save_result(modelgen_core::types::JobType::Face, "job-9.png", b"png-bytes")
        .await
        .unwrap();

    let response = get(app, "/storage/faces/job-9.png").await;
    assert_eq!(response.status(), StatusCode::OK);
}
