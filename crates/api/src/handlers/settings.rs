//! Handlers for the `/settings` resource.
//!
//! Lets the dashboard configure provider keys and model ids at runtime.
//! Stored key material is never echoed back in full.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use modelgen_core::settings::{mask_key, AppSettings};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Result of a settings save: which fields were written.
#[derive(Debug, Serialize)]
pub struct SaveSettingsResponse {
    pub ok: bool,
    pub saved: Vec<&'static str>,
}

/// GET /api/settings
///
/// The saved settings with key material masked, plus the effective
/// resolved configuration (environment merged with stored values).
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let stored = state.settings.load().await;
    let gen = &state.config.gen;

    let replicate_configured = !state.settings.replicate_token(gen).await.is_empty();
    let face_model = state.settings.face_model(gen).await;
    let video_model = state.settings.video_model(gen).await;

    Ok(Json(json!({
        "replicateKey": mask_key(stored.replicate_key.as_deref()),
        "faceModel": stored.face_model,
        "videoModel": stored.video_model,
        "lipsyncProvider": stored.lipsync_provider,
        "elevenLabsKey": mask_key(stored.eleven_labs_key.as_deref()),
        "syncLabsKey": mask_key(stored.sync_labs_key.as_deref()),
        "didKey": mask_key(stored.did_key.as_deref()),
        "effective": {
            "replicateTokenConfigured": replicate_configured,
            "faceModel": face_model,
            "videoModel": video_model,
        },
    })))
}

/// POST /api/settings
///
/// Merge the provided fields into the stored settings.
pub async fn save_settings(
    State(state): State<AppState>,
    Json(payload): Json<AppSettings>,
) -> AppResult<Json<SaveSettingsResponse>> {
    let saved = state.settings.save(payload).await.map_err(AppError::Core)?;

    tracing::info!(fields = ?saved, "Dashboard settings saved");
    Ok(Json(SaveSettingsResponse { ok: true, saved }))
}
