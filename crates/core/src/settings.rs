//! Dashboard settings persisted as JSON on disk.
//!
//! The browser settings panel saves provider keys and model ids here so a
//! deployment can be configured without restarting. Environment
//! configuration always wins; the stored values are the fallback.
//! Keys are camelCase to match the dashboard payload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::GenConfig;
use crate::error::CoreError;

/// Settings file name inside the storage root.
const SETTINGS_FILE: &str = "app_settings.json";

/// Dashboard-managed settings. Every field is optional; a save merges
/// only the provided fields into the stored document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicate_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lipsync_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eleven_labs_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_labs_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_key: Option<String>,
}

impl AppSettings {
    /// Overlay `update` onto `self`: provided fields replace, absent
    /// fields are kept.
    pub fn merge(&mut self, update: AppSettings) -> Vec<&'static str> {
        let mut saved = Vec::new();

        macro_rules! merge_field {
            ($field:ident, $name:literal) => {
                if let Some(value) = update.$field {
                    self.$field = Some(value);
                    saved.push($name);
                }
            };
        }

        merge_field!(api_base_url, "apiBaseUrl");
        merge_field!(replicate_key, "replicateKey");
        merge_field!(face_model, "faceModel");
        merge_field!(video_model, "videoModel");
        merge_field!(lipsync_provider, "lipsyncProvider");
        merge_field!(eleven_labs_key, "elevenLabsKey");
        merge_field!(sync_labs_key, "syncLabsKey");
        merge_field!(did_key, "didKey");

        saved.sort_unstable();
        saved
    }
}

/// File-backed store for [`AppSettings`].
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store rooted at `{storage_root}/app_settings.json`.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        Self {
            path: storage_root.as_ref().join(SETTINGS_FILE),
        }
    }

    /// Load the stored settings. A missing or unreadable file yields the
    /// default (empty) settings — a corrupt settings file must never take
    /// the service down.
    pub async fn load(&self) -> AppSettings {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to parse settings file");
                AppSettings::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read settings file");
                AppSettings::default()
            }
        }
    }

    /// Merge `update` into the stored settings and persist the result.
    /// Returns the camelCase names of the fields that were written.
    pub async fn save(&self, update: AppSettings) -> Result<Vec<&'static str>, CoreError> {
        let mut current = self.load().await;
        let saved = current.merge(update);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Storage(format!("Failed to create {}: {e}", parent.display())))?;
        }

        let body = serde_json::to_string_pretty(&current)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize settings: {e}")))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| CoreError::Storage(format!("Failed to write {}: {e}", self.path.display())))?;

        Ok(saved)
    }

    /// Effective Replicate token: environment first, stored key second.
    pub async fn replicate_token(&self, config: &GenConfig) -> String {
        if !config.replicate_api_token.trim().is_empty() {
            return config.replicate_api_token.trim().to_string();
        }
        self.load()
            .await
            .replicate_key
            .map(|k| k.trim().to_string())
            .unwrap_or_default()
    }

    /// Effective face model id: stored value first (dashboard overrides),
    /// environment second.
    pub async fn face_model(&self, config: &GenConfig) -> String {
        match self.load().await.face_model {
            Some(model) if !model.trim().is_empty() => model.trim().to_string(),
            _ => config.face_model.clone(),
        }
    }

    /// Effective video model id, same precedence as [`face_model`](Self::face_model).
    pub async fn video_model(&self, config: &GenConfig) -> String {
        match self.load().await.video_model {
            Some(model) if !model.trim().is_empty() => model.trim().to_string(),
            _ => config.video_model.clone(),
        }
    }
}

/// Mask key material for display: `sk-a***f9d2`, fully masked at 8 chars
/// or fewer. `None` passes through.
pub fn mask_key(value: Option<&str>) -> Option<String> {
    let value = value?;
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return Some(String::new());
    }
    if chars.len() <= 8 {
        return Some("*".repeat(chars.len()));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    Some(format!("{head}***{tail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SettingsStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn load_missing_file_returns_defaults() {
        let (_dir, store) = temp_store();
        let settings = store.load().await;
        assert!(settings.replicate_key.is_none());
    }

    #[tokio::test]
    async fn save_merges_only_provided_fields() {
        let (_dir, store) = temp_store();

        store
            .save(AppSettings {
                replicate_key: Some("r8_secret_token_value".into()),
                face_model: Some("google/nano-banana-pro".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let saved = store
            .save(AppSettings {
                face_model: Some("other/model".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(saved, vec!["faceModel"]);

        let settings = store.load().await;
        assert_eq!(settings.face_model.as_deref(), Some("other/model"));
        // Untouched by the second save.
        assert_eq!(settings.replicate_key.as_deref(), Some("r8_secret_token_value"));
    }

    #[tokio::test]
    async fn env_token_wins_over_stored_key() {
        let (_dir, store) = temp_store();
        store
            .save(AppSettings {
                replicate_key: Some("stored-token".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut config = config_with_empty_providers();
        config.replicate_api_token = "env-token".into();
        assert_eq!(store.replicate_token(&config).await, "env-token");

        config.replicate_api_token = String::new();
        assert_eq!(store.replicate_token(&config).await, "stored-token");
    }

    #[tokio::test]
    async fn stored_model_overrides_env_model() {
        let (_dir, store) = temp_store();
        let mut config = config_with_empty_providers();
        config.face_model = "env/model".into();

        assert_eq!(store.face_model(&config).await, "env/model");

        store
            .save(AppSettings {
                face_model: Some("dash/model".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.face_model(&config).await, "dash/model");
    }

    #[test]
    fn mask_key_hides_the_middle() {
        assert_eq!(
            mask_key(Some("r8_abcdefghijklmnop")).as_deref(),
            Some("r8_a***mnop")
        );
        assert_eq!(mask_key(Some("short")).as_deref(), Some("*****"));
        assert_eq!(mask_key(None), None);
    }

    fn config_with_empty_providers() -> GenConfig {
        GenConfig {
            replicate_base_url: "https://api.replicate.com/v1".into(),
            replicate_api_token: String::new(),
            face_model: String::new(),
            video_model: String::new(),
            lipsync_provider: Default::default(),
            elevenlabs_base_url: String::new(),
            elevenlabs_api_key: String::new(),
            sync_labs_base_url: String::new(),
            sync_labs_api_key: String::new(),
            did_base_url: String::new(),
            did_api_key: String::new(),
            storage_path: "./storage".into(),
            max_file_size_mb: 50,
            job_timeout_seconds: 300,
            polling_interval_seconds: 5,
        }
    }
}
