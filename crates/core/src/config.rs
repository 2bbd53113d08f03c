//! Generation configuration loaded from environment variables.
//!
//! Covers provider credentials, model selection, storage, and job timing.
//! All fields have defaults suitable for local development; production
//! deployments override via environment variables (a `.env` file is
//! honored by the binaries).

use crate::error::CoreError;

/// Which lip sync provider drives `POST /api/lipsync/generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LipSyncProvider {
    #[default]
    ElevenLabs,
    SyncLabs,
    DId,
}

impl LipSyncProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LipSyncProvider::ElevenLabs => "elevenlabs",
            LipSyncProvider::SyncLabs => "sync_labs",
            LipSyncProvider::DId => "d-id",
        }
    }
}

impl std::fmt::Display for LipSyncProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LipSyncProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elevenlabs" => Ok(LipSyncProvider::ElevenLabs),
            "sync_labs" => Ok(LipSyncProvider::SyncLabs),
            "d-id" => Ok(LipSyncProvider::DId),
            other => Err(CoreError::Configuration(format!(
                "Unknown lip sync provider: '{other}'. Valid providers: elevenlabs, sync_labs, d-id"
            ))),
        }
    }
}

/// Provider and pipeline configuration.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Replicate REST API base URL.
    pub replicate_base_url: String,
    /// Replicate API token. May be empty; the settings store is consulted
    /// as a fallback at request time.
    pub replicate_api_token: String,
    /// Replicate model id for face generation (e.g. `google/nano-banana-pro`).
    pub face_model: String,
    /// Replicate model id for video generation.
    pub video_model: String,

    /// Lip sync provider selection.
    pub lipsync_provider: LipSyncProvider,
    pub elevenlabs_base_url: String,
    pub elevenlabs_api_key: String,
    pub sync_labs_base_url: String,
    pub sync_labs_api_key: String,
    pub did_base_url: String,
    pub did_api_key: String,

    /// Root directory for produced assets and uploads.
    pub storage_path: String,
    /// Upper bound on a single uploaded file, in megabytes.
    pub max_file_size_mb: u64,

    /// Per-job provider polling budget, in seconds.
    pub job_timeout_seconds: u64,
    /// Delay between provider status polls, in seconds.
    pub polling_interval_seconds: u64,
}

impl GenConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                         |
    /// |----------------------------|---------------------------------|
    /// | `REPLICATE_BASE_URL`       | `https://api.replicate.com/v1`  |
    /// | `REPLICATE_API_TOKEN`      | (empty)                         |
    /// | `FACE_MODEL`               | (empty)                         |
    /// | `VIDEO_MODEL`              | (empty)                         |
    /// | `LIPSYNC_PROVIDER`         | `elevenlabs`                    |
    /// | `ELEVENLABS_BASE_URL`      | `https://api.elevenlabs.io/v1`  |
    /// | `ELEVENLABS_API_KEY`       | (empty)                         |
    /// | `SYNC_LABS_BASE_URL`       | `https://api.synclabs.so/v2`    |
    /// | `SYNC_LABS_API_KEY`        | (empty)                         |
    /// | `DID_BASE_URL`             | `https://api.d-id.com`          |
    /// | `DID_API_KEY`              | (empty)                         |
    /// | `STORAGE_PATH`             | `./storage`                     |
    /// | `MAX_FILE_SIZE_MB`         | `50`                            |
    /// | `JOB_TIMEOUT_SECONDS`      | `300`                           |
    /// | `POLLING_INTERVAL_SECONDS` | `5`                             |
    pub fn from_env() -> Self {
        let lipsync_provider = std::env::var("LIPSYNC_PROVIDER")
            .unwrap_or_else(|_| "elevenlabs".into())
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to elevenlabs");
                LipSyncProvider::ElevenLabs
            });

        Self {
            replicate_base_url: env_or("REPLICATE_BASE_URL", "https://api.replicate.com/v1"),
            replicate_api_token: env_or("REPLICATE_API_TOKEN", ""),
            face_model: env_or("FACE_MODEL", ""),
            video_model: env_or("VIDEO_MODEL", ""),
            lipsync_provider,
            elevenlabs_base_url: env_or("ELEVENLABS_BASE_URL", "https://api.elevenlabs.io/v1"),
            elevenlabs_api_key: env_or("ELEVENLABS_API_KEY", ""),
            sync_labs_base_url: env_or("SYNC_LABS_BASE_URL", "https://api.synclabs.so/v2"),
            sync_labs_api_key: env_or("SYNC_LABS_API_KEY", ""),
            did_base_url: env_or("DID_BASE_URL", "https://api.d-id.com"),
            did_api_key: env_or("DID_API_KEY", ""),
            storage_path: env_or("STORAGE_PATH", "./storage"),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", 50),
            job_timeout_seconds: env_parse("JOB_TIMEOUT_SECONDS", 300),
            polling_interval_seconds: env_parse("POLLING_INTERVAL_SECONDS", 5),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lipsync_provider_parses_known_values() {
        assert_eq!(
            "sync_labs".parse::<LipSyncProvider>().unwrap(),
            LipSyncProvider::SyncLabs
        );
        assert_eq!(
            "d-id".parse::<LipSyncProvider>().unwrap(),
            LipSyncProvider::DId
        );
        assert!("heygen".parse::<LipSyncProvider>().is_err());
    }
}
