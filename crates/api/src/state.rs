use std::sync::Arc;

use modelgen_core::settings::SettingsStore;
use modelgen_core::storage::StorageLayout;
use modelgen_core::store::JobStore;
use modelgen_pipeline::{FaceService, LipSyncService, VideoService};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// In-memory job registry.
    pub store: Arc<JobStore>,
    /// Dashboard settings store (JSON file under the storage root).
    pub settings: Arc<SettingsStore>,
    /// On-disk storage layout for produced assets.
    pub storage: StorageLayout,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Face generation service.
    pub face: Arc<FaceService>,
    /// Video generation service.
    pub video: Arc<VideoService>,
    /// Lip sync service.
    pub lipsync: Arc<LipSyncService>,
}

impl AppState {
    /// Wire up stores and services from a configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        let store = Arc::new(JobStore::new());
        let settings = Arc::new(SettingsStore::new(&config.gen.storage_path));
        let storage = StorageLayout::new(&config.gen.storage_path);
        let gen_config = Arc::new(config.gen.clone());

        let ctx = modelgen_pipeline::PipelineContext {
            store: Arc::clone(&store),
            settings: Arc::clone(&settings),
            storage: storage.clone(),
            config: gen_config,
            http: reqwest::Client::new(),
        };

        Self {
            store,
            settings,
            storage,
            config: Arc::new(config),
            face: Arc::new(FaceService::new(ctx.clone())),
            video: Arc::new(VideoService::new(ctx.clone())),
            lipsync: Arc::new(LipSyncService::new(ctx)),
        }
    }
}
