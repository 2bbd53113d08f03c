//! On-disk layout for produced assets and uploads.
//!
//! Results are written under a per-kind subdirectory of the storage root
//! and served back to clients as `/storage/...` URLs.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::JobType;

/// Subdirectory for face generation results.
pub const DIR_FACES: &str = "faces";
/// Subdirectory for video generation results.
pub const DIR_VIDEOS: &str = "videos";
/// Subdirectory for lip sync results and intermediate audio.
pub const DIR_LIPSYNC: &str = "lipsync";
/// Subdirectory for raw uploads kept for debugging.
pub const DIR_UPLOADS: &str = "uploads";

/// URL prefix under which the storage root is served.
pub const STORAGE_URL_PREFIX: &str = "/storage";

/// Storage root plus helpers for result placement.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root and all per-kind subdirectories.
    pub async fn ensure_dirs(&self) -> Result<(), CoreError> {
        for dir in [DIR_FACES, DIR_VIDEOS, DIR_LIPSYNC, DIR_UPLOADS] {
            let path = self.root.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| CoreError::Storage(format!("Failed to create {}: {e}", path.display())))?;
        }
        Ok(())
    }

    /// Subdirectory name for a job type's results.
    pub fn dir_for(job_type: JobType) -> &'static str {
        match job_type {
            JobType::Face => DIR_FACES,
            JobType::Video => DIR_VIDEOS,
            JobType::Lipsync => DIR_LIPSYNC,
        }
    }

    /// Write `bytes` as the result file for a job, returning the public
    /// `/storage/...` URL.
    pub async fn save_result(
        &self,
        job_type: JobType,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, CoreError> {
        let dir = Self::dir_for(job_type);
        let path = self.root.join(dir).join(file_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CoreError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved result file");
        Ok(format!("{STORAGE_URL_PREFIX}/{dir}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_dirs_creates_the_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();

        for sub in [DIR_FACES, DIR_VIDEOS, DIR_LIPSYNC, DIR_UPLOADS] {
            assert!(dir.path().join(sub).is_dir(), "{sub} should exist");
        }
    }

    #[tokio::test]
    async fn save_result_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();

        let url = layout
            .save_result(JobType::Face, "job-1.png", b"fake-png")
            .await
            .unwrap();

        assert_eq!(url, "/storage/faces/job-1.png");
        let on_disk = std::fs::read(dir.path().join("faces/job-1.png")).unwrap();
        assert_eq!(on_disk, b"fake-png");
    }
}
