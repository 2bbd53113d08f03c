//! In-memory job registry.
//!
//! [`JobStore`] is the process-local source of truth for all jobs. It is
//! shared via `Arc<JobStore>` between the HTTP handlers (readers) and the
//! pipeline tasks (the only writers). Jobs live for the lifetime of the
//! process; there is no durable backing store.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{Job, JobId, JobStatus, JobType};

/// Partial update applied to a job by its owning pipeline task.
///
/// Only the populated fields are written; everything else is left as-is.
/// Terminal statuses stamp `completed_at`.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub provider_job_id: Option<String>,
}

impl JobUpdate {
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn result_url(mut self, url: impl Into<String>) -> Self {
        self.result_url = Some(url.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn provider_job_id(mut self, id: impl Into<String>) -> Self {
        self.provider_job_id = Some(id.into());
        self
    }
}

/// Thread-safe in-memory job storage.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job. Returns a snapshot of the stored record.
    pub async fn create(&self, job: Job) -> Job {
        let mut jobs = self.jobs.write().await;
        tracing::info!(job_id = %job.id, job_type = %job.job_type, "Job created");
        jobs.insert(job.id.clone(), job.clone());
        job
    }

    /// Look up a job by id.
    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Apply a partial update to a job, returning the updated record.
    ///
    /// Returns `None` if the job does not exist. A status change away from
    /// a terminal state is ignored (and logged): nothing leaves
    /// `completed`/`failed`.
    pub async fn update(&self, job_id: &str, update: JobUpdate) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id)?;

        if let Some(status) = update.status {
            if job.status.is_terminal() && status != job.status {
                tracing::warn!(
                    job_id,
                    current = %job.status,
                    requested = %status,
                    "Ignoring status change out of a terminal state",
                );
            } else {
                job.status = status;
                if status.is_terminal() && job.completed_at.is_none() {
                    job.completed_at = Some(Utc::now());
                }
            }
        }

        if let Some(progress) = update.progress {
            job.progress = progress.min(100);
        }
        if let Some(message) = update.message {
            job.message = message;
        }
        if let Some(result_url) = update.result_url {
            job.result_url = Some(result_url);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        if let Some(provider_job_id) = update.provider_job_id {
            job.provider_job_id = Some(provider_job_id);
        }

        tracing::info!(
            job_id,
            status = %job.status,
            progress = job.progress,
            "Job updated",
        );

        Some(job.clone())
    }

    /// List jobs, newest first, optionally filtered by type.
    pub async fn list(&self, job_type: Option<JobType>) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut listed: Vec<Job> = jobs
            .values()
            .filter(|j| job_type.is_none_or(|t| j.job_type == t))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed
    }
}
