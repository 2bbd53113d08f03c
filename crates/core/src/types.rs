//! Job data model and request types.
//!
//! A [`Job`] is a server-tracked asynchronous generation task. Jobs are
//! created by a submission endpoint, mutated only by the pipeline that
//! owns them, and observed by clients through [`JobStatusResponse`]
//! snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Opaque job identifier (UUID v4, assigned at submission time).
pub type JobId = String;

// ---------------------------------------------------------------------------
// JobType
// ---------------------------------------------------------------------------

/// The three generation task kinds. Fixed at creation, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Face,
    Video,
    Lipsync,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Face => "face",
            JobType::Video => "video",
            JobType::Lipsync => "lipsync",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" => Ok(JobType::Face),
            "video" => Ok(JobType::Video),
            "lipsync" => Ok(JobType::Lipsync),
            other => Err(CoreError::Validation(format!(
                "Unknown job type: '{other}'. Valid types: face, video, lipsync"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Job lifecycle state.
///
/// Transitions are monotonic: `pending -> processing -> {completed|failed}`.
/// Nothing leaves a terminal state.
///
/// Deserialization is lossy on purpose: a status string this build does
/// not recognize becomes [`JobStatus::Unknown`], which is non-terminal, so
/// clients keep polling across server upgrades instead of erroring out.
/// `Unknown` is never produced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Parse a wire status string, mapping unrecognized values to `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    /// `completed` and `failed` are terminal: no further transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::from_wire(&s))
    }
}

// ---------------------------------------------------------------------------
// Aspect ratios and voices
// ---------------------------------------------------------------------------

/// Aspect ratio presets accepted by the face model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "3:4")]
    ThreeFour,
    #[serde(rename = "9:21")]
    NineTwentyOne,
    #[serde(rename = "21:9")]
    TwentyOneNine,
    #[serde(rename = "2:3")]
    TwoThree,
    #[serde(rename = "3:2")]
    ThreeTwo,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Auto => "auto",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::FourThree => "4:3",
            AspectRatio::ThreeFour => "3:4",
            AspectRatio::NineTwentyOne => "9:21",
            AspectRatio::TwentyOneNine => "21:9",
            AspectRatio::TwoThree => "2:3",
            AspectRatio::ThreeTwo => "3:2",
        }
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(AspectRatio::Auto),
            "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            "4:3" => Ok(AspectRatio::FourThree),
            "3:4" => Ok(AspectRatio::ThreeFour),
            "9:21" => Ok(AspectRatio::NineTwentyOne),
            "21:9" => Ok(AspectRatio::TwentyOneNine),
            "2:3" => Ok(AspectRatio::TwoThree),
            "3:2" => Ok(AspectRatio::ThreeTwo),
            other => Err(CoreError::Validation(format!(
                "Unknown aspect ratio: '{other}'"
            ))),
        }
    }
}

/// Aspect ratios accepted by the video model (a strict subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoAspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl VideoAspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAspectRatio::Landscape => "16:9",
            VideoAspectRatio::Portrait => "9:16",
        }
    }
}

impl std::str::FromStr for VideoAspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(VideoAspectRatio::Landscape),
            "9:16" => Ok(VideoAspectRatio::Portrait),
            other => Err(CoreError::Validation(format!(
                "Unknown video aspect ratio: '{other}'. Valid ratios: 16:9, 9:16"
            ))),
        }
    }
}

/// Voice presets for lip sync. Mapped to provider-specific voice ids by
/// each provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    #[default]
    FemaleYoung,
    FemaleMature,
    FemaleSoft,
    MaleYoung,
    MaleDeep,
}

impl VoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceType::FemaleYoung => "female_young",
            VoiceType::FemaleMature => "female_mature",
            VoiceType::FemaleSoft => "female_soft",
            VoiceType::MaleYoung => "male_young",
            VoiceType::MaleDeep => "male_deep",
        }
    }
}

impl std::str::FromStr for VoiceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female_young" => Ok(VoiceType::FemaleYoung),
            "female_mature" => Ok(VoiceType::FemaleMature),
            "female_soft" => Ok(VoiceType::FemaleSoft),
            "male_young" => Ok(VoiceType::MaleYoung),
            "male_deep" => Ok(VoiceType::MaleDeep),
            other => Err(CoreError::Validation(format!(
                "Unknown voice type: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A tracked generation task.
///
/// Owned by the [`JobStore`](crate::store::JobStore); mutated only through
/// [`JobStore::update`](crate::store::JobStore::update) by the pipeline
/// task driving the job. Everything else reads snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    /// Percent complete, 0-100.
    pub progress: u8,
    /// Human-readable status line, replaced wholesale on each update.
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Stamped when the job first reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Locator of the produced asset; present only when completed.
    pub result_url: Option<String>,
    /// Failure cause; present only when failed.
    pub error: Option<String>,
    /// Remote provider's own id for this task.
    pub provider_job_id: Option<String>,
    /// Free-form request context (prompt, aspect ratio, provider, ...).
    pub metadata: serde_json::Value,
}

impl Job {
    /// Create a pending job with a fresh UUID v4 id.
    pub fn new(job_type: JobType, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type,
            status: JobStatus::Pending,
            progress: 0,
            message: message.into(),
            created_at: Utc::now(),
            completed_at: None,
            result_url: None,
            error: None,
            provider_job_id: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    /// Attach request metadata (builder style).
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire snapshots
// ---------------------------------------------------------------------------

/// Full job record as served by `GET /api/jobs/{job_id}` and consumed by
/// the polling client.
///
/// `created_at`/`completed_at` are optional on the way in so the client
/// also accepts minimal status bodies from older servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            job_type: job.job_type,
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            created_at: Some(job.created_at),
            completed_at: job.completed_at,
            result_url: job.result_url.clone(),
            error: job.error.clone(),
        }
    }
}

/// Condensed record for job listings and per-type history endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub result_url: Option<String>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            job_type: job.job_type,
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            created_at: job.created_at,
            result_url: job.result_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Submission requests
// ---------------------------------------------------------------------------

/// Validated face generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceGenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

impl FaceGenerationRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation("Prompt must not be empty".into()));
        }
        Ok(())
    }
}

/// Validated video generation request. The start image travels separately
/// as raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    /// Optional model-specific mode string.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub aspect_ratio: VideoAspectRatio,
}

/// Validated lip sync request. The source video travels separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LipSyncRequest {
    pub text: String,
    #[serde(default)]
    pub voice_type: VoiceType,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Upper bound on lip sync script length, in characters.
pub const MAX_LIPSYNC_TEXT_LEN: usize = 5000;

impl LipSyncRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.text.trim().is_empty() {
            return Err(CoreError::Validation("Text cannot be empty".into()));
        }
        if self.text.chars().count() > MAX_LIPSYNC_TEXT_LEN {
            return Err(CoreError::Validation(format!(
                "Text too long (max {MAX_LIPSYNC_TEXT_LEN} characters)"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
