//! Domain models for the upload/progress state machine.
//!
//! - [`VideoFile`] - the candidate file (name, declared type, size, location)
//! - [`JobHandle`] - opaque reference returned by a successful submission
//! - [`SessionStatus`] / [`UploadSession`] - the single active session
//! - [`SubmitReply`] / [`PollReply`] - transport replies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TransportResult;
use crate::validation::mime_for_path;

// =============================================================================
// Files
// =============================================================================

/// A file picked for processing.
///
/// Validation only looks at `mime_type` and `size`; `path` is what the
/// transport reads when it sends the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// File name shown to the server and in events
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// Location on disk
    pub path: PathBuf,
}

impl VideoFile {
    /// Describe a file without touching the filesystem.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            mime_type: mime_type.into(),
            size,
        }
    }

    /// Describe a file on disk, inferring its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();

        Ok(Self {
            name,
            mime_type: mime_for_path(path).to_string(),
            size: metadata.len(),
            path: path.to_path_buf(),
        })
    }
}

// =============================================================================
// Job Handle
// =============================================================================

/// Opaque job reference returned by the server.
///
/// With the bundled HTTP transport this is the (usually relative) URL of the
/// processed artifact, e.g. `/processed/processed_clip.mp4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Lifecycle state of the upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Validating,
    Uploading,
    Monitoring,
    Completed,
    Failed,
}

impl SessionStatus {
    /// States in which a new submission must be refused.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SessionStatus::Validating | SessionStatus::Uploading | SessionStatus::Monitoring
        )
    }
}

/// The single upload session owned by the coordinator.
///
/// `status`, `file_size`, `started_at` and `job_handle` are written by the
/// coordinator; `last_progress` and `retry_count` by the poller.
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    pub status: SessionStatus,
    /// Correlates log lines of one job
    pub session_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub file_size: u64,
    pub started_at: Option<Instant>,
    /// Highest progress seen, 0..=100, never decreases within a session
    pub last_progress: f64,
    /// Consecutive failed polls
    pub retry_count: u32,
    pub job_handle: Option<JobHandle>,
}

impl UploadSession {
    /// Back to the idle baseline.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether every field holds its idle default.
    pub fn is_idle_baseline(&self) -> bool {
        self.status == SessionStatus::Idle
            && self.session_id.is_none()
            && self.file_name.is_none()
            && self.file_size == 0
            && self.started_at.is_none()
            && self.last_progress == 0.0
            && self.retry_count == 0
            && self.job_handle.is_none()
    }
}

// =============================================================================
// Transport Replies
// =============================================================================

/// Body of a successful submission round trip.
///
/// The processing server answers with
/// `{"success": true, "message": "...", "processed_video": "/processed/x.mp4"}`
/// or `{"error": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitReply {
    #[serde(default, alias = "processed_video", alias = "jobHandle")]
    pub job_handle: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitReply {
    pub fn accepted(job_handle: impl Into<String>) -> Self {
        Self {
            job_handle: Some(job_handle.into()),
            ..Self::default()
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Body of a successful progress check. Missing `progress` means
/// "no update this tick".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PollReply {
    #[serde(default)]
    pub progress: Option<f64>,
}

impl PollReply {
    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
        }
    }

    pub fn empty() -> Self {
        Self { progress: None }
    }
}
