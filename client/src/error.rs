//! Error types for the upload/progress state machine.
//!
//! One enum per layer, from the leaf outwards:
//!
//! - [`ValidationError`] - file rejected before any session exists
//! - [`TransportError`] - a single round trip failed (submit or poll)
//! - [`SubmitError`] - the submission attempt is unusable
//! - [`UploadError`] - top-level coordinator errors
//! - [`ConfigError`] - invalid configuration overrides
//!
//! `From` conversions let `?` cross layer boundaries. The errors carried
//! inside [`crate::events::UploadEvent`] are `Clone + Serialize` so they can
//! travel to any presentation adapter.

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Validation Errors
// =============================================================================

/// Reasons a candidate file is refused before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Declared MIME type is not in the accepted set.
    #[error("Unsupported file type '{mime_type}'. Please upload only MP4, AVI, MOV, or WMV files.")]
    UnsupportedType { mime_type: String },

    /// File is larger than the configured maximum.
    #[error("File size ({size_mb}MB) exceeds maximum limit of {max_mb}MB.")]
    TooLarge { size_mb: u64, max_mb: u64 },
}

// =============================================================================
// Transport Errors
// =============================================================================

/// A single request/response round trip failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    /// Server answered with a non-success status.
    #[error("Server responded with HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Connection refused, reset, timed out...
    #[error("Network error: {message}")]
    Network { message: String },

    /// Body could not be decoded.
    #[error("Malformed response: {message}")]
    Malformed { message: String },

    /// Local file could not be read or written.
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io {
            message: e.to_string(),
        }
    }
}

// =============================================================================
// Submission Errors
// =============================================================================

/// Why a submission attempt failed. Always fatal to the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitError {
    /// The round trip itself failed.
    #[error("Upload failed: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    /// Server accepted the request but reported an error in the body.
    #[error("Server reported an error: {message}")]
    ServerReported { message: String },

    /// Success reply without a job handle to monitor.
    #[error("No processed video URL received")]
    MissingArtifactReference,
}

// =============================================================================
// Coordinator Errors (top-level)
// =============================================================================

/// Errors returned by [`crate::UploadCoordinator`] operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    /// File refused by the validator.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Submission failed; the session has been reset.
    #[error("{0}")]
    Submit(#[from] SubmitError),

    /// Another session is still validating, uploading or monitoring.
    #[error("An upload is already in progress")]
    AlreadyInProgress,

    /// Poll budget exhausted; the session has been reset.
    #[error("Lost connection to server. Please try again.")]
    ConnectionLost,

    /// `monitor` called without a submitted job.
    #[error("No job is being monitored")]
    NotMonitoring,

    /// `acknowledge` called before the job completed.
    #[error("No completed job to acknowledge")]
    NotCompleted,

    /// Retrieving the finished artifact failed.
    #[error("Download failed: {0}")]
    Download(TransportError),

    /// Teardown was requested while the operation was pending.
    #[error("Upload cancelled by teardown")]
    Cancelled,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration override.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable present but unparseable.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },

    /// Accepted type list resolved to nothing.
    #[error("At least one accepted MIME type is required")]
    NoAcceptedTypes,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for transport round trips.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for coordinator operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
