//! State-change events emitted to the presentation layer.
//!
//! The core never renders anything. It emits [`UploadEvent`]s into an
//! [`EventSink`]; a presentation adapter decides how they look.

pub mod broadcast;

pub use broadcast::EventBroadcaster;

use serde::Serialize;
use std::sync::Arc;

use crate::error::{SubmitError, ValidationError};
use crate::models::JobHandle;

/// One-way notification from the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    /// File refused, no session was created.
    ValidationRejected { reason: ValidationError },
    /// Submission round trip started.
    UploadStarted { file_name: String, size: u64 },
    /// Submission failed; a `SessionReset` follows.
    UploadFailed { reason: SubmitError },
    /// New progress figure, with remaining minutes when an estimate exists.
    ProgressUpdated {
        percent: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta_minutes: Option<u64>,
    },
    /// Job finished; the handle stays retrievable until acknowledged.
    Completed { job_handle: JobHandle },
    /// Poll budget exhausted; a `SessionReset` follows.
    ConnectionLost,
    /// Session is back to idle.
    SessionReset,
}

impl UploadEvent {
    /// Whether the event reports a failure to the user.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UploadEvent::ValidationRejected { .. }
                | UploadEvent::UploadFailed { .. }
                | UploadEvent::ConnectionLost
        )
    }
}

/// Receiver of core events. Fire-and-forget: `emit` must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UploadEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: UploadEvent) {
        (**self).emit(event)
    }
}
