//! Session lifecycle: validate, submit, monitor, complete or fail, reset.
//!
//! ```text
//!            submit                  handle              progress == 100
//!   Idle ──────────▶ Uploading ───────────────▶ Monitoring ─────────────▶ Completed
//!    ▲                   │                          │                         │
//!    │                   │ transport / server error │ retry budget exhausted  │ acknowledge
//!    │                   ▼                          ▼                         │ (+ grace)
//!    └────────────── Failed ◀───────────────────────┘                         │
//!    └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All transitions happen on the task that drives the coordinator; the only
//! suspension points are the submit round trip, each poll round trip and the
//! wait between ticks. Teardown is raced against every one of them.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::poller::{ProgressPoller, TickOutcome};
use crate::config::UploadConfig;
use crate::error::{SubmitError, TransportResult, UploadError, UploadResult};
use crate::events::{EventSink, UploadEvent};
use crate::models::{JobHandle, SessionStatus, SubmitReply, UploadSession, VideoFile};
use crate::transport::Transport;
use crate::validation::FileValidator;

/// Drives one upload session at a time.
pub struct UploadCoordinator<T, S> {
    config: UploadConfig,
    validator: FileValidator,
    poller: ProgressPoller,
    transport: T,
    sink: S,
    session: UploadSession,
    cancel: CancellationToken,
}

impl<T: Transport, S: EventSink> UploadCoordinator<T, S> {
    pub fn new(config: UploadConfig, transport: T, sink: S) -> Self {
        Self {
            validator: FileValidator::from_config(&config),
            poller: ProgressPoller::from_config(&config),
            config,
            transport,
            sink,
            session: UploadSession::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the poll timer is armed.
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Token the host cancels on shutdown. Cancelling it stops polling and
    /// resets the session at the next suspension point.
    pub fn teardown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The retrievable result, while the job is completed and not yet
    /// acknowledged.
    pub fn artifact(&self) -> Option<&JobHandle> {
        match self.session.status {
            SessionStatus::Completed => self.session.job_handle.as_ref(),
            _ => None,
        }
    }

    /// Validate and submit `file`. On success the session is `Monitoring`
    /// and the poll timer is armed.
    pub async fn submit(&mut self, file: VideoFile) -> UploadResult<JobHandle> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        if self.session.status.is_busy() {
            log::warn!(
                "Refusing {}: session {:?} is {:?}",
                file.name,
                self.session.session_id,
                self.session.status
            );
            return Err(UploadError::AlreadyInProgress);
        }
        if self.session.status == SessionStatus::Completed {
            log::info!("New upload requested, releasing previous artifact");
            self.reset();
        }

        self.session.status = SessionStatus::Validating;
        if let Err(reason) = self.validator.validate(&file) {
            self.session.status = SessionStatus::Idle;
            self.sink.emit(UploadEvent::ValidationRejected {
                reason: reason.clone(),
            });
            return Err(reason.into());
        }

        let session_id = Uuid::new_v4();
        self.session.status = SessionStatus::Uploading;
        self.session.session_id = Some(session_id);
        self.session.file_name = Some(file.name.clone());
        self.session.file_size = file.size;
        self.session.started_at = Some(Instant::now());
        log::info!("[{}] Uploading {} ({} bytes)", session_id, file.name, file.size);
        self.sink.emit(UploadEvent::UploadStarted {
            file_name: file.name.clone(),
            size: file.size,
        });

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            response = self.transport.submit(&file) => Some(response),
        };
        let Some(response) = response else {
            self.teardown();
            return Err(UploadError::Cancelled);
        };

        let job = match interpret_submission(response) {
            Ok(job) => job,
            Err(reason) => {
                log::error!("[{}] {}", session_id, reason);
                self.session.status = SessionStatus::Failed;
                self.sink.emit(UploadEvent::UploadFailed {
                    reason: reason.clone(),
                });
                self.reset();
                return Err(reason.into());
            }
        };

        log::info!("[{}] Accepted as {}, monitoring progress", session_id, job);
        self.session.job_handle = Some(job.clone());
        self.session.status = SessionStatus::Monitoring;
        self.poller.start(&mut self.session);

        Ok(job)
    }

    /// Poll until the job completes, the connection is lost, or teardown.
    pub async fn monitor(&mut self) -> UploadResult<JobHandle> {
        if self.session.status != SessionStatus::Monitoring {
            return Err(UploadError::NotMonitoring);
        }
        let job = self
            .session
            .job_handle
            .clone()
            .ok_or(UploadError::NotMonitoring)?;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.teardown();
                    return Err(UploadError::Cancelled);
                }
                _ = self.poller.tick() => {}
            }

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.teardown();
                    return Err(UploadError::Cancelled);
                }
                response = self.transport.poll(&job) => response,
            };

            match self
                .poller
                .observe(&mut self.session, response, Instant::now())
            {
                TickOutcome::Progress {
                    percent,
                    eta_minutes,
                } => {
                    self.sink.emit(UploadEvent::ProgressUpdated {
                        percent,
                        eta_minutes,
                    });
                }
                TickOutcome::NoUpdate | TickOutcome::Retrying { .. } | TickOutcome::Ignored => {}
                TickOutcome::ConnectionLost => {
                    self.session.status = SessionStatus::Failed;
                    self.sink.emit(UploadEvent::ConnectionLost);
                    self.reset();
                    return Err(UploadError::ConnectionLost);
                }
                TickOutcome::Completed => {
                    log::info!("[{:?}] Processing completed", self.session.session_id);
                    self.session.status = SessionStatus::Completed;
                    self.sink.emit(UploadEvent::Completed {
                        job_handle: job.clone(),
                    });
                    return Ok(job);
                }
            }
        }
    }

    /// Submit then monitor.
    pub async fn process(&mut self, file: VideoFile) -> UploadResult<JobHandle> {
        self.submit(file).await?;
        self.monitor().await
    }

    /// Release a completed job. The session resets after the configured
    /// grace delay so a retrieval already under way is not truncated.
    pub async fn acknowledge(&mut self) -> UploadResult<JobHandle> {
        let job = self
            .artifact()
            .cloned()
            .ok_or(UploadError::NotCompleted)?;

        let grace = self.config.completion_grace;
        if !grace.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(grace) => {}
            }
        }

        self.reset();
        Ok(job)
    }

    /// Host shutdown: stop the timer and drop the session. Further
    /// submissions are refused.
    pub fn teardown(&mut self) {
        self.cancel.cancel();
        self.poller.stop();
        if !self.session.is_idle_baseline() {
            log::info!("[{:?}] Torn down", self.session.session_id);
            self.session.reset();
            self.sink.emit(UploadEvent::SessionReset);
        }
    }

    fn reset(&mut self) {
        self.poller.stop();
        self.session.reset();
        self.sink.emit(UploadEvent::SessionReset);
    }
}

fn interpret_submission(response: TransportResult<SubmitReply>) -> Result<JobHandle, SubmitError> {
    let reply = response?;

    if let Some(message) = reply.error.filter(|m| !m.trim().is_empty()) {
        return Err(SubmitError::ServerReported { message });
    }

    reply
        .job_handle
        .filter(|h| !h.trim().is_empty())
        .map(JobHandle::new)
        .ok_or(SubmitError::MissingArtifactReference)
}
