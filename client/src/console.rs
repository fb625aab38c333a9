//! Terminal presentation of upload events.
//!
//! Human mode prints one timestamped line per event. A failure message stays
//! the latest line for the configured error-display window: progress lines
//! arriving during that window are dropped. JSON mode prints every event as
//! one JSON object per line, with no suppression.

use chrono::{Local, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::events::UploadEvent;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a UploadEvent,
}

pub struct ConsoleRenderer {
    json: bool,
    error_display: Duration,
    suppress_until: Option<Instant>,
}

impl ConsoleRenderer {
    pub fn new(json: bool, error_display: Duration) -> Self {
        Self {
            json,
            error_display,
            suppress_until: None,
        }
    }

    /// Format one event, or `None` when nothing should be printed.
    pub fn render(&mut self, event: &UploadEvent, now: Instant) -> Option<String> {
        if self.json {
            let line = JsonLine {
                timestamp: Utc::now().to_rfc3339(),
                event,
            };
            return match serde_json::to_string(&line) {
                Ok(line) => Some(line),
                Err(e) => {
                    log::warn!("Failed to serialize event: {}", e);
                    None
                }
            };
        }

        if event.is_failure() {
            self.suppress_until = Some(now + self.error_display);
        } else if matches!(event, UploadEvent::ProgressUpdated { .. })
            && self.suppress_until.is_some_and(|until| now < until)
        {
            return None;
        }

        let text = match event {
            UploadEvent::ValidationRejected { reason } => format!("❌ {}", reason),
            UploadEvent::UploadStarted { file_name, size } => format!(
                "📤 Uploading {} ({:.1} MB)",
                file_name,
                *size as f64 / BYTES_PER_MB
            ),
            UploadEvent::UploadFailed { reason } => format!("❌ {}", reason),
            UploadEvent::ProgressUpdated {
                percent,
                eta_minutes: Some(eta),
            } => format!("⏳ Processing: {}% (~{} min remaining)", percent, eta),
            UploadEvent::ProgressUpdated { percent, .. } => format!("⏳ Processing: {}%", percent),
            UploadEvent::Completed { job_handle } => format!("✅ Processing complete: {}", job_handle),
            UploadEvent::ConnectionLost => "❌ Lost connection to server. Please try again.".to_string(),
            UploadEvent::SessionReset => return None,
        };

        Some(format!("[{}] {}", Local::now().format("%H:%M:%S"), text))
    }

    /// Print events until every sender is gone.
    pub async fn run(mut self, receiver: broadcast::Receiver<UploadEvent>) {
        let mut stream = BroadcastStream::new(receiver);

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    if let Some(line) = self.render(&event, Instant::now()) {
                        println!("{}", line);
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    log::warn!("Console fell behind, {} events skipped", skipped);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::events::{EventBroadcaster, EventSink};
    use crate::models::JobHandle;

    fn progress(percent: u8) -> UploadEvent {
        UploadEvent::ProgressUpdated {
            percent,
            eta_minutes: None,
        }
    }

    #[test]
    fn test_human_lines() {
        let mut renderer = ConsoleRenderer::new(false, Duration::from_secs(5));
        let now = Instant::now();

        let line = renderer
            .render(
                &UploadEvent::ProgressUpdated {
                    percent: 42,
                    eta_minutes: Some(3),
                },
                now,
            )
            .unwrap();
        assert!(line.starts_with('['));
        assert!(line.ends_with("⏳ Processing: 42% (~3 min remaining)"));

        let line = renderer.render(&progress(50), now).unwrap();
        assert!(line.ends_with("⏳ Processing: 50%"));

        let line = renderer
            .render(
                &UploadEvent::Completed {
                    job_handle: JobHandle::new("/download/out.mp4"),
                },
                now,
            )
            .unwrap();
        assert!(line.ends_with("Processing complete: /download/out.mp4"));

        assert_eq!(renderer.render(&UploadEvent::SessionReset, now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_suppresses_progress_for_display_window() {
        let mut renderer = ConsoleRenderer::new(false, Duration::from_secs(5));
        let rejected = UploadEvent::ValidationRejected {
            reason: ValidationError::UnsupportedType {
                mime_type: "text/plain".into(),
            },
        };

        let failed_at = Instant::now();
        let line = renderer.render(&rejected, failed_at).unwrap();
        assert!(line.contains("Unsupported file type 'text/plain'"));

        assert_eq!(renderer.render(&progress(10), failed_at + Duration::from_secs(4)), None);
        assert!(renderer
            .render(
                &UploadEvent::UploadStarted {
                    file_name: "a.mp4".into(),
                    size: 1024 * 1024
                },
                failed_at + Duration::from_secs(4)
            )
            .is_some());
        assert!(renderer
            .render(&progress(20), failed_at + Duration::from_secs(5))
            .is_some());
    }

    #[test]
    fn test_json_lines_carry_every_event() {
        let mut renderer = ConsoleRenderer::new(true, Duration::from_secs(5));
        let now = Instant::now();

        renderer.render(&UploadEvent::ConnectionLost, now).unwrap();
        let line = renderer.render(&progress(30), now).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "progress_updated");
        assert_eq!(value["percent"], 30);
        assert!(value["timestamp"].is_string());
        assert!(value.get("eta_minutes").is_none());

        let line = renderer.render(&UploadEvent::SessionReset, now).unwrap();
        assert!(line.contains("\"session_reset\""));
    }

    #[tokio::test]
    async fn test_run_ends_when_senders_drop() {
        let broadcaster = EventBroadcaster::new();
        let task = tokio::spawn(ConsoleRenderer::new(true, Duration::ZERO).run(broadcaster.subscribe()));

        broadcaster.emit(UploadEvent::SessionReset);
        drop(broadcaster);

        task.await.unwrap();
    }
}
