//! Fan-out of upload events to any number of presentation adapters.
//!
//! Wraps a tokio broadcast channel. Every event is also written to the log,
//! so a headless host still leaves a trace of the session.

use tokio::sync::broadcast;

use super::{EventSink, UploadEvent};

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 100;

/// Broadcasts upload events to every subscriber
pub struct EventBroadcaster {
    sender: broadcast::Sender<UploadEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get a receiver for one presentation adapter
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBroadcaster {
    fn emit(&self, event: UploadEvent) {
        match &event {
            UploadEvent::ValidationRejected { reason } => log::warn!("File rejected: {}", reason),
            UploadEvent::UploadStarted { file_name, size } => {
                log::info!("Uploading {} ({} bytes)", file_name, size)
            }
            UploadEvent::UploadFailed { reason } => log::error!("{}", reason),
            UploadEvent::ProgressUpdated {
                percent,
                eta_minutes,
            } => log::debug!("Progress {}% (eta: {:?} min)", percent, eta_minutes),
            UploadEvent::Completed { job_handle } => {
                log::info!("Processing completed: {}", job_handle)
            }
            UploadEvent::ConnectionLost => log::error!("Lost connection to server"),
            UploadEvent::SessionReset => log::debug!("Session reset"),
        }

        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives_events_in_order() {
        let broadcaster = EventBroadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.emit(UploadEvent::UploadStarted {
            file_name: "a.mp4".into(),
            size: 1,
        });
        broadcaster.emit(UploadEvent::SessionReset);

        for rx in [&mut first, &mut second] {
            assert!(matches!(rx.try_recv(), Ok(UploadEvent::UploadStarted { .. })));
            assert!(matches!(rx.try_recv(), Ok(UploadEvent::SessionReset)));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_emit_without_subscribers_does_not_fail() {
        let broadcaster = EventBroadcaster::default();
        broadcaster.emit(UploadEvent::ConnectionLost);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
