//! Progress polling: fixed-cadence timer, monotonic progress, retry budget
//! and remaining-time estimation.
//!
//! The poller owns the timer and decides what each poll response means. It
//! does not talk to the transport itself; the coordinator awaits
//! [`ProgressPoller::tick`], performs the round trip and feeds the result to
//! [`ProgressPoller::observe`]. That keeps ticks strictly serialized.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::UploadConfig;
use crate::error::TransportResult;
use crate::models::{PollReply, UploadSession};

/// What a single poll response amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// New figure to report (possibly equal to the previous one).
    Progress { percent: u8, eta_minutes: Option<u64> },
    /// Successful check without a progress value.
    NoUpdate,
    /// Failed check absorbed by the retry budget.
    Retrying { attempt: u32 },
    /// Retry budget exhausted; the timer is stopped.
    ConnectionLost,
    /// Progress reached 100; the timer is stopped.
    Completed,
    /// Response arrived after the timer was stopped and was discarded.
    Ignored,
}

pub struct ProgressPoller {
    interval: Duration,
    max_retries: u32,
    max_eta: Duration,
    ticker: Option<Interval>,
}

impl ProgressPoller {
    pub fn new(interval: Duration, max_retries: u32, max_eta: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max_retries: max_retries.max(1),
            max_eta,
            ticker: None,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.poll_interval, config.max_retries, config.max_eta)
    }

    /// Arm the timer for a new monitoring phase.
    ///
    /// Any running timer is dropped first, so at most one exists. The first
    /// tick fires one full interval after this call.
    pub fn start(&mut self, session: &mut UploadSession) {
        if self.ticker.take().is_some() {
            log::debug!("Replacing running poll timer");
        }

        session.last_progress = 0.0;
        session.retry_count = 0;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    pub fn stop(&mut self) {
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Wait for the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Fold one poll response into the session.
    pub fn observe(
        &mut self,
        session: &mut UploadSession,
        response: TransportResult<PollReply>,
        now: Instant,
    ) -> TickOutcome {
        if !self.is_running() {
            log::debug!("Discarding poll response received after stop");
            return TickOutcome::Ignored;
        }

        let reply = match response {
            Ok(reply) => reply,
            Err(e) => {
                session.retry_count += 1;
                if session.retry_count >= self.max_retries {
                    self.stop();
                    log::error!(
                        "Progress check failed {} times in a row, giving up: {}",
                        session.retry_count,
                        e
                    );
                    return TickOutcome::ConnectionLost;
                }
                log::warn!(
                    "Progress check failed ({}/{}): {}",
                    session.retry_count,
                    self.max_retries,
                    e
                );
                return TickOutcome::Retrying {
                    attempt: session.retry_count,
                };
            }
        };

        session.retry_count = 0;

        let Some(observed) = reply.progress.filter(|p| p.is_finite()) else {
            return TickOutcome::NoUpdate;
        };

        // Out-of-order or regressive reports never lower the figure
        session.last_progress = session.last_progress.max(observed.clamp(0.0, 100.0));
        let percent = session.last_progress.round().min(100.0) as u8;

        if percent >= 100 {
            // Stop before reporting so no later tick can observe 100 again
            self.stop();
            return TickOutcome::Completed;
        }

        let eta_minutes = session.started_at.and_then(|started| {
            estimate_remaining_minutes(
                now.saturating_duration_since(started),
                f64::from(percent),
                self.max_eta,
            )
        });

        TickOutcome::Progress {
            percent,
            eta_minutes,
        }
    }
}

/// Whole minutes left (rounded up), extrapolated linearly from `elapsed`
/// and `percent`. `None` when there is nothing to extrapolate from or the
/// estimate falls outside `(0, horizon)`.
pub fn estimate_remaining_minutes(elapsed: Duration, percent: f64, horizon: Duration) -> Option<u64> {
    if percent <= 0.0 || percent >= 100.0 {
        return None;
    }

    let elapsed = elapsed.as_secs_f64();
    let total = elapsed / (percent / 100.0);
    let remaining = total - elapsed;

    if remaining > 0.0 && remaining < horizon.as_secs_f64() {
        Some((remaining / 60.0).ceil() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    const HORIZON: Duration = Duration::from_secs(7200);

    fn poller() -> ProgressPoller {
        ProgressPoller::new(Duration::from_secs(1), 3, HORIZON)
    }

    fn failure() -> TransportResult<PollReply> {
        Err(TransportError::Network {
            message: "connection reset".into(),
        })
    }

    fn progress(p: f64) -> TransportResult<PollReply> {
        Ok(PollReply::progress(p))
    }

    fn reported(outcome: TickOutcome) -> Option<u8> {
        match outcome {
            TickOutcome::Progress { percent, .. } => Some(percent),
            _ => None,
        }
    }

    #[test]
    fn test_eta_half_way_after_a_minute() {
        assert_eq!(
            estimate_remaining_minutes(Duration::from_secs(60), 50.0, HORIZON),
            Some(1)
        );
    }

    #[test]
    fn test_eta_rounds_up_to_whole_minutes() {
        // 90s in at 25% => 270s left => 4.5 min => 5
        assert_eq!(
            estimate_remaining_minutes(Duration::from_secs(90), 25.0, HORIZON),
            Some(5)
        );
    }

    #[test]
    fn test_eta_absent_without_progress() {
        assert_eq!(estimate_remaining_minutes(Duration::from_secs(60), 0.0, HORIZON), None);
        assert_eq!(estimate_remaining_minutes(Duration::from_secs(60), 100.0, HORIZON), None);
    }

    #[test]
    fn test_eta_absent_beyond_horizon() {
        // Exactly at the horizon
        assert_eq!(
            estimate_remaining_minutes(Duration::from_secs(7200), 50.0, HORIZON),
            None
        );
        // 80s in at 1% => 7920s left
        assert_eq!(estimate_remaining_minutes(Duration::from_secs(80), 1.0, HORIZON), None);
    }

    #[test]
    fn test_eta_absent_with_zero_elapsed() {
        assert_eq!(estimate_remaining_minutes(Duration::ZERO, 40.0, HORIZON), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        let reports: Vec<Option<u8>> = [40.0, 20.0, 60.0]
            .into_iter()
            .map(|p| reported(poller.observe(&mut session, progress(p), Instant::now())))
            .collect();

        assert_eq!(reports, vec![Some(40), Some(40), Some(60)]);
        assert_eq!(session.last_progress, 60.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reported_value_is_rounded() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        let outcome = poller.observe(&mut session, progress(42.6), Instant::now());
        assert_eq!(reported(outcome), Some(43));
        assert_eq!(session.last_progress, 42.6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_or_invalid_progress_is_no_update() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);
        session.retry_count = 2;

        let outcome = poller.observe(&mut session, Ok(PollReply::empty()), Instant::now());
        assert_eq!(outcome, TickOutcome::NoUpdate);
        assert_eq!(session.retry_count, 0);

        let outcome = poller.observe(&mut session, progress(f64::NAN), Instant::now());
        assert_eq!(outcome, TickOutcome::NoUpdate);
        assert_eq!(session.last_progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_resets_retry_count() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        assert_eq!(
            poller.observe(&mut session, failure(), Instant::now()),
            TickOutcome::Retrying { attempt: 1 }
        );
        assert_eq!(
            poller.observe(&mut session, failure(), Instant::now()),
            TickOutcome::Retrying { attempt: 2 }
        );
        assert_eq!(reported(poller.observe(&mut session, progress(10.0), Instant::now())), Some(10));
        assert_eq!(session.retry_count, 0);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_stops_timer() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        poller.observe(&mut session, failure(), Instant::now());
        poller.observe(&mut session, failure(), Instant::now());
        let outcome = poller.observe(&mut session, failure(), Instant::now());

        assert_eq!(outcome, TickOutcome::ConnectionLost);
        assert_eq!(session.retry_count, 3);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_once() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        assert_eq!(
            poller.observe(&mut session, progress(100.0), Instant::now()),
            TickOutcome::Completed
        );
        assert!(!poller.is_running());
        assert_eq!(
            poller.observe(&mut session, progress(100.0), Instant::now()),
            TickOutcome::Ignored
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_range_progress_completes() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        assert_eq!(
            poller.observe(&mut session, progress(250.0), Instant::now()),
            TickOutcome::Completed
        );
        assert_eq!(session.last_progress, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_responses_after_stop_leave_session_untouched() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);
        poller.observe(&mut session, progress(30.0), Instant::now());
        poller.stop();

        assert_eq!(
            poller.observe(&mut session, progress(80.0), Instant::now()),
            TickOutcome::Ignored
        );
        assert_eq!(poller.observe(&mut session, failure(), Instant::now()), TickOutcome::Ignored);
        assert_eq!(session.last_progress, 30.0);
        assert_eq!(session.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer_and_clears_counters() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);
        poller.observe(&mut session, progress(55.0), Instant::now());
        poller.observe(&mut session, failure(), Instant::now());

        poller.start(&mut session);
        assert!(poller.is_running());
        assert_eq!(session.last_progress, 0.0);
        assert_eq!(session.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eta_uses_session_start() {
        let mut poller = poller();
        let mut session = UploadSession {
            started_at: Some(Instant::now()),
            ..UploadSession::default()
        };
        poller.start(&mut session);

        tokio::time::advance(Duration::from_secs(60)).await;
        let outcome = poller.observe(&mut session, progress(50.0), Instant::now());
        assert_eq!(
            outcome,
            TickOutcome::Progress {
                percent: 50,
                eta_minutes: Some(1)
            }
        );

        session.started_at = None;
        let outcome = poller.observe(&mut session, progress(60.0), Instant::now());
        assert_eq!(
            outcome,
            TickOutcome::Progress {
                percent: 60,
                eta_minutes: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let mut poller = poller();
        let mut session = UploadSession::default();
        poller.start(&mut session);

        let before = Instant::now();
        poller.tick().await;
        assert!(Instant::now() - before >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_poller_never_ticks() {
        let mut poller = poller();
        let waited = tokio::time::timeout(Duration::from_secs(5), poller.tick()).await;
        assert!(waited.is_err());
    }
}
