//! The upload/progress state machine.
//!
//! [`UploadCoordinator`] owns the session and drives it through submission
//! and monitoring; [`ProgressPoller`] owns the poll timer and interprets each
//! poll response.

pub mod coordinator;
pub mod poller;

pub use coordinator::UploadCoordinator;
pub use poller::{estimate_remaining_minutes, ProgressPoller, TickOutcome};
