//! # Clipwatch - client-side orchestration of video processing jobs
//!
//! Clipwatch validates a video file, submits it to a processing server,
//! tracks the job's progress by polling, and exposes the finished artifact.
//! The core is a small state machine that emits events; rendering them is
//! left to whatever host drives it (the bundled CLI prints them).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  VideoFile  │────▶│  Validator  │────▶│ Coordinator │────▶│  Transport  │
//! │ (type/size) │     │  (gate)     │     │ (session)   │     │ (HTTP)      │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                                                │  ▲
//!                                          events│  │ticks
//!                                                ▼  │
//!                                      ┌─────────────┐  ┌─────────────┐
//!                                      │ Broadcaster │  │   Poller    │
//!                                      │ (fan-out)   │  │ (retries)   │
//!                                      └─────────────┘  └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clipwatch::{EventBroadcaster, HttpTransport, UploadConfig, UploadCoordinator, VideoFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = UploadConfig::from_env()?;
//!     let transport = HttpTransport::new(&config)?;
//!     let events = Arc::new(EventBroadcaster::new());
//!     let mut coordinator = UploadCoordinator::new(config, transport, events.clone());
//!
//!     let job = coordinator.process(VideoFile::from_path("pigs.mp4")?).await?;
//!     println!("Result at {}", coordinator.transport().artifact_url(&job));
//!     coordinator.acknowledge().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`config`] - Defaults and environment overrides
//! - [`models`] - File, session and wire models
//! - [`validation`] - Pre-submission file checks
//! - [`upload`] - Coordinator and progress poller
//! - [`transport`] - Transport seam and HTTP implementation
//! - [`events`] - Event type, sink trait and broadcaster
//! - [`console`] - Terminal rendering of events

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Validation
pub mod validation;

// State machine
pub mod upload;

// Server communication
pub mod transport;

// Presentation
pub mod console;
pub mod events;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, SubmitError, TransportError, TransportResult, UploadError,
    UploadResult, ValidationError, ValidationResult,
};

// =============================================================================
// Re-exports - Configuration & Models
// =============================================================================

pub use config::UploadConfig;

pub use models::{JobHandle, PollReply, SessionStatus, SubmitReply, UploadSession, VideoFile};

// =============================================================================
// Re-exports - State machine
// =============================================================================

pub use upload::{estimate_remaining_minutes, ProgressPoller, TickOutcome, UploadCoordinator};

pub use validation::FileValidator;

// =============================================================================
// Re-exports - Transport
// =============================================================================

pub use transport::{HttpTransport, Transport};

// =============================================================================
// Re-exports - Events
// =============================================================================

pub use console::ConsoleRenderer;
pub use events::{EventBroadcaster, EventSink, UploadEvent};
