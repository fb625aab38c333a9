//! Transport seam between the core and the processing server.
//!
//! The core needs exactly two round trips: submit a file, and ask how far the
//! job has got. [`HttpTransport`] implements them against the processing
//! server's REST endpoints; tests plug in scripted implementations.

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TransportResult;
use crate::models::{JobHandle, PollReply, SubmitReply, VideoFile};

/// The two logical operations consumed by the coordinator.
///
/// Both are expected to resolve in bounded time through the
/// implementation's own timeouts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the file. A reply without a job handle is interpreted by the
    /// coordinator, not here.
    async fn submit(&self, file: &VideoFile) -> TransportResult<SubmitReply>;

    /// Ask for the job's progress.
    async fn poll(&self, job: &JobHandle) -> TransportResult<PollReply>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn submit(&self, file: &VideoFile) -> TransportResult<SubmitReply> {
        (**self).submit(file).await
    }

    async fn poll(&self, job: &JobHandle) -> TransportResult<PollReply> {
        (**self).poll(job).await
    }
}
