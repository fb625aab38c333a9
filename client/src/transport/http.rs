//! HTTP transport for the processing server.
//!
//! # Endpoints
//!
//! | Method | Path           | Used by                                  |
//! |--------|----------------|------------------------------------------|
//! | POST   | `/upload`      | [`Transport::submit`] (multipart `video`) |
//! | GET    | `/progress`    | [`Transport::poll`]                       |
//! | GET    | job handle URL | [`HttpTransport::download`]               |
//!
//! The server tracks one job at a time, so the progress endpoint is not
//! parameterised by the job handle; the handle is the artifact URL.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::Transport;
use crate::config::UploadConfig;
use crate::error::{TransportError, TransportResult, UploadError, UploadResult};
use crate::models::{JobHandle, PollReply, SubmitReply, VideoFile};

/// Multipart field the server reads the file from
const UPLOAD_FIELD: &str = "video";

/// reqwest-backed [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    server_url: String,
    upload_path: String,
    progress_path: String,
    poll_timeout: Duration,
    submit_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from the server URL, paths and timeouts in `config`.
    pub fn new(config: &UploadConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(network_error)?;

        Ok(Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
            upload_path: config.upload_path.clone(),
            progress_path: config.progress_path.clone(),
            poll_timeout: config.poll_timeout,
            submit_timeout: config.submit_timeout,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Absolute URL of the artifact a job handle points at.
    pub fn artifact_url(&self, job: &JobHandle) -> String {
        let handle = job.as_str();
        if handle.starts_with("http://") || handle.starts_with("https://") {
            handle.to_string()
        } else {
            self.endpoint(handle)
        }
    }

    /// Stream the processed artifact to `dest`. Returns the bytes written.
    pub async fn download(&self, job: &JobHandle, dest: &Path) -> TransportResult<u64> {
        let url = self.artifact_url(job);
        log::info!("Downloading {} to {}", url, dest.display());

        let response = self.client.get(&url).send().await.map_err(network_error)?;
        let response = ensure_success(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(network_error)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        log::info!("Downloaded {} bytes", written);
        Ok(written)
    }

    /// [`download`](Self::download), abandoned as soon as `cancel` fires.
    /// A partially written `dest` is removed.
    pub async fn download_until_cancelled(
        &self,
        job: &JobHandle,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> UploadResult<u64> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            result = self.download(job, dest) => return result.map_err(UploadError::Download),
        }

        log::warn!("Download of {} cancelled", job);
        match tokio::fs::remove_file(dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove partial {}: {}", dest.display(), e),
        }
        Err(UploadError::Cancelled)
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.server_url, path)
        } else {
            format!("{}/{}", self.server_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, file: &VideoFile) -> TransportResult<SubmitReply> {
        let source = tokio::fs::File::open(&file.path).await?;
        let length = source.metadata().await?.len();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(source)), length)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| TransportError::Malformed {
                message: format!("Invalid MIME type '{}': {}", file.mime_type, e),
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint(&self.upload_path);
        log::debug!("POST {} ({} bytes)", url, length);

        let response = self
            .client
            .post(&url)
            .timeout(self.submit_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response)
            .await?
            .json::<SubmitReply>()
            .await
            .map_err(network_error)
    }

    async fn poll(&self, job: &JobHandle) -> TransportResult<PollReply> {
        let url = self.endpoint(&self.progress_path);
        log::trace!("GET {} for {}", url, job);

        let response = self
            .client
            .get(&url)
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response)
            .await?
            .json::<PollReply>()
            .await
            .map_err(network_error)
    }
}

/// Map a non-2xx response to [`TransportError::Status`], preferring the
/// server's JSON `error` field as the reason.
async fn ensure_success(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<SubmitReply>(&body)
        .ok()
        .and_then(|reply| reply.error)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string());

    Err(TransportError::Status {
        status: status.as_u16(),
        reason,
    })
}

fn network_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        let message = match std::error::Error::source(&e) {
            Some(cause) => format!("{}: {}", e, cause),
            None => e.to_string(),
        };
        TransportError::Malformed { message }
    } else if e.is_timeout() {
        TransportError::Network {
            message: format!("Request timed out: {}", e),
        }
    } else {
        TransportError::Network {
            message: e.to_string(),
        }
    }
}
