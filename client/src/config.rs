//! Client configuration.
//!
//! Every knob has a default matching the processing server's limits. Hosts
//! override them through the builder methods, or through `CLIPWATCH_*`
//! environment variables (a `.env` file is honoured) via
//! [`UploadConfig::from_env`].

use std::env;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Processing server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Endpoint receiving the multipart upload.
pub const DEFAULT_UPLOAD_PATH: &str = "/upload";

/// Endpoint reporting job progress.
pub const DEFAULT_PROGRESS_PATH: &str = "/progress";

/// MIME types the server knows how to process.
pub const DEFAULT_ACCEPTED_TYPES: [&str; 4] = [
    "video/mp4",
    "video/x-msvideo",
    "video/quicktime",
    "video/x-ms-wmv",
];

/// Maximum file size for upload (in bytes).
///
/// 100 MiB limit, same as the server's `MAX_CONTENT_LENGTH`.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Delay between two progress checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Consecutive failed progress checks before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How long a presentation adapter keeps an error message visible.
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_millis(5000);

/// Remaining-time estimates at or above this horizon are not shown.
pub const DEFAULT_MAX_ETA: Duration = Duration::from_secs(7200);

/// Delay between acknowledging a completed job and resetting the session,
/// so an in-flight download of the artifact is not cut short.
pub const DEFAULT_COMPLETION_GRACE: Duration = Duration::from_millis(1000);

/// Per-request timeout for progress checks.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for the upload, body included.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connect timeout for every request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ENV_PREFIX: &str = "CLIPWATCH_";

/// Effective configuration for one coordinator and its transport.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub server_url: String,
    pub upload_path: String,
    pub progress_path: String,
    pub accepted_types: Vec<String>,
    pub max_file_size: u64,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub error_display: Duration,
    pub max_eta: Duration,
    pub completion_grace: Duration,
    pub poll_timeout: Duration,
    pub submit_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            progress_path: DEFAULT_PROGRESS_PATH.to_string(),
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            error_display: DEFAULT_ERROR_DISPLAY,
            max_eta: DEFAULT_MAX_ETA,
            completion_grace: DEFAULT_COMPLETION_GRACE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl UploadConfig {
    /// Defaults overridden by `CLIPWATCH_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `CLIPWATCH_*` key.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let var = format!("{ENV_PREFIX}{name}");
            lookup(&var).map(|value| (var, value))
        };

        let mut config = Self::default();

        if let Some((_, url)) = get("SERVER_URL") {
            config.server_url = url;
        }
        if let Some((var, types)) = get("ACCEPTED_TYPES") {
            let types: Vec<String> = types
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if types.is_empty() {
                log::error!("{var} is set but lists no MIME type");
                return Err(ConfigError::NoAcceptedTypes);
            }
            config.accepted_types = types;
        }
        if let Some((var, value)) = get("MAX_FILE_SIZE") {
            config.max_file_size = parse(&var, &value)?;
        }
        if let Some((var, value)) = get("POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse_nonzero(&var, &value)?);
        }
        if let Some((var, value)) = get("MAX_RETRIES") {
            let retries = parse_nonzero(&var, &value)?;
            config.max_retries = u32::try_from(retries).map_err(|_| ConfigError::InvalidValue {
                var: var.clone(),
                value: value.clone(),
            })?;
        }
        if let Some((var, value)) = get("ERROR_DISPLAY_MS") {
            config.error_display = Duration::from_millis(parse(&var, &value)?);
        }
        if let Some((var, value)) = get("MAX_ETA_SECS") {
            config.max_eta = Duration::from_secs(parse(&var, &value)?);
        }
        if let Some((var, value)) = get("COMPLETION_GRACE_MS") {
            config.completion_grace = Duration::from_millis(parse(&var, &value)?);
        }
        if let Some((var, value)) = get("POLL_TIMEOUT_SECS") {
            config.poll_timeout = Duration::from_secs(parse_nonzero(&var, &value)?);
        }
        if let Some((var, value)) = get("SUBMIT_TIMEOUT_SECS") {
            config.submit_timeout = Duration::from_secs(parse_nonzero(&var, &value)?);
        }

        Ok(config)
    }

    /// Set the server base URL
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the poll cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the consecutive failure budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the maximum accepted file size in bytes
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the grace delay applied after acknowledging a completed job
    pub fn with_completion_grace(mut self, grace: Duration) -> Self {
        self.completion_grace = grace;
        self
    }

    /// Set the upload request timeout
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Set how long failure messages stay visible
    pub fn with_error_display(mut self, duration: Duration) -> Self {
        self.error_display = duration;
        self
    }
}

fn parse(var: &str, value: &str) -> ConfigResult<u64> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_nonzero(var: &str, value: &str) -> ConfigResult<u64> {
    match parse(var, value)? {
        0 => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        }),
        n => Ok(n),
    }
}
