//! File validation before submission.
//!
//! A pure gate over the declared MIME type and size of a candidate file.
//! Nothing here touches the session, the transport or the filesystem, so a
//! rejected file never creates a session.
//!
//! # Example
//!
//! ```rust,ignore
//! use clipwatch::{FileValidator, UploadConfig, VideoFile};
//!
//! let validator = FileValidator::from_config(&UploadConfig::default());
//! let file = VideoFile::new("pigs.mp4", "video/mp4", 10 * 1024 * 1024);
//! assert!(validator.validate(&file).is_ok());
//! ```

use std::path::Path;

use crate::config::UploadConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::models::VideoFile;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// MIME type reported for extensions the server does not process.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Accepted types and size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidator {
    accepted_types: Vec<String>,
    max_size: u64,
}

impl FileValidator {
    pub fn new(accepted_types: Vec<String>, max_size: u64) -> Self {
        Self {
            accepted_types,
            max_size,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.accepted_types.clone(), config.max_file_size)
    }

    /// Type first, then size.
    pub fn validate(&self, file: &VideoFile) -> ValidationResult<()> {
        if !self.accepted_types.iter().any(|t| t == &file.mime_type) {
            return Err(ValidationError::UnsupportedType {
                mime_type: file.mime_type.clone(),
            });
        }

        if file.size > self.max_size {
            return Err(ValidationError::TooLarge {
                size_mb: to_rounded_mb(file.size),
                max_mb: to_rounded_mb(self.max_size),
            });
        }

        Ok(())
    }

    /// Quick check, true/false only.
    pub fn is_valid(&self, file: &VideoFile) -> bool {
        self.validate(file).is_ok()
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

fn to_rounded_mb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

/// Declared MIME type for a file, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("wmv") => "video/x-ms-wmv",
        _ => UNKNOWN_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_accepts_every_default_type() {
        let validator = FileValidator::default();
        for mime in [
            "video/mp4",
            "video/x-msvideo",
            "video/quicktime",
            "video/x-ms-wmv",
        ] {
            let file = VideoFile::new("clip", mime, 10 * MB);
            assert!(validator.is_valid(&file), "{mime} should be accepted");
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let validator = FileValidator::default();
        let file = VideoFile::new("notes.txt", "text/plain", 10);
        assert_eq!(
            validator.validate(&file),
            Err(ValidationError::UnsupportedType {
                mime_type: "text/plain".into()
            })
        );
    }

    #[test]
    fn test_rejects_too_large_with_rounded_size() {
        let validator = FileValidator::default();
        let file = VideoFile::new("big.mp4", "video/mp4", 150 * MB + MB / 2 + 1);
        assert_eq!(
            validator.validate(&file),
            Err(ValidationError::TooLarge {
                size_mb: 151,
                max_mb: 100
            })
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let validator = FileValidator::default();
        assert!(validator.is_valid(&VideoFile::new("a.mp4", "video/mp4", 100 * MB)));
        assert!(!validator.is_valid(&VideoFile::new("a.mp4", "video/mp4", 100 * MB + 1)));
    }

    #[test]
    fn test_type_checked_before_size() {
        let validator = FileValidator::default();
        let file = VideoFile::new("huge.mkv", "video/x-matroska", 500 * MB);
        assert!(matches!(
            validator.validate(&file),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_validation_is_idempotent_and_ignores_name_and_path() {
        let validator = FileValidator::default();
        let a = VideoFile::new("one.mp4", "video/mp4", 120 * MB);
        let mut b = VideoFile::new("other-name.avi", "video/mp4", 120 * MB);
        b.path = "/elsewhere/entirely".into();

        let first = validator.validate(&a);
        assert_eq!(first, validator.validate(&a));
        assert_eq!(first, validator.validate(&b));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.mp4")), "video/mp4");
        assert_eq!(mime_for_path(Path::new("dir/B.AVI")), "video/x-msvideo");
        assert_eq!(mime_for_path(Path::new("c.mov")), "video/quicktime");
        assert_eq!(mime_for_path(Path::new("d.wmv")), "video/x-ms-wmv");
        assert_eq!(mime_for_path(Path::new("e.mkv")), UNKNOWN_MIME_TYPE);
        assert_eq!(mime_for_path(Path::new("noext")), UNKNOWN_MIME_TYPE);
    }
}
