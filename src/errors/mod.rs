//! Pipeline error types
//!
//! Every failure raised by the synthesis and merge stages is a [`PipelineError`].
//! Each error carries a stable machine-readable [`ErrorKind`] tag and a
//! [`code`](PipelineError::code) string, so boundary layers (CLI exit codes,
//! HTTP status mapping) never have to re-derive classification from messages.
//!
//! Free-form provider messages are mapped onto the taxonomy by the
//! [`classify`] table.

pub mod auth_error;
pub mod classify;

use std::fmt;
use thiserror::Error;

pub use classify::{ErrorClass, classify_message};

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Stable error category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport or provider failure
    Service,
    /// Invalid voice, invalid parameters
    Configuration,
    /// Rate or quota exceeded, signaled by the provider
    Quota,
    /// Filesystem access or space
    Storage,
    /// Missing or malformed input manifest, missing referenced files
    Validation,
    /// External transcoder exited non-zero or timed out
    Transcoder,
    /// Retry budget exhausted
    RetriesExhausted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Service => "service",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Quota => "quota",
            ErrorKind::Storage => "storage",
            ErrorKind::Validation => "validation",
            ErrorKind::Transcoder => "transcoder",
            ErrorKind::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type shared by every pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    // ─────────────────────────────────────────────────────────────────────────────
    // Synthesis Errors
    // ─────────────────────────────────────────────────────────────────────────────

    /// Provider or transport failure
    #[error("TTS service error: {message}")]
    Service { message: String, retryable: bool },

    /// Provider signaled quota or rate limit exhaustion
    #[error("TTS quota exceeded: {0}")]
    Quota(String),

    /// Unknown voice, out of range parameter, bad config value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// All attempts failed
    #[error("Operation failed after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },

    // ─────────────────────────────────────────────────────────────────────────────
    // Input / Storage Errors
    // ─────────────────────────────────────────────────────────────────────────────

    /// Filesystem failure with context
    #[error("Storage error: {0}")]
    Storage(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced audio files are not on disk
    #[error("Missing audio files ({}): {}", .0.len(), .0.join(", "))]
    MissingAudioFiles(Vec<String>),

    /// JSON could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────────────────────
    // Transcoder Errors
    // ─────────────────────────────────────────────────────────────────────────────

    /// Transcoder binary could not be started or is missing
    #[error("Transcoder unavailable: {0}")]
    TranscoderUnavailable(String),

    /// Subprocess exited with a non-zero status
    #[error("Transcoder {operation} failed (exit code {exit_code:?}): {stderr}")]
    TranscoderFailed {
        operation: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Subprocess exceeded its deadline and was killed
    #[error("Transcoder {operation} timed out after {timeout_ms} ms: {stderr}")]
    TranscoderTimeout {
        operation: String,
        timeout_ms: u64,
        stdout: String,
        stderr: String,
    },

    /// Transcoder output could not be interpreted
    #[error("Transcoder {operation} produced unreadable output: {message}")]
    TranscoderOutput { operation: String, message: String },
}

impl PipelineError {
    /// Retryable provider failure
    pub fn service(message: impl Into<String>) -> Self {
        PipelineError::Service {
            message: message.into(),
            retryable: true,
        }
    }

    /// Non-retryable provider failure (authentication, credentials)
    pub fn authentication(message: impl Into<String>) -> Self {
        PipelineError::Service {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Service { .. } => ErrorKind::Service,
            PipelineError::Quota(_) => ErrorKind::Quota,
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::MaxRetriesExceeded { .. } => ErrorKind::RetriesExhausted,
            PipelineError::Storage(_) | PipelineError::Io(_) => ErrorKind::Storage,
            PipelineError::Validation(_)
            | PipelineError::MissingAudioFiles(_)
            | PipelineError::Json(_) => ErrorKind::Validation,
            PipelineError::TranscoderUnavailable(_)
            | PipelineError::TranscoderFailed { .. }
            | PipelineError::TranscoderTimeout { .. }
            | PipelineError::TranscoderOutput { .. } => ErrorKind::Transcoder,
        }
    }

    /// Whether [`RetryManager`](crate::core::retry::RetryManager) may try again
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Service { retryable, .. } => *retryable,
            PipelineError::Quota(_) => true,
            _ => false,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Service => "TTS_SERVICE_ERROR",
            ErrorKind::Configuration => "VOICE_CONFIG_ERROR",
            ErrorKind::Quota => "RATE_LIMIT_ERROR",
            ErrorKind::Storage => "FILE_SYSTEM_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Transcoder => "TRANSCODER_ERROR",
            ErrorKind::RetriesExhausted => "MAX_RETRIES_EXCEEDED",
        }
    }

    /// Human-readable message suitable for end users
    pub fn user_message(&self) -> String {
        let hint = match self.kind() {
            ErrorKind::Service => "The speech service is unavailable. Please try again shortly.",
            ErrorKind::Configuration => "The voice configuration is invalid. Check the voice model settings.",
            ErrorKind::Quota => "The API quota was exceeded. Please wait and try again.",
            ErrorKind::Storage => "The file could not be written. Check permissions and free space.",
            ErrorKind::Validation => "The input files are incomplete or malformed.",
            ErrorKind::Transcoder => "Audio processing with ffmpeg failed. Check the ffmpeg installation.",
            ErrorKind::RetriesExhausted => "The request kept failing. Please try again later.",
        };
        format!("{hint} ({self})")
    }

    /// Attempt count for exhausted retries
    pub fn attempts(&self) -> Option<u32> {
        match self {
            PipelineError::MaxRetriesExceeded { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_matrix() {
        assert!(PipelineError::service("boom").is_retryable());
        assert!(PipelineError::Quota("slow down".into()).is_retryable());
        assert!(!PipelineError::authentication("bad key").is_retryable());
        assert!(!PipelineError::Configuration("voice".into()).is_retryable());
        assert!(!PipelineError::Storage("disk".into()).is_retryable());
        assert!(!PipelineError::MissingAudioFiles(vec!["a.mp3".into()]).is_retryable());
    }

    #[test]
    fn test_kind_and_code_are_stable() {
        let err = PipelineError::TranscoderTimeout {
            operation: "concat".into(),
            timeout_ms: 10,
            stdout: String::new(),
            stderr: "partial".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Transcoder);
        assert_eq!(err.code(), "TRANSCODER_ERROR");

        let io = PipelineError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), ErrorKind::Storage);
        assert_eq!(io.code(), "FILE_SYSTEM_ERROR");
    }

    #[test]
    fn test_max_retries_wraps_last_error() {
        let err = PipelineError::MaxRetriesExceeded {
            attempts: 4,
            source: Box::new(PipelineError::service("503 upstream")),
        };
        assert_eq!(err.attempts(), Some(4));
        assert_eq!(err.code(), "MAX_RETRIES_EXCEEDED");
        assert_eq!(
            err.to_string(),
            "Operation failed after 4 attempts: TTS service error: 503 upstream"
        );
    }

    #[test]
    fn test_missing_files_lists_every_path() {
        let err = PipelineError::MissingAudioFiles(vec!["a.mp3".into(), "b.mp3".into()]);
        let msg = err.to_string();
        assert!(msg.contains("a.mp3"), "message should name a.mp3: {msg}");
        assert!(msg.contains("b.mp3"), "message should name b.mp3: {msg}");
        assert!(err.user_message().contains("incomplete"));
    }
}
