//! Provider error message classification
//!
//! Speech providers report most failures as free-form text. Retry decisions
//! depend on recognizing a handful of phrases in that text, so the mapping is
//! kept in one ordered table. First match wins; matching is case-insensitive.

use super::PipelineError;

/// Coarse class assigned to a provider message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Quota or rate limit, retry after backoff
    Quota,
    /// Bad or missing credentials, never retried
    Authentication,
    /// Voice or language rejected by the provider
    VoiceConfiguration,
    /// Local filesystem problem
    FileSystem,
    /// Anything unrecognized, treated as transient
    Transient,
}

/// Ordered `(pattern, class)` table
pub const CLASSIFICATION_RULES: &[(&str, ErrorClass)] = &[
    ("quota", ErrorClass::Quota),
    ("rate limit", ErrorClass::Quota),
    ("too many requests", ErrorClass::Quota),
    ("resource_exhausted", ErrorClass::Quota),
    ("authentication", ErrorClass::Authentication),
    ("credential", ErrorClass::Authentication),
    ("api key not valid", ErrorClass::Authentication),
    ("unauthenticated", ErrorClass::Authentication),
    ("voice", ErrorClass::VoiceConfiguration),
    ("language", ErrorClass::VoiceConfiguration),
    ("enoent", ErrorClass::FileSystem),
    ("no such file", ErrorClass::FileSystem),
    ("permission", ErrorClass::FileSystem),
    ("no space left", ErrorClass::FileSystem),
];

/// Look up the class of a provider message
pub fn classify_message(message: &str) -> ErrorClass {
    let lowered = message.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, class)| *class)
        .unwrap_or(ErrorClass::Transient)
}

impl ErrorClass {
    /// Build the pipeline error for this class
    pub fn into_error(self, message: impl Into<String>) -> PipelineError {
        let message = message.into();
        match self {
            ErrorClass::Quota => PipelineError::Quota(message),
            ErrorClass::Authentication => PipelineError::authentication(message),
            ErrorClass::VoiceConfiguration => PipelineError::Configuration(message),
            ErrorClass::FileSystem => PipelineError::Storage(message),
            ErrorClass::Transient => PipelineError::service(message),
        }
    }
}

/// Classify a provider message straight into a [`PipelineError`]
pub fn classify_provider_error(message: impl Into<String>) -> PipelineError {
    let message = message.into();
    classify_message(&message).into_error(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_quota_messages_are_retryable() {
        let err = classify_provider_error("Quota exceeded for quota metric 'Requests'");
        assert_eq!(err.kind(), ErrorKind::Quota);
        assert!(err.is_retryable());

        let err = classify_provider_error("Rate Limit reached");
        assert_eq!(err.kind(), ErrorKind::Quota);
    }

    #[test]
    fn test_credential_messages_are_fatal() {
        let err = classify_provider_error("API key not valid. Please pass a valid API key.");
        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(!err.is_retryable());

        assert_eq!(
            classify_message("Request had invalid authentication credentials"),
            ErrorClass::Authentication
        );
    }

    #[test]
    fn test_voice_and_filesystem_messages() {
        assert_eq!(
            classify_message("Voice 'ko-KR-Nope' does not exist"),
            ErrorClass::VoiceConfiguration
        );
        assert_eq!(
            classify_message("Unsupported language code"),
            ErrorClass::VoiceConfiguration
        );
        assert_eq!(
            classify_message("ENOENT: no such file or directory"),
            ErrorClass::FileSystem
        );
        let err = classify_provider_error("permission denied writing audio/001.mp3");
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unknown_messages_default_to_transient() {
        let err = classify_provider_error("connection reset by peer");
        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_first_rule_wins() {
        // "quota" precedes "voice" in the table
        assert_eq!(
            classify_message("quota exceeded for voice synthesis"),
            ErrorClass::Quota
        );
    }
}
