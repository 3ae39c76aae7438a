//! Range checks for every configuration section
//!
//! Each function returns a message naming the offending field.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{
    OutputConfig, ProcessingConfig, RateLimitConfig, RetryConfig, ServerSettings, TranscoderConfig,
    TtsConfig,
};

static BITRATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+k$").unwrap());

pub(super) fn validate_tts(tts: &TtsConfig) -> Result<(), String> {
    Url::parse(&tts.base_url)
        .map_err(|e| format!("tts.base_url '{}' is not a valid URL: {e}", tts.base_url))?;

    if tts.language_code.trim().is_empty() {
        return Err("tts.language_code must not be empty".to_string());
    }
    if !(0.25..=4.0).contains(&tts.speaking_rate) {
        return Err(format!(
            "tts.speaking_rate must be between 0.25 and 4.0, got {}",
            tts.speaking_rate
        ));
    }
    if !(-20.0..=20.0).contains(&tts.pitch) {
        return Err(format!(
            "tts.pitch must be between -20.0 and 20.0, got {}",
            tts.pitch
        ));
    }
    if !(-96.0..=16.0).contains(&tts.volume_gain_db) {
        return Err(format!(
            "tts.volume_gain_db must be between -96.0 and 16.0, got {}",
            tts.volume_gain_db
        ));
    }
    if tts.request_timeout_secs == 0 {
        return Err("tts.request_timeout_secs must be greater than 0".to_string());
    }
    Ok(())
}

pub(super) fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Result<(), String> {
    if rate_limit.requests_per_second == 0 {
        return Err("rate_limit.requests_per_second must be greater than 0".to_string());
    }
    if rate_limit.burst_limit == 0 {
        return Err("rate_limit.burst_limit must be at least 1".to_string());
    }
    if rate_limit.pool_size == 0 {
        return Err("rate_limit.pool_size must be at least 1".to_string());
    }
    Ok(())
}

pub(super) fn validate_retry(retry: &RetryConfig) -> Result<(), String> {
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(format!(
            "retry.backoff_multiplier must be at least 1.0, got {}",
            retry.backoff_multiplier
        ));
    }
    Ok(())
}

pub(super) fn validate_output(output: &OutputConfig) -> Result<(), String> {
    if output.audio_folder.trim().is_empty() {
        return Err("output.audio_folder must not be empty".to_string());
    }
    if !output.file_name_pattern.contains("{sequence}") {
        return Err(format!(
            "output.file_name_pattern must contain {{sequence}}, got '{}'",
            output.file_name_pattern
        ));
    }
    if !BITRATE_PATTERN.is_match(&output.bitrate) {
        return Err(format!(
            "output.bitrate must look like '32k', got '{}'",
            output.bitrate
        ));
    }
    if output.sample_rate == 0 {
        return Err("output.sample_rate must be greater than 0".to_string());
    }
    if output.merged_file_name.trim().is_empty() {
        return Err("output.merged_file_name must not be empty".to_string());
    }
    if output.concurrency == 0 {
        return Err("output.concurrency must be at least 1".to_string());
    }
    Ok(())
}

pub(super) fn validate_processing(processing: &ProcessingConfig) -> Result<(), String> {
    if !processing.silence_duration.is_finite() || processing.silence_duration < 0.0 {
        return Err(format!(
            "processing.silence_duration must be non-negative, got {}",
            processing.silence_duration
        ));
    }
    if processing.fade_in < 0.0 || processing.fade_out < 0.0 {
        return Err("processing.fade_in and processing.fade_out must be non-negative".to_string());
    }
    Ok(())
}

pub(super) fn validate_transcoder(transcoder: &TranscoderConfig) -> Result<(), String> {
    if transcoder.path.as_os_str().is_empty() {
        return Err("transcoder.path must not be empty".to_string());
    }
    if transcoder.timeout_ms == 0 {
        return Err("transcoder.timeout_ms must be greater than 0".to_string());
    }
    Ok(())
}

pub(super) fn validate_server(server: &ServerSettings) -> Result<(), String> {
    if server.data_root.as_os_str().is_empty() {
        return Err("server.data_root must not be empty".to_string());
    }
    if server.auth_required && !server.has_api_secret_auth() {
        return Err(
            "server.auth_required is set but server.auth_api_secrets is empty".to_string(),
        );
    }
    Ok(())
}
