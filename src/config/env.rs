//! Environment variable overrides

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ChannelLayout, OutputFormat, PipelineConfig};
use crate::core::tts::AudioEncoding;

/// Every variable read by [`apply_env`]
pub(super) const ENV_VARS: &[&str] = &[
    "GOOGLE_CLOUD_API_KEY",
    "TTS_BASE_URL",
    "TTS_LANGUAGE_CODE",
    "TTS_SPEAKING_RATE",
    "TTS_PITCH",
    "TTS_VOLUME_GAIN_DB",
    "TTS_AUDIO_ENCODING",
    "TTS_REQUEST_TIMEOUT_SECS",
    "TTS_REQUESTS_PER_SECOND",
    "TTS_BURST_LIMIT",
    "TTS_DELAY_BETWEEN_REQUESTS_MS",
    "TTS_LIMITER_POOL_SIZE",
    "RETRY_MAX_RETRIES",
    "RETRY_BACKOFF_MULTIPLIER",
    "RETRY_INITIAL_DELAY_MS",
    "AUDIO_FOLDER",
    "AUDIO_FILE_NAME_PATTERN",
    "AUDIO_OUTPUT_FORMAT",
    "AUDIO_BITRATE",
    "AUDIO_SAMPLE_RATE",
    "AUDIO_CHANNELS",
    "MERGED_FILE_NAME",
    "SYNTHESIS_CONCURRENCY",
    "MERGE_SILENCE_DURATION",
    "MERGE_NORMALIZE_LEVELS",
    "MERGE_STRICT_METRICS",
    "FFMPEG_PATH",
    "FFPROBE_PATH",
    "FFMPEG_TIMEOUT_MS",
    "HOST",
    "PORT",
    "RATE_LIMIT_REQUESTS_PER_SECOND",
    "RATE_LIMIT_BURST_SIZE",
    "DATA_ROOT",
    "AUTH_REQUIRED",
    "AUTH_API_SECRETS",
];

fn string_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match string_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid value for {name}: '{raw}'")),
        None => Ok(None),
    }
}

fn bool_var(name: &str) -> Result<Option<bool>, String> {
    match string_var(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(format!("Invalid value for {name}: '{raw}' (expected true/false)")),
        },
        None => Ok(None),
    }
}

/// Apply environment variables on top of `config`
///
/// Unset and empty variables leave the current value untouched. Malformed
/// numbers and booleans are reported with the variable name.
pub(super) fn apply_env(config: &mut PipelineConfig) -> Result<(), String> {
    // TTS provider
    if let Some(key) = string_var("GOOGLE_CLOUD_API_KEY") {
        config.tts.api_key = Some(key);
    }
    if let Some(url) = string_var("TTS_BASE_URL") {
        config.tts.base_url = url;
    }
    if let Some(code) = string_var("TTS_LANGUAGE_CODE") {
        config.tts.language_code = code;
    }
    if let Some(rate) = parse_var("TTS_SPEAKING_RATE")? {
        config.tts.speaking_rate = rate;
    }
    if let Some(pitch) = parse_var("TTS_PITCH")? {
        config.tts.pitch = pitch;
    }
    if let Some(gain) = parse_var("TTS_VOLUME_GAIN_DB")? {
        config.tts.volume_gain_db = gain;
    }
    if let Some(encoding) = string_var("TTS_AUDIO_ENCODING") {
        config.tts.audio_encoding = AudioEncoding::from_str_or_default(&encoding);
    }
    if let Some(timeout) = parse_var("TTS_REQUEST_TIMEOUT_SECS")? {
        config.tts.request_timeout_secs = timeout;
    }

    // Outbound rate limiting
    if let Some(rps) = parse_var("TTS_REQUESTS_PER_SECOND")? {
        config.rate_limit.requests_per_second = rps;
    }
    if let Some(burst) = parse_var("TTS_BURST_LIMIT")? {
        config.rate_limit.burst_limit = burst;
    }
    if let Some(delay) = parse_var("TTS_DELAY_BETWEEN_REQUESTS_MS")? {
        config.rate_limit.delay_between_requests_ms = delay;
    }
    if let Some(size) = parse_var("TTS_LIMITER_POOL_SIZE")? {
        config.rate_limit.pool_size = size;
    }

    // Retry
    if let Some(retries) = parse_var("RETRY_MAX_RETRIES")? {
        config.retry.max_retries = retries;
    }
    if let Some(multiplier) = parse_var("RETRY_BACKOFF_MULTIPLIER")? {
        config.retry.backoff_multiplier = multiplier;
    }
    if let Some(delay) = parse_var("RETRY_INITIAL_DELAY_MS")? {
        config.retry.initial_delay_ms = delay;
    }

    // Output
    if let Some(folder) = string_var("AUDIO_FOLDER") {
        config.output.audio_folder = folder;
    }
    if let Some(pattern) = string_var("AUDIO_FILE_NAME_PATTERN") {
        config.output.file_name_pattern = pattern;
    }
    if let Some(format) = string_var("AUDIO_OUTPUT_FORMAT") {
        config.output.format = OutputFormat::from_str_or_default(&format);
    }
    if let Some(bitrate) = string_var("AUDIO_BITRATE") {
        config.output.bitrate = bitrate;
    }
    if let Some(sample_rate) = parse_var("AUDIO_SAMPLE_RATE")? {
        config.output.sample_rate = sample_rate;
    }
    if let Some(channels) = string_var("AUDIO_CHANNELS") {
        config.output.channels = ChannelLayout::from_str_or_default(&channels);
    }
    if let Some(name) = string_var("MERGED_FILE_NAME") {
        config.output.merged_file_name = name;
    }
    if let Some(concurrency) = parse_var("SYNTHESIS_CONCURRENCY")? {
        config.output.concurrency = concurrency;
    }

    // Merge processing
    if let Some(silence) = parse_var("MERGE_SILENCE_DURATION")? {
        config.processing.silence_duration = silence;
    }
    if let Some(normalize) = bool_var("MERGE_NORMALIZE_LEVELS")? {
        config.processing.normalize_levels = normalize;
    }
    if let Some(strict) = bool_var("MERGE_STRICT_METRICS")? {
        config.processing.strict_metrics = strict;
    }

    // Transcoder
    if let Some(path) = string_var("FFMPEG_PATH") {
        config.transcoder.path = PathBuf::from(path);
    }
    if let Some(path) = string_var("FFPROBE_PATH") {
        config.transcoder.probe_path = Some(PathBuf::from(path));
    }
    if let Some(timeout) = parse_var("FFMPEG_TIMEOUT_MS")? {
        config.transcoder.timeout_ms = timeout;
    }

    // HTTP server
    if let Some(host) = string_var("HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse_var("PORT")? {
        config.server.port = port;
    }
    if let Some(rps) = parse_var("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.server.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parse_var("RATE_LIMIT_BURST_SIZE")? {
        config.server.rate_limit_burst_size = burst;
    }
    if let Some(root) = string_var("DATA_ROOT") {
        config.server.data_root = PathBuf::from(root);
    }
    if let Some(required) = bool_var("AUTH_REQUIRED")? {
        config.server.auth_required = required;
    }
    // comma separated
    if let Some(secrets) = string_var("AUTH_API_SECRETS") {
        config.server.auth_api_secrets = secrets
            .split(',')
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .map(str::to_string)
            .collect();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_unset_vars_keep_defaults() {
        cleanup_env_vars();

        let mut config = PipelineConfig::default();
        apply_env(&mut config).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    #[serial]
    fn test_empty_var_is_ignored() {
        cleanup_env_vars();
        unsafe {
            env::set_var("AUDIO_FOLDER", "  ");
        }

        let mut config = PipelineConfig::default();
        apply_env(&mut config).unwrap();
        assert_eq!(config.output.audio_folder, "audio");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_enum_and_bool_vars() {
        cleanup_env_vars();
        unsafe {
            env::set_var("AUDIO_CHANNELS", "Stereo");
            env::set_var("AUDIO_OUTPUT_FORMAT", "wav");
            env::set_var("MERGE_STRICT_METRICS", "yes");
            env::set_var("FFPROBE_PATH", "/opt/bin/ffprobe");
        }

        let mut config = PipelineConfig::default();
        apply_env(&mut config).unwrap();
        assert_eq!(config.output.channels, ChannelLayout::Stereo);
        assert_eq!(config.output.format, OutputFormat::Wav);
        assert!(config.processing.strict_metrics);
        assert_eq!(
            config.transcoder.probe_program(),
            PathBuf::from("/opt/bin/ffprobe")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_server_auth_vars() {
        cleanup_env_vars();
        unsafe {
            env::set_var("AUTH_REQUIRED", "true");
            env::set_var("AUTH_API_SECRETS", "first, second,,");
            env::set_var("DATA_ROOT", "/srv/newscast");
        }

        let mut config = PipelineConfig::default();
        apply_env(&mut config).unwrap();
        assert!(config.server.auth_required);
        assert_eq!(config.server.auth_api_secrets, vec!["first", "second"]);
        assert_eq!(config.server.data_root, PathBuf::from("/srv/newscast"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_bool_names_variable() {
        cleanup_env_vars();
        unsafe {
            env::set_var("MERGE_NORMALIZE_LEVELS", "maybe");
        }

        let mut config = PipelineConfig::default();
        let err = apply_env(&mut config).unwrap_err();
        assert!(err.contains("MERGE_NORMALIZE_LEVELS"));

        cleanup_env_vars();
    }
}
