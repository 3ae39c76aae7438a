//! Configuration module for the newscast audio pipeline
//!
//! Configuration comes from several sources: .env files, YAML files, and
//! environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Layering YAML over environment values
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use newscast_audio::config::PipelineConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = PipelineConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = PipelineConfig::from_file(&config_path)?;
//!
//! println!("Audio folder: {}", config.output.audio_folder);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use crate::core::rate_limit::RateLimitConfig;
pub use crate::core::retry::RetryConfig;
pub use crate::core::tts::TtsConfig;
pub use yaml::YamlConfig;

/// Container format of the merged program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
            OutputFormat::Ogg => "ogg",
        }
    }

    /// ffmpeg audio codec used when encoding this format
    pub fn codec(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "libmp3lame",
            OutputFormat::Wav => "pcm_s16le",
            OutputFormat::Ogg => "libvorbis",
        }
    }

    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "wav" => OutputFormat::Wav,
            "ogg" => OutputFormat::Ogg,
            _ => OutputFormat::Mp3,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
        }
    }

    pub fn count(&self) -> u8 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "stereo" => ChannelLayout::Stereo,
            _ => ChannelLayout::Mono,
        }
    }
}

/// File naming and encoding of synthesized and merged audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Folder under the output directory that receives per-line clips
    pub audio_folder: String,
    /// Template with `{sequence}`, `{type}`, `{speaker}` placeholders
    pub file_name_pattern: String,
    pub format: OutputFormat,
    /// ffmpeg bitrate string such as `32k`
    pub bitrate: String,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    /// Name of the merged program inside the output directory
    pub merged_file_name: String,
    /// Segments synthesized concurrently
    pub concurrency: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            audio_folder: "audio".to_string(),
            file_name_pattern: "{sequence}-{type}-{speaker}.mp3".to_string(),
            format: OutputFormat::Mp3,
            bitrate: "32k".to_string(),
            sample_rate: 24000,
            channels: ChannelLayout::Mono,
            merged_file_name: "newscast.mp3".to_string(),
            concurrency: 1,
        }
    }
}

/// Merge behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Seconds of silence between consecutive clips
    pub silence_duration: f64,
    pub normalize_levels: bool,
    /// Accepted but inert: the concat step copies streams without re-encoding
    pub fade_in: f64,
    /// Accepted but inert, see `fade_in`
    pub fade_out: f64,
    /// Fail the merge when duration or volume statistics cannot be read
    pub strict_metrics: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            silence_duration: 0.5,
            normalize_levels: true,
            fade_in: 0.1,
            fade_out: 0.2,
            strict_metrics: false,
        }
    }
}

/// External transcoder (ffmpeg) invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscoderConfig {
    pub path: PathBuf,
    /// Defaults to the ffmpeg path with `ffmpeg` replaced by `ffprobe`
    pub probe_path: Option<PathBuf>,
    pub timeout_ms: u64,
    pub overwrite: bool,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ffmpeg"),
            probe_path: None,
            timeout_ms: 300_000,
            overwrite: true,
        }
    }
}

impl TranscoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Path of the probe binary
    pub fn probe_program(&self) -> PathBuf {
        if let Some(path) = &self.probe_path {
            return path.clone();
        }
        match self.path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.contains("ffmpeg") => {
                self.path.with_file_name(name.replacen("ffmpeg", "ffprobe", 1))
            }
            _ => PathBuf::from("ffprobe"),
        }
    }
}

/// HTTP surface settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
    /// Every path named in a request is resolved inside this directory
    pub data_root: PathBuf,
    /// Require `Authorization: Bearer <secret>` on the `/v1` routes
    pub auth_required: bool,
    #[serde(skip_serializing)]
    pub auth_api_secrets: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            data_root: PathBuf::from("."),
            auth_required: false,
            auth_api_secrets: Vec::new(),
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("rate_limit_requests_per_second", &self.rate_limit_requests_per_second)
            .field("rate_limit_burst_size", &self.rate_limit_burst_size)
            .field("data_root", &self.data_root)
            .field("auth_required", &self.auth_required)
            .field(
                "auth_api_secrets",
                &format!("[{} REDACTED]", self.auth_api_secrets.len()),
            )
            .finish()
    }
}

impl ServerSettings {
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_api_secret_auth(&self) -> bool {
        self.auth_api_secrets.iter().any(|secret| !secret.is_empty())
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub tts: TtsConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    pub transcoder: TranscoderConfig,
    pub server: ServerSettings,
}

/// Zeroize the provider key when the configuration is dropped.
impl Drop for PipelineConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.tts.api_key {
            key.zeroize();
        }
        for secret in &mut self.server.auth_api_secrets {
            secret.zeroize();
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables only
    ///
    /// Values missing from the environment keep their defaults. The result is
    /// validated before it is returned.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file layered over environment variables
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs before this runs
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section against its allowed ranges
    pub fn validate(&self) -> Result<(), String> {
        validation::validate_tts(&self.tts)?;
        validation::validate_rate_limit(&self.rate_limit)?;
        validation::validate_retry(&self.retry)?;
        validation::validate_output(&self.output)?;
        validation::validate_processing(&self.processing)?;
        validation::validate_transcoder(&self.transcoder)?;
        validation::validate_server(&self.server)?;
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.tts
            .api_key
            .as_ref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    pub(super) fn cleanup_env_vars() {
        unsafe {
            for name in super::env::ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit.requests_per_second, 10);
        assert_eq!(config.rate_limit.burst_limit, 20);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.output.file_name_pattern, "{sequence}-{type}-{speaker}.mp3");
        assert_eq!(config.processing.silence_duration, 0.5);
        assert_eq!(config.transcoder.timeout_ms, 300_000);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_server_secrets_are_redacted() {
        let mut config = PipelineConfig::default();
        config.server.auth_required = true;
        config.server.auth_api_secrets = vec!["hunter2-secret".to_string()];
        assert!(config.validate().is_ok());
        assert!(config.server.has_api_secret_auth());

        let debug = format!("{:?}", config.server);
        assert!(!debug.contains("hunter2-secret"));
        assert!(debug.contains("1 REDACTED"));
    }

    #[test]
    fn test_probe_program_derivation() {
        let mut transcoder = TranscoderConfig::default();
        assert_eq!(transcoder.probe_program(), PathBuf::from("ffprobe"));

        transcoder.path = PathBuf::from("/opt/media/bin/ffmpeg");
        assert_eq!(
            transcoder.probe_program(),
            PathBuf::from("/opt/media/bin/ffprobe")
        );

        transcoder.probe_path = Some(PathBuf::from("/usr/local/bin/probe"));
        assert_eq!(
            transcoder.probe_program(),
            PathBuf::from("/usr/local/bin/probe")
        );
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        cleanup_env_vars();
        unsafe {
            env::set_var("GOOGLE_CLOUD_API_KEY", "env-key");
            env::set_var("TTS_REQUESTS_PER_SECOND", "4");
            env::set_var("FFMPEG_PATH", "/usr/bin/ffmpeg");
            env::set_var("MERGE_NORMALIZE_LEVELS", "false");
        }

        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.tts.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.rate_limit.requests_per_second, 4);
        assert_eq!(config.transcoder.path, PathBuf::from("/usr/bin/ffmpeg"));
        assert!(!config.processing.normalize_levels);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_malformed_number() {
        cleanup_env_vars();
        unsafe {
            env::set_var("RETRY_MAX_RETRIES", "many");
        }

        let err = PipelineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("RETRY_MAX_RETRIES"), "{err}");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
tts:
  api_key: "yaml-key"
  speaking_rate: 1.2
rate_limit:
  requests_per_second: 5
processing:
  silence_duration: 0.8
transcoder:
  timeout_ms: 60000
"#;
        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("GOOGLE_CLOUD_API_KEY", "env-key");
            env::set_var("TTS_BURST_LIMIT", "7");
        }

        let config = PipelineConfig::from_file(&config_path).unwrap();
        // YAML overrides ENV
        assert_eq!(config.tts.api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.tts.speaking_rate, 1.2);
        assert_eq!(config.rate_limit.requests_per_second, 5);
        // ENV value where YAML is silent
        assert_eq!(config.rate_limit.burst_limit, 7);
        assert_eq!(config.processing.silence_duration, 0.8);
        assert_eq!(config.transcoder.timeout(), Duration::from_secs(60));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = PipelineConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_invalid_values() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "tts:\n  speaking_rate: 9.0\n").unwrap();

        let err = PipelineConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("speaking_rate"), "{err}");
    }
}
