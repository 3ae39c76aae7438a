use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// tts:
///   api_key: "your-google-api-key"
///   language_code: "ko-KR"
///   speaking_rate: 1.0
///
/// rate_limit:
///   requests_per_second: 10
///   burst_limit: 20
///   delay_between_requests_ms: 100
///
/// retry:
///   max_retries: 3
///   backoff_multiplier: 2.0
///   initial_delay_ms: 1000
///
/// output:
///   audio_folder: "audio"
///   file_name_pattern: "{sequence}-{type}-{speaker}.mp3"
///   bitrate: "32k"
///   concurrency: 2
///
/// processing:
///   silence_duration: 0.5
///   normalize_levels: true
///
/// transcoder:
///   path: "/usr/bin/ffmpeg"
///   timeout_ms: 300000
///
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   data_root: "/srv/newscast"
///   auth_required: true
///   auth_api_secrets: ["change-me"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub tts: Option<TtsYaml>,
    pub rate_limit: Option<RateLimitYaml>,
    pub retry: Option<RetryYaml>,
    pub output: Option<OutputYaml>,
    pub processing: Option<ProcessingYaml>,
    pub transcoder: Option<TranscoderYaml>,
    pub server: Option<ServerYaml>,
}

/// Provider settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub language_code: Option<String>,
    pub speaking_rate: Option<f64>,
    pub pitch: Option<f64>,
    pub volume_gain_db: Option<f64>,
    /// MP3, LINEAR16, OGG_OPUS, MULAW, ALAW
    pub audio_encoding: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RateLimitYaml {
    pub requests_per_second: Option<u32>,
    pub burst_limit: Option<u32>,
    pub delay_between_requests_ms: Option<u64>,
    pub pool_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RetryYaml {
    pub max_retries: Option<u32>,
    pub backoff_multiplier: Option<f64>,
    pub initial_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputYaml {
    pub audio_folder: Option<String>,
    pub file_name_pattern: Option<String>,
    /// mp3, wav, ogg
    pub format: Option<String>,
    pub bitrate: Option<String>,
    pub sample_rate: Option<u32>,
    /// mono, stereo
    pub channels: Option<String>,
    pub merged_file_name: Option<String>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProcessingYaml {
    pub silence_duration: Option<f64>,
    pub normalize_levels: Option<bool>,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
    pub strict_metrics: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscoderYaml {
    pub path: Option<String>,
    pub probe_path: Option<String>,
    pub timeout_ms: Option<u64>,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub data_root: Option<String>,
    pub auth_required: Option<bool>,
    pub auth_api_secrets: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
tts:
  api_key: "yaml-key"
  language_code: "ko-KR"
  audio_encoding: "LINEAR16"

rate_limit:
  requests_per_second: 8
  burst_limit: 12
  pool_size: 2

retry:
  max_retries: 5

output:
  file_name_pattern: "{sequence}_{speaker}.mp3"
  channels: "stereo"
  concurrency: 3

processing:
  normalize_levels: false

transcoder:
  path: "/opt/ffmpeg/bin/ffmpeg"
  overwrite: false

server:
  port: 8080
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let tts = config.tts.as_ref().unwrap();
        assert_eq!(tts.api_key.as_deref(), Some("yaml-key"));
        assert_eq!(tts.audio_encoding.as_deref(), Some("LINEAR16"));
        assert!(tts.speaking_rate.is_none());

        let rate_limit = config.rate_limit.as_ref().unwrap();
        assert_eq!(rate_limit.requests_per_second, Some(8));
        assert_eq!(rate_limit.pool_size, Some(2));

        assert_eq!(config.retry.as_ref().unwrap().max_retries, Some(5));

        let output = config.output.as_ref().unwrap();
        assert_eq!(output.channels.as_deref(), Some("stereo"));
        assert_eq!(output.concurrency, Some(3));

        assert_eq!(
            config.processing.as_ref().unwrap().normalize_levels,
            Some(false)
        );
        assert_eq!(
            config.transcoder.as_ref().unwrap().path.as_deref(),
            Some("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(8080));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
retry:
  initial_delay_ms: 250
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.tts.is_none());
        assert!(config.output.is_none());
        assert_eq!(config.retry.unwrap().initial_delay_ms, Some(250));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap_or_default();
        assert!(config.tts.is_none());
        assert!(config.server.is_none());
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pipeline.yaml");
        fs::write(&config_path, "processing:\n  silence_duration: 1.5\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.processing.unwrap().silence_duration, Some(1.5));
    }

    #[test]
    fn test_yaml_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.yaml");
        fs::write(&config_path, "tts: [unterminated").unwrap();

        let err = YamlConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
