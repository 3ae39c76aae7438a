//! Layering of configuration sources

use std::path::PathBuf;

use super::env::apply_env;
use super::yaml::YamlConfig;
use super::{ChannelLayout, OutputFormat, PipelineConfig};
use crate::core::tts::AudioEncoding;

/// Build a configuration from defaults, the environment and optional YAML
///
/// Priority order (highest to lowest):
/// 1. YAML file values
/// 2. Environment variables
/// 3. Default values
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::default();
    apply_env(&mut config)?;

    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml);
    }

    Ok(config)
}

fn apply_yaml(config: &mut PipelineConfig, yaml: YamlConfig) {
    if let Some(tts) = yaml.tts {
        if let Some(key) = tts.api_key.filter(|k| !k.trim().is_empty()) {
            config.tts.api_key = Some(key);
        }
        if let Some(url) = tts.base_url {
            config.tts.base_url = url;
        }
        if let Some(code) = tts.language_code {
            config.tts.language_code = code;
        }
        if let Some(rate) = tts.speaking_rate {
            config.tts.speaking_rate = rate;
        }
        if let Some(pitch) = tts.pitch {
            config.tts.pitch = pitch;
        }
        if let Some(gain) = tts.volume_gain_db {
            config.tts.volume_gain_db = gain;
        }
        if let Some(encoding) = tts.audio_encoding {
            config.tts.audio_encoding = AudioEncoding::from_str_or_default(&encoding);
        }
        if let Some(timeout) = tts.request_timeout_secs {
            config.tts.request_timeout_secs = timeout;
        }
    }

    if let Some(rate_limit) = yaml.rate_limit {
        if let Some(rps) = rate_limit.requests_per_second {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = rate_limit.burst_limit {
            config.rate_limit.burst_limit = burst;
        }
        if let Some(delay) = rate_limit.delay_between_requests_ms {
            config.rate_limit.delay_between_requests_ms = delay;
        }
        if let Some(size) = rate_limit.pool_size {
            config.rate_limit.pool_size = size;
        }
    }

    if let Some(retry) = yaml.retry {
        if let Some(retries) = retry.max_retries {
            config.retry.max_retries = retries;
        }
        if let Some(multiplier) = retry.backoff_multiplier {
            config.retry.backoff_multiplier = multiplier;
        }
        if let Some(delay) = retry.initial_delay_ms {
            config.retry.initial_delay_ms = delay;
        }
    }

    if let Some(output) = yaml.output {
        if let Some(folder) = output.audio_folder {
            config.output.audio_folder = folder;
        }
        if let Some(pattern) = output.file_name_pattern {
            config.output.file_name_pattern = pattern;
        }
        if let Some(format) = output.format {
            config.output.format = OutputFormat::from_str_or_default(&format);
        }
        if let Some(bitrate) = output.bitrate {
            config.output.bitrate = bitrate;
        }
        if let Some(sample_rate) = output.sample_rate {
            config.output.sample_rate = sample_rate;
        }
        if let Some(channels) = output.channels {
            config.output.channels = ChannelLayout::from_str_or_default(&channels);
        }
        if let Some(name) = output.merged_file_name {
            config.output.merged_file_name = name;
        }
        if let Some(concurrency) = output.concurrency {
            config.output.concurrency = concurrency;
        }
    }

    if let Some(processing) = yaml.processing {
        if let Some(silence) = processing.silence_duration {
            config.processing.silence_duration = silence;
        }
        if let Some(normalize) = processing.normalize_levels {
            config.processing.normalize_levels = normalize;
        }
        if let Some(fade_in) = processing.fade_in {
            config.processing.fade_in = fade_in;
        }
        if let Some(fade_out) = processing.fade_out {
            config.processing.fade_out = fade_out;
        }
        if let Some(strict) = processing.strict_metrics {
            config.processing.strict_metrics = strict;
        }
    }

    if let Some(transcoder) = yaml.transcoder {
        if let Some(path) = transcoder.path {
            config.transcoder.path = PathBuf::from(path);
        }
        if let Some(path) = transcoder.probe_path {
            config.transcoder.probe_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = transcoder.timeout_ms {
            config.transcoder.timeout_ms = timeout;
        }
        if let Some(overwrite) = transcoder.overwrite {
            config.transcoder.overwrite = overwrite;
        }
    }

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.server.host = host;
        }
        if let Some(port) = server.port {
            config.server.port = port;
        }
        if let Some(rps) = server.rate_limit_requests_per_second {
            config.server.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = server.rate_limit_burst_size {
            config.server.rate_limit_burst_size = burst;
        }
        if let Some(root) = server.data_root {
            config.server.data_root = PathBuf::from(root);
        }
        if let Some(required) = server.auth_required {
            config.server.auth_required = required;
        }
        if let Some(secrets) = server.auth_api_secrets {
            config.server.auth_api_secrets = secrets;
        }
    }
}
