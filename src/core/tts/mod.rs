//! Speech synthesis clients
//!
//! [`SpeechClient`] is the seam between the synthesizer and a concrete provider.
//! [`GoogleTts`] talks to the Google Cloud Text-to-Speech REST API; tests can
//! substitute any other implementation.
//!
//! [`VoiceCatalog`] is the immutable table of voices the pipeline accepts.

pub mod google;
pub mod voices;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::errors::PipelineResult;

pub use google::{GOOGLE_TTS_URL, GoogleTts};
pub use voices::{ContentType, Gender, VoiceCatalog, VoiceProfile};

/// Output encoding requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    Linear16,
    OggOpus,
    Mulaw,
    Alaw,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::Mulaw => "MULAW",
            AudioEncoding::Alaw => "ALAW",
        }
    }

    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "LINEAR16" => AudioEncoding::Linear16,
            "OGG_OPUS" => AudioEncoding::OggOpus,
            "MULAW" => AudioEncoding::Mulaw,
            "ALAW" => AudioEncoding::Alaw,
            _ => AudioEncoding::Mp3,
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider settings shared by every request
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Google Cloud API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub language_code: String,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
    pub audio_encoding: AudioEncoding,
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GOOGLE_TTS_URL.to_string(),
            language_code: "ko-KR".to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
            volume_gain_db: 0.0,
            audio_encoding: AudioEncoding::Mp3,
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("language_code", &self.language_code)
            .field("speaking_rate", &self.speaking_rate)
            .field("pitch", &self.pitch)
            .field("volume_gain_db", &self.volume_gain_db)
            .field("audio_encoding", &self.audio_encoding)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TtsConfig {
    /// Build a request for `text` spoken by `voice_name`
    pub fn request_for(&self, text: &str, voice_name: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            language_code: self.language_code.clone(),
            voice_name: voice_name.to_string(),
            audio_encoding: self.audio_encoding,
            speaking_rate: self.speaking_rate,
            pitch: self.pitch,
            volume_gain_db: self.volume_gain_db,
        }
    }
}

/// One synthesis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub language_code: String,
    pub voice_name: String,
    pub audio_encoding: AudioEncoding,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
}

/// Voice advertised by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVoice {
    #[serde(default)]
    pub language_codes: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub ssml_gender: Option<String>,
    #[serde(default)]
    pub natural_sample_rate_hertz: Option<u32>,
}

/// Text used by the credential probe
pub const PROBE_TEXT: &str = "테스트";
/// Voice used by the credential probe
pub const PROBE_VOICE: &str = "ko-KR-Chirp3-HD-Charon";

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesize `request` and return the raw encoded audio
    async fn synthesize(&self, request: &SynthesisRequest) -> PipelineResult<Bytes>;

    /// Voices the provider offers, optionally filtered by language
    async fn list_voices(&self, language_code: Option<&str>) -> PipelineResult<Vec<RemoteVoice>>;

    fn provider_name(&self) -> &'static str;

    /// Issue a minimal request to check the credentials.
    async fn validate_credentials(&self) -> bool {
        let request = SynthesisRequest {
            text: PROBE_TEXT.to_string(),
            language_code: "ko-KR".to_string(),
            voice_name: PROBE_VOICE.to_string(),
            audio_encoding: AudioEncoding::Mp3,
            speaking_rate: 1.0,
            pitch: 0.0,
            volume_gain_db: 0.0,
        };
        match self.synthesize(&request).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    provider = self.provider_name(),
                    error = %e,
                    "Credential check failed"
                );
                false
            }
        }
    }
}
