//! Google Cloud Text-to-Speech REST client.
//!
//! - Synthesis: `POST {base}/text:synthesize?key=API_KEY`
//! - Voice list: `GET {base}/voices?key=API_KEY&languageCode=ko-KR`
//!
//! The response carries base64-encoded audio in `audioContent`, which is
//! decoded before it is returned. HTTP failures are mapped onto the pipeline
//! error taxonomy by [`GoogleTts::error_from_response`].
//!
//! # Example
//!
//! ```rust,ignore
//! use newscast_audio::core::tts::{GoogleTts, SpeechClient, TtsConfig};
//!
//! let config = TtsConfig { api_key: Some(key), ..Default::default() };
//! let client = GoogleTts::new(&config)?;
//! let audio = client.synthesize(&config.request_for("안녕하세요", "ko-KR-Chirp3-HD-Charon")).await?;
//! ```

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroize;

use super::{RemoteVoice, SpeechClient, SynthesisRequest, TtsConfig};
use crate::errors::{PipelineError, PipelineResult, classify::classify_provider_error};

/// Production endpoint
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<RemoteVoice>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleApiError,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// =============================================================================
// GoogleTts
// =============================================================================

pub struct GoogleTts {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTts")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Drop for GoogleTts {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl GoogleTts {
    /// Create a client from provider settings. The API key is required.
    pub fn new(config: &TtsConfig) -> PipelineResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration(
                    "GOOGLE_CLOUD_API_KEY is not configured".to_string(),
                )
            })?;

        Url::parse(&config.base_url).map_err(|e| {
            PipelineError::Configuration(format!("Invalid TTS base URL '{}': {e}", config.base_url))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> PipelineResult<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| {
            PipelineError::Configuration(format!("Invalid TTS endpoint '{path}': {e}"))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn build_request_body(request: &SynthesisRequest) -> serde_json::Value {
        json!({
            "input": { "text": request.text },
            "voice": {
                "languageCode": request.language_code,
                "name": request.voice_name,
            },
            "audioConfig": {
                "audioEncoding": request.audio_encoding.as_str(),
                "speakingRate": request.speaking_rate,
                "pitch": request.pitch,
                "volumeGainDb": request.volume_gain_db,
            },
        })
    }

    /// Map an HTTP failure onto the pipeline error taxonomy.
    pub fn error_from_response(status: u16, body: &str) -> PipelineError {
        let api_error = serde_json::from_str::<GoogleErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error);
        let detail = match &api_error {
            Some(err) if !err.message.is_empty() => err.message.clone(),
            _ => body.trim().to_string(),
        };

        if let Some(err) = &api_error {
            warn!(
                status = status,
                error_message = %err.message,
                error_status = ?err.status,
                "Google TTS API error"
            );
        }

        match status {
            401 | 403 => PipelineError::authentication(format!(
                "Google TTS authentication failed ({status}): {detail}"
            )),
            429 => PipelineError::Quota(format!(
                "Google TTS rate limit exceeded ({status}): {detail}"
            )),
            500..=599 => PipelineError::service(format!(
                "Google TTS server error ({status}): {detail}"
            )),
            _ => classify_provider_error(format!("TTS API request failed ({status}): {detail}")),
        }
    }

    /// The request URL carries the API key, so it is dropped from the message
    fn transport_error(e: reqwest::Error) -> PipelineError {
        let e = e.without_url();
        if e.is_timeout() || e.is_connect() {
            PipelineError::service(format!("Google TTS request failed: {e}"))
        } else {
            classify_provider_error(format!("Google TTS request failed: {e}"))
        }
    }
}

#[async_trait]
impl SpeechClient for GoogleTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> PipelineResult<Bytes> {
        let url = self.endpoint("text:synthesize", &[])?;
        debug!(voice = %request.voice_name, chars = request.text.chars().count(), "Sending synthesis request");

        let response = self
            .client
            .post(url)
            .json(&Self::build_request_body(request))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;
        if !status.is_success() {
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::service(format!("Unreadable synthesis response: {e}"))
        })?;
        let encoded = parsed
            .audio_content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| PipelineError::service("Synthesis response contained no audio content"))?;

        let audio = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| PipelineError::service(format!("Invalid base64 audio content: {e}")))?;
        Ok(Bytes::from(audio))
    }

    async fn list_voices(&self, language_code: Option<&str>) -> PipelineResult<Vec<RemoteVoice>> {
        let params: Vec<(&str, &str)> = language_code
            .map(|code| vec![("languageCode", code)])
            .unwrap_or_default();
        let url = self.endpoint("voices", &params)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;
        if !status.is_success() {
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        let parsed: VoicesResponse = serde_json::from_str(&body)?;
        Ok(parsed.voices)
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}
