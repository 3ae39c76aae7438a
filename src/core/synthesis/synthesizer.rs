use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::manifest::{MANIFEST_FILE_NAME, SynthesisManifest};
use super::naming::{FilenamePattern, SpeakerAliases, music_placeholder};
use super::progress::{NoopProgressSink, OutcomeStatus, ProgressSink, ProgressTracker};
use crate::config::{OutputConfig, PipelineConfig};
use crate::core::mp3;
use crate::core::rate_limit::RateLimiterPool;
use crate::core::retry::RetryManager;
use crate::core::script::{DialogueSegment, NewscastScript};
use crate::core::tts::{GoogleTts, RemoteVoice, SpeechClient, TtsConfig, VoiceCatalog};
use crate::errors::{ErrorKind, PipelineError, PipelineResult};

/// Result of one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisOutcome {
    pub segment: DialogueSegment,
    /// Display alias used for the `{speaker}` placeholder
    pub speaker_alias: String,
    pub status: OutcomeStatus,
    /// Path relative to the output directory, set on success
    pub file_path: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub duration_seconds: Option<f64>,
    pub processing_ms: u64,
}

/// Turns script segments into audio files
///
/// Spoken segments go through voice validation, rate limiting and retry
/// before the audio is written under the audio folder. Music segments are
/// skipped without touching the provider or the limiter. Each segment is
/// independent: a failure is recorded and the batch continues.
pub struct SpeechSynthesizer {
    client: Arc<dyn SpeechClient>,
    catalog: Arc<VoiceCatalog>,
    limiter: Arc<RateLimiterPool>,
    retry: RetryManager,
    tts: TtsConfig,
    output: OutputConfig,
    pattern: FilenamePattern,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for SpeechSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSynthesizer")
            .field("provider", &self.client.provider_name())
            .field("voices", &self.catalog.len())
            .field("limiters", &self.limiter.len())
            .field("pattern", &self.pattern.template())
            .finish()
    }
}

impl SpeechSynthesizer {
    pub fn new(
        client: Arc<dyn SpeechClient>,
        catalog: Arc<VoiceCatalog>,
        limiter: Arc<RateLimiterPool>,
        config: &PipelineConfig,
    ) -> Self {
        let mut tts = config.tts.clone();
        // requests never carry the key; the client owns it
        tts.api_key = None;

        Self {
            client,
            catalog,
            limiter,
            retry: RetryManager::new(config.retry.clone()),
            tts,
            output: config.output.clone(),
            pattern: FilenamePattern::new(config.output.file_name_pattern.clone()),
            sink: Arc::new(NoopProgressSink),
        }
    }

    /// Google client, the built-in voice catalog and a limiter pool from `config`
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let client = GoogleTts::new(&config.tts)?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(VoiceCatalog::default()),
            Arc::new(RateLimiterPool::new(config.rate_limit.clone())),
            config,
        ))
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn limiter(&self) -> &RateLimiterPool {
        &self.limiter
    }

    pub async fn validate_credentials(&self) -> bool {
        self.client.validate_credentials().await
    }

    pub async fn list_voices(&self) -> PipelineResult<Vec<RemoteVoice>> {
        self.client.list_voices(Some(&self.tts.language_code)).await
    }

    /// Synthesize every spoken line of `script` into `<output_dir>/<audio_folder>`
    ///
    /// Writes the manifest next to the clips and returns it.
    pub async fn synthesize_script(
        &self,
        script: &NewscastScript,
        output_dir: &Path,
    ) -> PipelineResult<SynthesisManifest> {
        script.validate()?;

        let audio_dir = output_dir.join(&self.output.audio_folder);
        tokio::fs::create_dir_all(&audio_dir).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to create {}: {e}", audio_dir.display()))
        })?;

        info!(
            title = %script.title,
            segments = script.dialogue_lines.len(),
            spoken = script.spoken_count(),
            music = script.music_count(),
            provider = self.client.provider_name(),
            "Starting speech synthesis"
        );

        let started = Instant::now();
        let aliases = SpeakerAliases::from_hosts(script.hosts.as_ref());
        let outcomes = self
            .synthesize_segments(&script.dialogue_lines, &aliases, &audio_dir)
            .await;

        let manifest = SynthesisManifest::from_outcomes(script, &outcomes, started.elapsed());
        let manifest_path = audio_dir.join(MANIFEST_FILE_NAME);
        manifest.save(&manifest_path).await?;

        for outcome in outcomes.iter().filter(|o| !o.segment.kind.is_spoken()) {
            info!(
                sequence = outcome.segment.sequence,
                placeholder = %music_placeholder(outcome.segment.sequence, outcome.segment.kind),
                "Music segment needs externally supplied audio"
            );
        }

        info!(
            manifest = %manifest_path.display(),
            generated = manifest.generated_audio_files,
            failed = manifest.failed_audio_files,
            skipped = manifest.skipped_music_files,
            success_rate = %manifest.metadata.success_rate,
            "Speech synthesis finished"
        );
        Ok(manifest)
    }

    /// Process `segments` in sequence order
    ///
    /// With `output.concurrency > 1` several segments are in flight at once;
    /// outcomes are still returned in sequence order and all requests share
    /// the limiter pool.
    pub async fn synthesize_segments(
        &self,
        segments: &[DialogueSegment],
        aliases: &SpeakerAliases,
        audio_dir: &Path,
    ) -> Vec<SynthesisOutcome> {
        let mut ordered = segments.to_vec();
        ordered.sort_by_key(|s| s.sequence);

        let mut tracker = ProgressTracker::new(ordered.len());
        let mut outcomes = Vec::with_capacity(ordered.len());

        let mut results = stream::iter(
            ordered
                .into_iter()
                .map(|segment| self.process_segment(segment, aliases, audio_dir)),
        )
        .buffered(self.output.concurrency.max(1));

        while let Some(outcome) = results.next().await {
            let message = match outcome.status {
                OutcomeStatus::Success => format!(
                    "Generated segment {} ({})",
                    outcome.segment.sequence,
                    outcome.file_path.as_deref().unwrap_or_default()
                ),
                OutcomeStatus::Failure => {
                    format!("Failed segment {}", outcome.segment.sequence)
                }
                OutcomeStatus::Skipped => format!(
                    "Skipped {} segment {}",
                    outcome.segment.kind, outcome.segment.sequence
                ),
            };
            let elapsed = std::time::Duration::from_millis(outcome.processing_ms);
            if let Some(update) = tracker.record(outcome.status, elapsed, message) {
                self.sink.on_progress(&update);
            }
            outcomes.push(outcome);
        }

        info!("{}", tracker.summary());
        outcomes
    }

    async fn process_segment(
        &self,
        segment: DialogueSegment,
        aliases: &SpeakerAliases,
        audio_dir: &Path,
    ) -> SynthesisOutcome {
        let started = Instant::now();
        let speaker_alias = if segment.kind.is_spoken() {
            aliases.alias(&segment.speaker)
        } else {
            String::new()
        };

        if !segment.kind.is_spoken() {
            debug!(sequence = segment.sequence, kind = %segment.kind, "Skipping non-spoken segment");
            return SynthesisOutcome {
                segment,
                speaker_alias,
                status: OutcomeStatus::Skipped,
                file_path: None,
                error: None,
                error_kind: None,
                duration_seconds: None,
                processing_ms: 0,
            };
        }

        let result = self
            .synthesize_segment(&segment, &speaker_alias, audio_dir)
            .await;
        let processing_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok((file_path, duration)) => {
                debug!(
                    sequence = segment.sequence,
                    file = %file_path,
                    duration_secs = duration,
                    processing_ms = processing_ms,
                    "Segment synthesized"
                );
                SynthesisOutcome {
                    segment,
                    speaker_alias,
                    status: OutcomeStatus::Success,
                    file_path: Some(file_path),
                    error: None,
                    error_kind: None,
                    duration_seconds: Some(duration),
                    processing_ms,
                }
            }
            Err(e) => {
                error!(
                    sequence = segment.sequence,
                    speaker = %segment.speaker,
                    code = e.code(),
                    error = %e,
                    "Segment synthesis failed"
                );
                SynthesisOutcome {
                    segment,
                    speaker_alias,
                    status: OutcomeStatus::Failure,
                    file_path: None,
                    error: Some(e.to_string()),
                    error_kind: Some(e.kind()),
                    duration_seconds: None,
                    processing_ms,
                }
            }
        }
    }

    /// Returns the relative file path and the estimated clip duration
    async fn synthesize_segment(
        &self,
        segment: &DialogueSegment,
        speaker_alias: &str,
        audio_dir: &Path,
    ) -> PipelineResult<(String, f64)> {
        if segment.text.trim().is_empty() {
            return Err(PipelineError::Validation(format!(
                "Segment {} has no text to synthesize",
                segment.sequence
            )));
        }
        self.catalog.get(&segment.voice_model)?;

        let request = self.tts.request_for(&segment.text, &segment.voice_model);
        let context = format!("synthesize segment {}", segment.sequence);
        let limiter = &self.limiter;
        let client = &self.client;
        let request = &request;

        let audio = self
            .retry
            .execute_with_retry(&context, || async move {
                limiter.wait_for_clearance().await;
                client.synthesize(request).await
            })
            .await?;

        if audio.is_empty() {
            warn!(sequence = segment.sequence, "Provider returned an empty clip");
        }

        let file_name = self
            .pattern
            .render(segment.sequence, segment.kind, speaker_alias);
        let path = audio_dir.join(&file_name);
        tokio::fs::write(&path, &audio).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to write {}: {e}", path.display()))
        })?;

        let duration =
            mp3::calculate_accurate_duration(&audio, &segment.text, self.tts.speaking_rate);
        Ok((format!("{}/{}", self.output.audio_folder, file_name), duration))
    }
}
