//! Synthesis manifest
//!
//! The manifest is the only artifact handed from the synthesis stage to the
//! merge stage. It lists every generated file explicitly, so the merger never
//! re-derives file names from segment fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::progress::OutcomeStatus;
use super::synthesizer::SynthesisOutcome;
use crate::core::mp3::round2;
use crate::core::script::{DialogueSegment, NewscastScript, SegmentKind};
use crate::errors::{ErrorKind, PipelineError, PipelineResult};
use crate::utils::format_rate;

/// File name of the manifest inside the audio folder
pub const MANIFEST_FILE_NAME: &str = "audio-files.json";

/// One generated clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFileEntry {
    /// Path relative to the directory that contains the audio folder
    pub file_path: String,
    pub sequence: u32,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Speaker display alias
    #[serde(default)]
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Script segment annotated with whether a clip exists for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(flatten)]
    pub segment: DialogueSegment,
    pub has_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub sequence: u32,
    pub error_kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMetadata {
    pub audio_generation_time_ms: u64,
    /// Successful clips over spoken segments, e.g. `"100.0%"`
    pub success_rate: String,
    #[serde(default)]
    pub estimated_total_duration: Option<String>,
    /// Sum of the measured clip durations
    #[serde(default)]
    pub total_audio_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisManifest {
    pub title: String,
    pub program_name: String,
    pub generation_timestamp: DateTime<Utc>,
    pub total_dialogue_lines: usize,
    pub dialogue_lines: usize,
    pub music_lines: usize,
    pub generated_audio_files: usize,
    pub skipped_music_files: usize,
    pub failed_audio_files: usize,
    pub audio_files: Vec<AudioFileEntry>,
    pub all_segments: Vec<SegmentRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SegmentFailure>,
    pub metadata: SynthesisMetadata,
}

impl SynthesisManifest {
    /// Assemble the manifest from per-segment outcomes
    ///
    /// `outcomes` must already be in sequence order.
    pub fn from_outcomes(
        script: &NewscastScript,
        outcomes: &[SynthesisOutcome],
        elapsed: Duration,
    ) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        let succeeded = count(OutcomeStatus::Success);
        let failed = count(OutcomeStatus::Failure);
        let skipped = count(OutcomeStatus::Skipped);
        let spoken = outcomes.iter().filter(|o| o.segment.kind.is_spoken()).count();

        let audio_files: Vec<AudioFileEntry> = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .filter_map(|o| {
                o.file_path.as_ref().map(|path| AudioFileEntry {
                    file_path: path.clone(),
                    sequence: o.segment.sequence,
                    kind: o.segment.kind,
                    speaker: o.speaker_alias.clone(),
                    duration_seconds: o.duration_seconds,
                })
            })
            .collect();

        let all_segments = outcomes
            .iter()
            .map(|o| SegmentRecord {
                segment: o.segment.clone(),
                has_audio: o.segment.kind.is_spoken() && o.status == OutcomeStatus::Success,
            })
            .collect();

        let failures = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failure)
            .map(|o| SegmentFailure {
                sequence: o.segment.sequence,
                error_kind: o.error_kind.unwrap_or(ErrorKind::Service),
                message: o.error.clone().unwrap_or_default(),
            })
            .collect();

        let total_audio_seconds =
            round2(audio_files.iter().filter_map(|f| f.duration_seconds).sum());

        Self {
            title: script.title.clone(),
            program_name: script.program_name.clone(),
            generation_timestamp: Utc::now(),
            total_dialogue_lines: outcomes.len(),
            dialogue_lines: spoken,
            music_lines: outcomes.len() - spoken,
            generated_audio_files: succeeded,
            skipped_music_files: skipped,
            failed_audio_files: failed,
            audio_files,
            all_segments,
            failures,
            metadata: SynthesisMetadata {
                audio_generation_time_ms: elapsed.as_millis() as u64,
                success_rate: format_rate(succeeded, spoken),
                estimated_total_duration: script.metadata.estimated_duration.clone(),
                total_audio_seconds,
            },
        }
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a manifest written by [`save`](Self::save)
    pub async fn load(path: &Path) -> PipelineResult<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Validation(format!("Failed to read manifest {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Write the manifest as pretty JSON, creating parent directories
    pub async fn save(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to write manifest {}: {e}", path.display()))
        })
    }

    /// Generated clips ordered by sequence
    pub fn sorted_audio_files(&self) -> Vec<&AudioFileEntry> {
        let mut files: Vec<&AudioFileEntry> = self.audio_files.iter().collect();
        files.sort_by_key(|f| f.sequence);
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::ScriptMetadata;
    use tempfile::TempDir;

    fn script() -> NewscastScript {
        NewscastScript {
            title: "오늘의 뉴스".to_string(),
            program_name: "AI 뉴스캐스트".to_string(),
            hosts: None,
            opening: None,
            main_content: None,
            closing: None,
            dialogue_lines: vec![],
            metadata: ScriptMetadata {
                estimated_duration: Some("3분".to_string()),
                ..Default::default()
            },
        }
    }

    fn outcome(segment: DialogueSegment, status: OutcomeStatus) -> SynthesisOutcome {
        let file_path = (status == OutcomeStatus::Success)
            .then(|| format!("audio/{:03}.mp3", segment.sequence));
        SynthesisOutcome {
            speaker_alias: segment.speaker.clone(),
            segment,
            status,
            file_path,
            error: (status == OutcomeStatus::Failure).then(|| "boom".to_string()),
            error_kind: (status == OutcomeStatus::Failure).then_some(ErrorKind::RetriesExhausted),
            duration_seconds: (status == OutcomeStatus::Success).then_some(1.25),
            processing_ms: 10,
        }
    }

    #[test]
    fn test_counts_and_has_audio() {
        let outcomes = vec![
            outcome(DialogueSegment::music(0, SegmentKind::OpeningMusic), OutcomeStatus::Skipped),
            outcome(DialogueSegment::spoken(1, "a", "v", "x"), OutcomeStatus::Success),
            outcome(DialogueSegment::spoken(2, "b", "v", "y"), OutcomeStatus::Failure),
            outcome(DialogueSegment::spoken(3, "a", "v", "z"), OutcomeStatus::Success),
        ];

        let manifest =
            SynthesisManifest::from_outcomes(&script(), &outcomes, Duration::from_millis(1500));

        assert_eq!(manifest.total_dialogue_lines, 4);
        assert_eq!(manifest.dialogue_lines, 3);
        assert_eq!(manifest.music_lines, 1);
        assert_eq!(manifest.generated_audio_files, 2);
        assert_eq!(manifest.failed_audio_files, 1);
        assert_eq!(manifest.skipped_music_files, 1);
        assert_eq!(manifest.metadata.success_rate, "66.7%");
        assert_eq!(manifest.metadata.audio_generation_time_ms, 1500);
        assert_eq!(manifest.metadata.total_audio_seconds, 2.5);
        assert_eq!(manifest.metadata.estimated_total_duration.as_deref(), Some("3분"));

        let has_audio: Vec<bool> = manifest.all_segments.iter().map(|s| s.has_audio).collect();
        assert_eq!(has_audio, vec![false, true, false, true]);
        assert_eq!(manifest.failures.len(), 1);
        assert_eq!(manifest.failures[0].sequence, 2);
    }

    #[test]
    fn test_wire_shape() {
        let outcomes = vec![outcome(
            DialogueSegment::spoken(1, "host1-김민준", "v", "안녕하세요"),
            OutcomeStatus::Success,
        )];
        let manifest = SynthesisManifest::from_outcomes(&script(), &outcomes, Duration::ZERO);
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["audio_files"][0]["file_path"], "audio/001.mp3");
        assert_eq!(json["audio_files"][0]["type"], "dialogue");
        assert_eq!(json["audio_files"][0]["speaker"], "host1-김민준");
        assert_eq!(json["all_segments"][0]["has_audio"], true);
        assert_eq!(json["all_segments"][0]["text"], "안녕하세요");
        assert!(json.get("failures").is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audio").join(MANIFEST_FILE_NAME);
        let outcomes = vec![
            outcome(DialogueSegment::spoken(2, "b", "v", "y"), OutcomeStatus::Success),
            outcome(DialogueSegment::spoken(1, "a", "v", "x"), OutcomeStatus::Success),
        ];
        let manifest = SynthesisManifest::from_outcomes(&script(), &outcomes, Duration::ZERO);

        manifest.save(&path).await.unwrap();
        let loaded = SynthesisManifest::load(&path).await.unwrap();
        assert_eq!(loaded, manifest);

        let order: Vec<u32> = loaded.sorted_audio_files().iter().map(|f| f.sequence).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_missing_manifest_is_validation_error() {
        let err = SynthesisManifest::load(Path::new("/nonexistent/audio-files.json"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
