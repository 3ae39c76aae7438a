//! Newscast script model
//!
//! A script is produced upstream by the script writer and is read-only here.
//! Only `dialogue_lines` drive synthesis; the remaining fields are carried as
//! program metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::errors::{PipelineError, PipelineResult};

/// Kind of a script segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Line to be synthesized
    #[serde(rename = "dialogue", alias = "spoken")]
    Spoken,
    OpeningMusic,
    ClosingMusic,
    BackgroundMusic,
}

impl SegmentKind {
    /// Wire value, also used for the `{type}` filename placeholder
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Spoken => "dialogue",
            SegmentKind::OpeningMusic => "opening_music",
            SegmentKind::ClosingMusic => "closing_music",
            SegmentKind::BackgroundMusic => "background_music",
        }
    }

    pub fn is_spoken(&self) -> bool {
        matches!(self, SegmentKind::Spoken)
    }

    pub fn all() -> &'static [SegmentKind] {
        &[
            SegmentKind::Spoken,
            SegmentKind::OpeningMusic,
            SegmentKind::ClosingMusic,
            SegmentKind::BackgroundMusic,
        ]
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSegment {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub voice_model: String,
    #[serde(default)]
    pub text: String,
    pub sequence: u32,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
}

impl DialogueSegment {
    pub fn spoken(
        sequence: u32,
        speaker: impl Into<String>,
        voice_model: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            voice_model: voice_model.into(),
            text: text.into(),
            sequence,
            kind: SegmentKind::Spoken,
        }
    }

    pub fn music(sequence: u32, kind: SegmentKind) -> Self {
        Self {
            speaker: String::new(),
            voice_model: String::new(),
            text: String::new(),
            sequence,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub name: String,
    pub voice_model: String,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hosts {
    pub host1: HostProfile,
    pub host2: HostProfile,
}

/// Program metadata written by the script generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptMetadata {
    pub total_articles: Option<u32>,
    pub sources_count: Option<u32>,
    pub main_sources: Vec<String>,
    pub generation_timestamp: Option<String>,
    pub estimated_duration: Option<String>,
    pub total_dialogue_lines: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewscastScript {
    pub title: String,
    pub program_name: String,
    #[serde(default)]
    pub hosts: Option<Hosts>,
    #[serde(default)]
    pub opening: Option<String>,
    #[serde(default)]
    pub main_content: Option<String>,
    #[serde(default)]
    pub closing: Option<String>,
    pub dialogue_lines: Vec<DialogueSegment>,
    #[serde(default)]
    pub metadata: ScriptMetadata,
}

impl NewscastScript {
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let script: NewscastScript = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Validation(format!("Failed to read script {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Sequence numbers must be unique
    pub fn validate(&self) -> PipelineResult<()> {
        let mut seen = HashSet::new();
        let duplicates: Vec<String> = self
            .dialogue_lines
            .iter()
            .filter(|segment| !seen.insert(segment.sequence))
            .map(|segment| segment.sequence.to_string())
            .collect();

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "Duplicate segment sequence numbers: {}",
                duplicates.join(", ")
            )))
        }
    }

    pub fn spoken_count(&self) -> usize {
        self.dialogue_lines
            .iter()
            .filter(|s| s.kind.is_spoken())
            .count()
    }

    pub fn music_count(&self) -> usize {
        self.dialogue_lines.len() - self.spoken_count()
    }
}
