//! Speech synthesis stage
//!
//! [`SpeechSynthesizer`] walks a script in sequence order and produces one
//! audio file per spoken line plus a [`SynthesisManifest`] that becomes the
//! merge stage's input.
//!
//! Per-segment state machine:
//!
//! ```text
//! pending ─┬─> skipped                       (music placeholder)
//!          └─> rate-limited wait ─> synthesizing ─┬─> success
//!                     ^                           ├─> retry ─┐
//!                     └───────────────────────────┘          │
//!                                                 └─> failure <┘ (fatal or exhausted)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use newscast_audio::config::PipelineConfig;
//! use newscast_audio::core::script::NewscastScript;
//! use newscast_audio::core::synthesis::SpeechSynthesizer;
//!
//! let config = PipelineConfig::from_env()?;
//! let script = NewscastScript::from_file("newscast-script.json".as_ref())?;
//! let synthesizer = SpeechSynthesizer::from_config(&config)?;
//! let manifest = synthesizer.synthesize_script(&script, "output/topic-01".as_ref()).await?;
//! println!("{} clips", manifest.generated_audio_files);
//! ```

pub mod manifest;
pub mod naming;
pub mod progress;
mod synthesizer;

pub use manifest::{
    AudioFileEntry, MANIFEST_FILE_NAME, SegmentFailure, SegmentRecord, SynthesisManifest,
    SynthesisMetadata,
};
pub use naming::{FilenamePattern, SpeakerAliases, music_placeholder};
pub use progress::{
    MergeProgress, MergeStage, NoopProgressSink, OutcomeStatus, PROGRESS_THROTTLE,
    ProgressSink, ProgressTracker, ProgressUpdate, SynthesisStats, TracingProgressSink,
};
pub use synthesizer::{SpeechSynthesizer, SynthesisOutcome};
