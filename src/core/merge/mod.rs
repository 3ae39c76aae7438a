//! Audio merge stage
//!
//! [`AudioMerger`] turns a synthesis manifest into a single program:
//!
//! 1. validate that every referenced clip exists (all missing paths are reported)
//! 2. order clips by sequence and generate one shared silence clip
//! 3. concatenate with stream copy through the concat demuxer
//! 4. optionally re-encode through a loudness normalization filter
//! 5. measure duration and volume levels
//! 6. write a [`ProcessingResult`] sidecar next to the output
//!
//! Stream copy means no re-encoding during concatenation, so the configured
//! fade durations have no effect.
//!
//! The external tool sits behind the [`Transcoder`] trait; [`FfmpegTranscoder`]
//! is the production implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use newscast_audio::config::PipelineConfig;
//! use newscast_audio::core::merge::AudioMerger;
//!
//! let config = PipelineConfig::from_env()?;
//! let merger = AudioMerger::from_config(&config);
//! let result = merger.merge_topic("output/topic-01".as_ref()).await?;
//! println!("{} ({})", result.final_duration_formatted, result.file_size_formatted);
//! ```

mod merger;
pub mod plan;
pub mod result;
pub mod transcoder;

pub use merger::AudioMerger;
pub use plan::{MergePlan, PlanItem};
pub use result::{DurationSource, ProcessingResult, QualityMetrics, RESULT_FILE_NAME};
pub use transcoder::{
    FfmpegTranscoder, NORMALIZE_FILTER, ToolOutput, Transcoder, VolumeStats, parse_probe_duration,
    parse_volume_report, run_tool,
};
