//! Processing result sidecar

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::transcoder::VolumeStats;
use crate::core::mp3::round2;
use crate::core::synthesis::SynthesisMetadata;
use crate::errors::{PipelineError, PipelineResult};

/// File name of the result sidecar inside the output directory
pub const RESULT_FILE_NAME: &str = "newscast-audio-info.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub peak_db: Option<f64>,
    pub mean_db: Option<f64>,
    /// `|peak - mean|`, present only when both levels are known
    pub dynamic_range_db: Option<f64>,
}

impl From<VolumeStats> for QualityMetrics {
    fn from(stats: VolumeStats) -> Self {
        let dynamic_range_db = match (stats.peak_db, stats.mean_db) {
            (Some(peak), Some(mean)) => Some(round2((peak - mean).abs())),
            _ => None,
        };
        Self {
            peak_db: stats.peak_db,
            mean_db: stats.mean_db,
            dynamic_range_db,
        }
    }
}

/// Where the final duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Measured by the probe tool
    Probe,
    /// Sum of clip durations from the manifest plus silence
    Estimate,
}

/// Terminal artifact of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub title: String,
    pub program_name: String,
    pub input_files: usize,
    pub output_file: String,
    pub final_duration_seconds: f64,
    /// `"{m}m {s}s"`
    pub final_duration_formatted: String,
    pub duration_source: DurationSource,
    pub file_size_bytes: u64,
    /// `"{mb:.2} MB"`
    pub file_size_formatted: String,
    pub processing_time_ms: u64,
    pub silence_duration: f64,
    pub silence_insertions: usize,
    pub normalized: bool,
    pub quality_metrics: Option<QualityMetrics>,
    pub generation_timestamp: DateTime<Utc>,
    /// Metadata of the synthesis manifest this result was built from
    pub synthesis_metadata: SynthesisMetadata,
}

impl ProcessingResult {
    pub async fn save(&self, path: &Path) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to write {}: {e}", path.display()))
        })
    }

    pub async fn load(path: &Path) -> PipelineResult<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Validation(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_range() {
        let metrics = QualityMetrics::from(VolumeStats {
            peak_db: Some(-1.5),
            mean_db: Some(-20.25),
        });
        assert_eq!(metrics.dynamic_range_db, Some(18.75));

        let partial = QualityMetrics::from(VolumeStats {
            peak_db: Some(-1.5),
            mean_db: None,
        });
        assert_eq!(partial.dynamic_range_db, None);
    }

    #[test]
    fn test_duration_source_wire_value() {
        assert_eq!(
            serde_json::to_value(DurationSource::Estimate).unwrap(),
            serde_json::json!("estimate")
        );
    }
}
