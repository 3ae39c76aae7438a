use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use super::plan::MergePlan;
use super::result::{DurationSource, ProcessingResult, QualityMetrics, RESULT_FILE_NAME};
use super::transcoder::{FfmpegTranscoder, Transcoder, VolumeStats};
use crate::config::{OutputConfig, PipelineConfig, ProcessingConfig};
use crate::core::mp3::round2;
use crate::core::synthesis::{
    MANIFEST_FILE_NAME, MergeProgress, MergeStage, NoopProgressSink, ProgressSink,
    SynthesisManifest,
};
use crate::errors::{PipelineError, PipelineResult};
use crate::utils::{format_duration, format_file_size};

/// Joins the clips of a synthesis manifest into one program
///
/// Temporary artifacts (silence clip, concat list, intermediate encodes) live
/// in a per-run directory under the output directory and are removed when the
/// merge returns, whatever the outcome. The program and its result sidecar
/// are moved into place only after every transcoder and measuring step
/// succeeded.
pub struct AudioMerger<T: Transcoder> {
    transcoder: T,
    processing: ProcessingConfig,
    output: OutputConfig,
    overwrite: bool,
    sink: Arc<dyn ProgressSink>,
}

impl AudioMerger<FfmpegTranscoder> {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            FfmpegTranscoder::new(&config.transcoder, &config.output),
            config,
        )
    }
}

impl<T: Transcoder> AudioMerger<T> {
    pub fn new(transcoder: T, config: &PipelineConfig) -> Self {
        Self {
            transcoder,
            processing: config.processing.clone(),
            output: config.output.clone(),
            overwrite: config.transcoder.overwrite,
            sink: Arc::new(NoopProgressSink),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    fn stage(&self, stage: MergeStage, message: impl Into<String>) {
        self.sink.on_merge_stage(&MergeProgress::new(stage, message));
    }

    /// Merge a topic directory laid out by the synthesis stage
    ///
    /// Reads `<topic>/<audio_folder>/audio-files.json` and writes into `<topic>`.
    pub async fn merge_topic(&self, topic_dir: &Path) -> PipelineResult<ProcessingResult> {
        let manifest_path = topic_dir
            .join(&self.output.audio_folder)
            .join(MANIFEST_FILE_NAME);
        self.merge_manifest_file(&manifest_path, topic_dir).await
    }

    /// Merge the manifest at `manifest_path`
    ///
    /// Clip paths are resolved against the parent of the manifest's folder.
    pub async fn merge_manifest_file(
        &self,
        manifest_path: &Path,
        output_dir: &Path,
    ) -> PipelineResult<ProcessingResult> {
        let manifest = SynthesisManifest::load(manifest_path).await?;
        let base_dir = manifest_path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        self.merge(&manifest, base_dir, output_dir).await
    }

    /// Merge `manifest` into `<output_dir>/<merged_file_name>`
    pub async fn merge(
        &self,
        manifest: &SynthesisManifest,
        base_dir: &Path,
        output_dir: &Path,
    ) -> PipelineResult<ProcessingResult> {
        let started = Instant::now();
        self.stage(MergeStage::Validation, "Validating input files");

        let base_dir = std::path::absolute(base_dir)?;
        let output_dir = std::path::absolute(output_dir)?;
        let output_path = output_dir.join(&self.output.merged_file_name);

        let mut plan = MergePlan::build(&manifest.audio_files, &base_dir, None, output_path.clone())?;
        let missing = plan.missing_files().await;
        if !missing.is_empty() {
            return Err(PipelineError::MissingAudioFiles(missing));
        }
        if !self.overwrite && tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(PipelineError::Storage(format!(
                "{} already exists and overwrite is disabled",
                output_path.display()
            )));
        }

        let version = self.transcoder.version().await?;
        info!(transcoder = %version, clips = plan.clip_count(), "Starting audio merge");

        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to create {}: {e}", output_dir.display()))
        })?;
        let workdir = tempfile::Builder::new()
            .prefix(".merge-")
            .tempdir_in(&output_dir)
            .map_err(|e| {
                PipelineError::Storage(format!(
                    "Failed to create temporary directory in {}: {e}",
                    output_dir.display()
                ))
            })?;
        let extension = self.output.format.as_str();

        // Silence
        if self.processing.silence_duration > 0.0 && plan.clip_count() > 1 {
            self.stage(MergeStage::SilenceGeneration, "Generating silence clip");
            let silence_path = workdir.path().join(format!("silence.{extension}"));
            self.transcoder
                .generate_silence(self.processing.silence_duration, &silence_path)
                .await?;
            plan = MergePlan::build(
                &manifest.audio_files,
                &base_dir,
                Some(silence_path),
                output_path.clone(),
            )?;
        }

        // Concatenation
        self.stage(
            MergeStage::Merging,
            format!("Concatenating {} clips", plan.clip_count()),
        );
        let list_path = workdir.path().join("concat.txt");
        tokio::fs::write(&list_path, plan.concat_list())
            .await
            .map_err(|e| {
                PipelineError::Storage(format!("Failed to write {}: {e}", list_path.display()))
            })?;
        let merged_path = workdir.path().join(format!("merged.{extension}"));
        self.transcoder.concat(&list_path, &merged_path).await?;

        // Normalization
        let final_tmp = if self.processing.normalize_levels {
            self.stage(MergeStage::Optimization, "Normalizing loudness");
            let normalized_path = workdir.path().join(format!("normalized.{extension}"));
            self.transcoder
                .normalize(&merged_path, &normalized_path)
                .await?;
            normalized_path
        } else {
            merged_path
        };

        // Metadata, measured before anything leaves the working directory
        self.stage(MergeStage::Metadata, "Measuring output");
        let (final_duration, duration_source) = self.measure_duration(&final_tmp, manifest, &plan).await?;
        let quality_metrics = self.measure_volume(&final_tmp).await?;
        let file_size = tokio::fs::metadata(&final_tmp)
            .await
            .map_err(|e| {
                PipelineError::Storage(format!("Failed to stat {}: {e}", final_tmp.display()))
            })?
            .len();

        let result = ProcessingResult {
            title: manifest.title.clone(),
            program_name: manifest.program_name.clone(),
            input_files: plan.clip_count(),
            output_file: self.output.merged_file_name.clone(),
            final_duration_seconds: final_duration,
            final_duration_formatted: format_duration(final_duration),
            duration_source,
            file_size_bytes: file_size,
            file_size_formatted: format_file_size(file_size),
            processing_time_ms: started.elapsed().as_millis() as u64,
            silence_duration: self.processing.silence_duration,
            silence_insertions: plan.silence_count(),
            normalized: self.processing.normalize_levels,
            quality_metrics,
            generation_timestamp: chrono::Utc::now(),
            synthesis_metadata: manifest.metadata.clone(),
        };
        let sidecar_tmp = workdir.path().join(RESULT_FILE_NAME);
        result.save(&sidecar_tmp).await?;

        self.publish(&final_tmp, &output_path, &sidecar_tmp, &output_dir.join(RESULT_FILE_NAME))
            .await?;

        // explicit close so a cleanup failure is logged
        if let Err(e) = workdir.close() {
            warn!(error = %e, "Failed to remove merge working directory");
        }

        info!(
            output = %output_path.display(),
            duration = %result.final_duration_formatted,
            size = %result.file_size_formatted,
            "Audio merge finished"
        );
        Ok(result)
    }

    /// Move the program and then its sidecar out of the working directory
    ///
    /// A failed sidecar move takes the program back out, so a merge never
    /// reports an error with a fresh output left behind.
    async fn publish(
        &self,
        audio_tmp: &Path,
        audio_path: &Path,
        sidecar_tmp: &Path,
        sidecar_path: &Path,
    ) -> PipelineResult<()> {
        tokio::fs::rename(audio_tmp, audio_path).await.map_err(|e| {
            PipelineError::Storage(format!(
                "Failed to move merged audio to {}: {e}",
                audio_path.display()
            ))
        })?;

        if let Err(e) = tokio::fs::rename(sidecar_tmp, sidecar_path).await {
            if let Err(remove_err) = tokio::fs::remove_file(audio_path).await {
                warn!(error = %remove_err, "Failed to remove merged audio after sidecar failure");
            }
            return Err(PipelineError::Storage(format!(
                "Failed to move processing result to {}: {e}",
                sidecar_path.display()
            )));
        }
        Ok(())
    }

    async fn measure_duration(
        &self,
        merged: &Path,
        manifest: &SynthesisManifest,
        plan: &MergePlan,
    ) -> PipelineResult<(f64, DurationSource)> {
        match self.transcoder.probe_duration(merged).await {
            Ok(duration) => Ok((round2(duration), DurationSource::Probe)),
            Err(e) if !self.processing.strict_metrics => {
                let clips: f64 = manifest
                    .audio_files
                    .iter()
                    .filter_map(|f| f.duration_seconds)
                    .sum();
                let estimate =
                    round2(clips + plan.silence_count() as f64 * self.processing.silence_duration);
                warn!(error = %e, estimate_secs = estimate, "Duration probe failed, using estimate");
                Ok((estimate, DurationSource::Estimate))
            }
            Err(e) => Err(e),
        }
    }

    async fn measure_volume(&self, merged: &Path) -> PipelineResult<Option<QualityMetrics>> {
        let stats: VolumeStats = match self.transcoder.analyze_volume(merged).await {
            Ok(stats) => stats,
            Err(e) if !self.processing.strict_metrics => {
                warn!(error = %e, "Volume analysis failed, omitting quality metrics");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if stats.is_complete() {
            return Ok(Some(QualityMetrics::from(stats)));
        }
        if self.processing.strict_metrics {
            return Err(PipelineError::TranscoderOutput {
                operation: "analyze".to_string(),
                message: "volume report did not contain max_volume and mean_volume".to_string(),
            });
        }
        warn!(
            peak_db = ?stats.peak_db,
            mean_db = ?stats.mean_db,
            "Volume report not recognized, omitting quality metrics"
        );
        Ok(None)
    }
}

