//! Recording stand-in for ffmpeg
//!
//! Works on plain bytes: silence is the text `silence;` and concatenation
//! joins the listed files in order.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use newscast_audio::core::merge::{Transcoder, VolumeStats};
use newscast_audio::{PipelineError, PipelineResult};

/// Fake transcoder that records every call
#[derive(Default)]
pub struct RecordingTranscoder {
    pub calls: Mutex<Vec<String>>,
    pub concat_lists: Mutex<Vec<String>>,
    pub fail_concat: bool,
    pub fail_probe: bool,
    pub fail_volume: bool,
}

impl RecordingTranscoder {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn tool_failure(operation: &str) -> PipelineError {
    PipelineError::TranscoderFailed {
        operation: operation.to_string(),
        exit_code: Some(1),
        stdout: String::new(),
        stderr: "simulated failure".to_string(),
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn version(&self) -> PipelineResult<String> {
        self.record("version");
        Ok("ffmpeg version test".to_string())
    }

    async fn generate_silence(&self, _duration_secs: f64, output: &Path) -> PipelineResult<()> {
        self.record("silence");
        std::fs::write(output, "silence;")?;
        Ok(())
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> PipelineResult<()> {
        self.record("concat");
        let list = std::fs::read_to_string(list_file)?;
        self.concat_lists.lock().unwrap().push(list.clone());
        if self.fail_concat {
            return Err(tool_failure("concat"));
        }

        let mut merged = Vec::new();
        for line in list.lines() {
            let path = line
                .trim_start_matches("file '")
                .trim_end_matches('\'');
            merged.extend(std::fs::read(path)?);
        }
        std::fs::write(output, merged)?;
        Ok(())
    }

    async fn normalize(&self, input: &Path, output: &Path) -> PipelineResult<()> {
        self.record("normalize");
        std::fs::copy(input, output)?;
        Ok(())
    }

    async fn probe_duration(&self, _input: &Path) -> PipelineResult<f64> {
        self.record("probe");
        if self.fail_probe {
            return Err(tool_failure("probe"));
        }
        Ok(9.5)
    }

    async fn analyze_volume(&self, _input: &Path) -> PipelineResult<VolumeStats> {
        self.record("analyze");
        if self.fail_volume {
            return Err(tool_failure("analyze"));
        }
        Ok(VolumeStats {
            peak_db: Some(-1.0),
            mean_db: Some(-18.5),
        })
    }
}

/// `.merge-*` working directories left in `dir`
pub fn leftover_workdirs(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".merge-"))
        .collect()
}
