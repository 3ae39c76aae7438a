//! Concatenation plan
//!
//! Clips are ordered by sequence. A single shared silence clip is placed
//! strictly between consecutive clips, never before the first or after the
//! last.

use std::path::{Path, PathBuf};

use crate::core::synthesis::AudioFileEntry;
use crate::errors::{PipelineError, PipelineResult};

/// One line of the concat list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanItem {
    Clip { sequence: u32, path: PathBuf },
    Silence(PathBuf),
}

impl PlanItem {
    pub fn path(&self) -> &Path {
        match self {
            PlanItem::Clip { path, .. } => path,
            PlanItem::Silence(path) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    base_dir: PathBuf,
    clips: Vec<(u32, PathBuf)>,
    silence: Option<PathBuf>,
    output: PathBuf,
}

impl MergePlan {
    /// Resolve `entries` against `base_dir` and sort them by sequence
    ///
    /// `silence` is the shared silence clip, or `None` to butt clips together.
    pub fn build(
        entries: &[AudioFileEntry],
        base_dir: &Path,
        silence: Option<PathBuf>,
        output: PathBuf,
    ) -> PipelineResult<Self> {
        if entries.is_empty() {
            return Err(PipelineError::Validation(
                "Manifest lists no audio files to merge".to_string(),
            ));
        }

        let mut clips: Vec<(u32, PathBuf)> = entries
            .iter()
            .map(|entry| (entry.sequence, base_dir.join(&entry.file_path)))
            .collect();
        clips.sort_by_key(|(sequence, _)| *sequence);

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            clips,
            silence,
            output,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn silence(&self) -> Option<&Path> {
        self.silence.as_deref()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Resolved clip paths in merge order
    pub fn clip_paths(&self) -> impl Iterator<Item = &Path> {
        self.clips.iter().map(|(_, path)| path.as_path())
    }

    /// Clips interleaved with silence
    pub fn items(&self) -> Vec<PlanItem> {
        let mut items = Vec::with_capacity(self.clips.len() * 2);
        for (index, (sequence, path)) in self.clips.iter().enumerate() {
            if index > 0 {
                if let Some(silence) = &self.silence {
                    items.push(PlanItem::Silence(silence.clone()));
                }
            }
            items.push(PlanItem::Clip {
                sequence: *sequence,
                path: path.clone(),
            });
        }
        items
    }

    pub fn silence_count(&self) -> usize {
        match self.silence {
            Some(_) => self.clips.len().saturating_sub(1),
            None => 0,
        }
    }

    /// Every clip that is not on disk, in merge order
    pub async fn missing_files(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for path in self.clip_paths() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                missing.push(path.display().to_string());
            }
        }
        missing
    }

    /// Concat demuxer list, one `file '<path>'` line per item
    pub fn concat_list(&self) -> String {
        self.items()
            .iter()
            .map(|item| format!("file '{}'\n", escape_path(item.path())))
            .collect()
    }
}

/// Quote escaping for the concat demuxer: `'` becomes `'\''`
fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
