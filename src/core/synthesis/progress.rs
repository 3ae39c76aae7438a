//! Progress reporting
//!
//! [`ProgressTracker`] keeps the running counters of a synthesis batch and
//! decides when an update may be emitted (at most once per
//! [`PROGRESS_THROTTLE`]). Updates go to a [`ProgressSink`], which is called
//! synchronously and must not block.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::utils::format_rate;

/// Minimum gap between two emitted progress updates
pub const PROGRESS_THROTTLE: Duration = Duration::from_millis(100);

/// Final state of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Skipped,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
            OutcomeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cumulative statistics of a synthesis batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisStats {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Mean wall time of segments that reached the provider
    pub average_processing_ms: f64,
    /// `remaining segments * average_processing_ms`
    pub estimated_remaining_ms: u64,
    pub elapsed_ms: u64,
    /// Completed segments per second
    pub processing_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
    pub message: String,
    pub stats: SynthesisStats,
}

/// Merge pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStage {
    Validation,
    SilenceGeneration,
    Merging,
    Optimization,
    Metadata,
}

impl MergeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStage::Validation => "validation",
            MergeStage::SilenceGeneration => "silence_generation",
            MergeStage::Merging => "merging",
            MergeStage::Optimization => "optimization",
            MergeStage::Metadata => "metadata",
        }
    }

    /// Overall merge progress when the stage starts
    pub fn percentage(&self) -> u8 {
        match self {
            MergeStage::Validation => 10,
            MergeStage::SilenceGeneration => 25,
            MergeStage::Merging => 50,
            MergeStage::Optimization => 75,
            MergeStage::Metadata => 90,
        }
    }
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeProgress {
    pub stage: MergeStage,
    pub percentage: u8,
    pub message: String,
}

impl MergeProgress {
    pub fn new(stage: MergeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            percentage: stage.percentage(),
            message: message.into(),
        }
    }
}

/// Observer for pipeline progress. Both hooks default to no-ops.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, _update: &ProgressUpdate) {}

    fn on_merge_stage(&self, _progress: &MergeProgress) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}

/// Logs every event as an `info!` line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        info!(
            current = update.current,
            total = update.total,
            percentage = update.percentage,
            eta_ms = update.stats.estimated_remaining_ms,
            "{}",
            update.message
        );
    }

    fn on_merge_stage(&self, progress: &MergeProgress) {
        info!(
            stage = progress.stage.as_str(),
            percentage = progress.percentage,
            "{}",
            progress.message
        );
    }
}

/// Running counters of one synthesis batch
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    processed_time: Duration,
    started: Instant,
    last_emitted: Option<Instant>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            processed_time: Duration::ZERO,
            started: Instant::now(),
            last_emitted: None,
        }
    }

    /// Record a finished segment and return an update unless throttled
    ///
    /// `elapsed` is the wall time spent on the segment; skipped segments do
    /// not count towards the average processing time. The update for the
    /// last segment of the batch is never throttled.
    pub fn record(
        &mut self,
        status: OutcomeStatus,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Option<ProgressUpdate> {
        match status {
            OutcomeStatus::Success => self.succeeded += 1,
            OutcomeStatus::Failure => self.failed += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
        if status != OutcomeStatus::Skipped {
            self.processed_time += elapsed;
        }

        let now = Instant::now();
        if let Some(last) = self.last_emitted {
            if now.duration_since(last) < PROGRESS_THROTTLE && !self.is_complete() {
                return None;
            }
        }
        self.last_emitted = Some(now);

        let completed = self.completed();
        Some(ProgressUpdate {
            current: completed,
            total: self.total,
            percentage: self.percentage(),
            message: message.into(),
            stats: self.stats(),
        })
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed() as f64 / self.total as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total
    }

    pub fn stats(&self) -> SynthesisStats {
        let processed = self.succeeded + self.failed;
        let average_processing_ms = if processed == 0 {
            0.0
        } else {
            self.processed_time.as_secs_f64() * 1000.0 / processed as f64
        };
        let remaining = self.total.saturating_sub(self.completed());
        let elapsed = self.started.elapsed();
        let processing_rate = if elapsed.is_zero() {
            0.0
        } else {
            self.completed() as f64 / elapsed.as_secs_f64()
        };

        SynthesisStats {
            total: self.total,
            completed: self.completed(),
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            average_processing_ms,
            estimated_remaining_ms: (remaining as f64 * average_processing_ms).round() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            processing_rate,
        }
    }

    /// One-line summary, e.g. `4/5 done: 3 succeeded, 1 failed, 1 skipped (75.0%)`
    pub fn summary(&self) -> String {
        format!(
            "{}/{} done: {} succeeded, {} failed, {} skipped ({} success rate)",
            self.completed(),
            self.total,
            self.succeeded,
            self.failed,
            self.skipped,
            format_rate(self.succeeded, self.succeeded + self.failed),
        )
    }
}
