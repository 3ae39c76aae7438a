use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core::merge::{AudioMerger, FfmpegTranscoder};
use crate::core::rate_limit::RateLimiterPool;
use crate::core::synthesis::{SpeechSynthesizer, TracingProgressSink};
use crate::core::tts::{GoogleTts, VoiceCatalog};
use crate::errors::{PipelineError, PipelineResult};
use crate::utils::confine_path;

/// Shared state behind the HTTP surface
///
/// The limiter pool and voice catalog are created once and shared by every
/// request so provider limits hold across concurrent synthesis runs.
pub struct AppState {
    pub config: PipelineConfig,
    pub catalog: Arc<VoiceCatalog>,
    pub limiter: Arc<RateLimiterPool>,
    /// `None` when no API key is configured; synthesis endpoints then answer 400
    pub synthesizer: Option<SpeechSynthesizer>,
    pub merger: AudioMerger<FfmpegTranscoder>,
}

impl AppState {
    pub fn new(config: PipelineConfig) -> Arc<Self> {
        let catalog = Arc::new(VoiceCatalog::default());
        let limiter = Arc::new(RateLimiterPool::new(config.rate_limit.clone()));
        let sink = Arc::new(TracingProgressSink);

        let synthesizer = match GoogleTts::new(&config.tts) {
            Ok(client) => Some(
                SpeechSynthesizer::new(Arc::new(client), catalog.clone(), limiter.clone(), &config)
                    .with_progress_sink(sink.clone()),
            ),
            Err(e) => {
                warn!(error = %e, "Speech synthesis disabled");
                None
            }
        };
        let merger = AudioMerger::from_config(&config).with_progress_sink(sink);

        info!(
            voices = catalog.len(),
            limiters = limiter.len(),
            synthesis_enabled = synthesizer.is_some(),
            "Application state initialized"
        );

        Arc::new(Self {
            config,
            catalog,
            limiter,
            synthesizer,
            merger,
        })
    }

    /// Resolve a request path inside `server.data_root`
    pub fn resolve_path(&self, requested: &Path) -> PipelineResult<PathBuf> {
        confine_path(&self.config.server.data_root, requested)
    }

    pub fn synthesizer(&self) -> PipelineResult<&SpeechSynthesizer> {
        self.synthesizer.as_ref().ok_or_else(|| {
            PipelineError::Configuration("GOOGLE_CLOUD_API_KEY is not configured".to_string())
        })
    }
}
