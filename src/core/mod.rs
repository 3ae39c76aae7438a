pub mod merge;
pub mod mp3;
pub mod rate_limit;
pub mod retry;
pub mod script;
pub mod synthesis;
pub mod tts;

// Re-export commonly used types for convenience
pub use merge::{AudioMerger, FfmpegTranscoder, MergePlan, ProcessingResult, Transcoder};
pub use rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter, RateLimiterPool};
pub use retry::{RetryConfig, RetryManager};
pub use script::{DialogueSegment, NewscastScript, SegmentKind};
pub use synthesis::{
    ProgressSink, SpeechSynthesizer, SynthesisManifest, SynthesisOutcome, TracingProgressSink,
};
pub use tts::{GoogleTts, SpeechClient, TtsConfig, VoiceCatalog, VoiceProfile};
