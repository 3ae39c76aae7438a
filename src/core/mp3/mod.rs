//! MP3 frame header decoding and duration estimation
//!
//! Durations are derived from the first frame header only: the whole file is
//! treated as a single constant-bitrate stream. This is exact for the CBR
//! output of the speech backend and wrong for VBR files, which are not
//! supported. When the header is missing, a text-based speaking-time heuristic
//! is blended in.
//!
//! # Example
//!
//! ```rust,ignore
//! use newscast_audio::core::mp3;
//!
//! let bytes = std::fs::read("001-dialogue-host1.mp3")?;
//! let header = mp3::parse_header(&bytes);
//! let seconds = mp3::calculate_accurate_duration(&bytes, "안녕하세요", 1.0);
//! ```

mod duration;
mod header;

pub use duration::{
    MAX_TEXT_ESTIMATE_SECS, MIN_TEXT_ESTIMATE_SECS, calculate_accurate_duration,
    calculate_duration, describe, estimate_duration_from_text,
};
pub use header::{
    BITRATES_V1_L3, BITRATES_V2_L3, FALLBACK_BITRATE_KBPS, FALLBACK_SAMPLE_RATE_HZ,
    Mp3FrameHeader, MpegVersion, SAMPLE_RATES_V1, SAMPLE_RATES_V2, SAMPLE_RATES_V25,
    parse_header,
};

pub(crate) use duration::round2;
