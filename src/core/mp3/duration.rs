use once_cell::sync::Lazy;
use regex::Regex;

use super::header::{FALLBACK_BITRATE_KBPS, parse_header};

static HANGUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣]").unwrap());
static LATIN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]+").unwrap());
static DIGIT_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,!?;:]").unwrap());

const HANGUL_CHARS_PER_SEC: f64 = 3.5;
const LATIN_WORDS_PER_SEC: f64 = 2.5;
const DIGIT_GROUPS_PER_SEC: f64 = 1.0;
const PUNCTUATION_PAUSE_SECS: f64 = 0.3;

pub const MIN_TEXT_ESTIMATE_SECS: f64 = 1.0;
pub const MAX_TEXT_ESTIMATE_SECS: f64 = 30.0;

const HEADER_WEIGHT: f64 = 0.7;
const TEXT_WEIGHT: f64 = 0.3;

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Duration in seconds, treating the whole buffer as one constant-bitrate stream
pub fn calculate_duration(bytes: &[u8]) -> f64 {
    let header = parse_header(bytes);
    let kbps = if header.is_valid && header.bitrate_kbps > 0 {
        header.bitrate_kbps
    } else {
        FALLBACK_BITRATE_KBPS
    };
    round2(bytes.len() as f64 * 8.0 / (f64::from(kbps) * 1000.0))
}

/// Heuristic speaking time for `text`, clamped to `[1.0, 30.0]` seconds
pub fn estimate_duration_from_text(text: &str, speaking_rate: f64) -> f64 {
    let base = HANGUL.find_iter(text).count() as f64 / HANGUL_CHARS_PER_SEC
        + LATIN_WORD.find_iter(text).count() as f64 / LATIN_WORDS_PER_SEC
        + DIGIT_GROUP.find_iter(text).count() as f64 / DIGIT_GROUPS_PER_SEC
        + PUNCTUATION.find_iter(text).count() as f64 * PUNCTUATION_PAUSE_SECS;

    let rate = if speaking_rate > 0.0 { speaking_rate } else { 1.0 };
    (base / rate).clamp(MIN_TEXT_ESTIMATE_SECS, MAX_TEXT_ESTIMATE_SECS)
}

/// Header duration when the header is valid, otherwise a 70/30 blend with the text estimate
pub fn calculate_accurate_duration(bytes: &[u8], text: &str, speaking_rate: f64) -> f64 {
    let header = parse_header(bytes);
    let from_bytes = calculate_duration(bytes);
    if header.is_valid && header.bitrate_kbps > 0 {
        return from_bytes;
    }
    let from_text = estimate_duration_from_text(text, speaking_rate);
    round2(HEADER_WEIGHT * from_bytes + TEXT_WEIGHT * from_text)
}

/// One-line summary of the first frame header and derived duration
pub fn describe(bytes: &[u8]) -> String {
    let header = parse_header(bytes);
    format!(
        "{} Layer {}, {} kbps, {} Hz, frame {} bytes{}, {:.2} s, {:.2} KB ({})",
        header.mpeg_version,
        header.layer,
        header.bitrate_kbps,
        header.sample_rate_hz,
        header.frame_length_bytes,
        if header.has_padding { " (padded)" } else { "" },
        calculate_duration(bytes),
        bytes.len() as f64 / 1024.0,
        if header.is_valid { "valid" } else { "fallback" }
    )
}
