use serde::Serialize;
use std::fmt;

/// MPEG-1 Layer III bitrates in kbps, indexed by bits 15-12
pub const BITRATES_V1_L3: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];

/// MPEG-2 / MPEG-2.5 Layer III bitrates in kbps
pub const BITRATES_V2_L3: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
];

pub const SAMPLE_RATES_V1: [u32; 4] = [44100, 48000, 32000, 0];
pub const SAMPLE_RATES_V2: [u32; 4] = [22050, 24000, 16000, 0];
pub const SAMPLE_RATES_V25: [u32; 4] = [11025, 12000, 8000, 0];

/// Bitrate assumed when the header is unusable (speech backend default)
pub const FALLBACK_BITRATE_KBPS: u32 = 32;
/// Sample rate assumed when the header is unusable
pub const FALLBACK_SAMPLE_RATE_HZ: u32 = 24000;

const FRAME_SYNC: u32 = 0x7FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl MpegVersion {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0b11 => MpegVersion::Mpeg1,
            0b00 => MpegVersion::Mpeg25,
            // 0b10, and the reserved 0b01
            _ => MpegVersion::Mpeg2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MpegVersion::Mpeg1 => "MPEG1",
            MpegVersion::Mpeg2 => "MPEG2",
            MpegVersion::Mpeg25 => "MPEG2.5",
        }
    }

    pub fn samples_per_frame(&self) -> u32 {
        match self {
            MpegVersion::Mpeg1 => 1152,
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => 576,
        }
    }

    fn bitrate_table(&self) -> &'static [u32; 16] {
        match self {
            MpegVersion::Mpeg1 => &BITRATES_V1_L3,
            MpegVersion::Mpeg2 | MpegVersion::Mpeg25 => &BITRATES_V2_L3,
        }
    }

    fn sample_rate_table(&self) -> &'static [u32; 4] {
        match self {
            MpegVersion::Mpeg1 => &SAMPLE_RATES_V1,
            MpegVersion::Mpeg2 => &SAMPLE_RATES_V2,
            MpegVersion::Mpeg25 => &SAMPLE_RATES_V25,
        }
    }
}

impl fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoded 4-byte MPEG audio frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mp3FrameHeader {
    pub mpeg_version: MpegVersion,
    pub layer: u8,
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub has_padding: bool,
    pub frame_length_bytes: u32,
    pub is_valid: bool,
}

impl Mp3FrameHeader {
    /// Header used when the sync word is missing or the buffer is too short
    pub fn fallback() -> Self {
        Self {
            mpeg_version: MpegVersion::Mpeg2,
            layer: 3,
            bitrate_kbps: FALLBACK_BITRATE_KBPS,
            sample_rate_hz: FALLBACK_SAMPLE_RATE_HZ,
            has_padding: false,
            frame_length_bytes: 0,
            is_valid: false,
        }
    }
}

/// Decode the frame header found in the first four bytes of `bytes`.
///
/// Only the first frame is inspected. Bitrate lookups always use the Layer III
/// tables.
pub fn parse_header(bytes: &[u8]) -> Mp3FrameHeader {
    let Some(word) = bytes.get(..4) else {
        return Mp3FrameHeader::fallback();
    };
    let header = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);

    if (header >> 21) & 0x7FF != FRAME_SYNC {
        return Mp3FrameHeader::fallback();
    }

    let mpeg_version = MpegVersion::from_bits((header >> 19) & 0x3);
    let layer = match (header >> 17) & 0x3 {
        0b01 => 3,
        0b10 => 2,
        _ => 1,
    };

    let bitrate_index = ((header >> 12) & 0xF) as usize;
    let bitrate_kbps = match mpeg_version.bitrate_table()[bitrate_index] {
        0 => FALLBACK_BITRATE_KBPS,
        kbps => kbps,
    };

    let sample_rate_index = ((header >> 10) & 0x3) as usize;
    let sample_rate_hz = match mpeg_version.sample_rate_table()[sample_rate_index] {
        0 => FALLBACK_SAMPLE_RATE_HZ,
        hz => hz,
    };

    let has_padding = (header >> 9) & 0x1 == 1;
    let frame_length_bytes = (u64::from(mpeg_version.samples_per_frame())
        * u64::from(bitrate_kbps)
        * 1000
        / 8
        / u64::from(sample_rate_hz)) as u32
        + u32::from(has_padding);

    Mp3FrameHeader {
        mpeg_version,
        layer,
        bitrate_kbps,
        sample_rate_hz,
        has_padding,
        frame_length_bytes,
        is_valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sync | v2 | layer III | no CRC | bitrate idx 4 | sample rate idx 1
    const V2_L3_32K_24K: [u8; 4] = [0xFF, 0xF3, 0x44, 0x00];

    #[test]
    fn test_missing_sync_falls_back() {
        let header = parse_header(&[0x00, 0x11, 0x22, 0x33]);
        assert!(!header.is_valid);
        assert_eq!(header.bitrate_kbps, 32);
        assert_eq!(header.sample_rate_hz, 24000);
        assert_eq!(header.mpeg_version, MpegVersion::Mpeg2);
        assert_eq!(header.layer, 3);
    }

    #[test]
    fn test_short_buffer_falls_back() {
        assert_eq!(parse_header(&[0xFF, 0xF3]), Mp3FrameHeader::fallback());
        assert_eq!(parse_header(&[]), Mp3FrameHeader::fallback());
    }

    #[test]
    fn test_v2_layer3_matches_hand_computation() {
        let header = parse_header(&V2_L3_32K_24K);
        assert!(header.is_valid);
        assert_eq!(header.mpeg_version, MpegVersion::Mpeg2);
        assert_eq!(header.layer, 3);
        assert_eq!(header.bitrate_kbps, 32);
        assert_eq!(header.sample_rate_hz, 24000);
        assert!(!header.has_padding);
        // floor(576 * 32 * 1000 / 8 / 24000) = 96
        assert_eq!(header.frame_length_bytes, 96);
    }

    #[test]
    fn test_padding_adds_one_byte() {
        let mut bytes = V2_L3_32K_24K;
        bytes[2] |= 0x02;
        let header = parse_header(&bytes);
        assert!(header.has_padding);
        assert_eq!(header.frame_length_bytes, 97);
    }

    #[test]
    fn test_v1_layer3_128k_44100() {
        // sync | v1 | layer III | no CRC | bitrate idx 9 | sample rate idx 0
        let header = parse_header(&[0xFF, 0xFB, 0x90, 0x00]);
        assert_eq!(header.mpeg_version, MpegVersion::Mpeg1);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate_hz, 44100);
        // floor(1152 * 128000 / 8 / 44100) = 417
        assert_eq!(header.frame_length_bytes, 417);
    }

    #[test]
    fn test_zero_table_entries_use_fallbacks() {
        // v2.5, bitrate idx 0 ("free"), sample rate idx 3 (reserved)
        let header = parse_header(&[0xFF, 0xE3, 0x0C, 0x00]);
        assert!(header.is_valid);
        assert_eq!(header.mpeg_version, MpegVersion::Mpeg25);
        assert_eq!(header.bitrate_kbps, 32);
        assert_eq!(header.sample_rate_hz, 24000);
    }

    #[test]
    fn test_reserved_version_bits_read_as_mpeg2() {
        // version bits 01
        let header = parse_header(&[0xFF, 0xEB, 0x44, 0x00]);
        assert_eq!(header.mpeg_version, MpegVersion::Mpeg2);
    }
}
