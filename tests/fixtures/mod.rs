//! Test Fixtures Module
//!
//! Shared builders for the integration tests:
//! - MP3 byte streams with a known first frame header
//! - Newscast scripts written to disk
//! - Synthesis manifests pointing at generated clips
//! - A recording transcoder for merge runs without ffmpeg

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod transcoder;

use std::path::{Path, PathBuf};

use newscast_audio::core::script::{DialogueSegment, Hosts, HostProfile, NewscastScript, ScriptMetadata, SegmentKind};
use newscast_audio::core::synthesis::{
    AudioFileEntry, MANIFEST_FILE_NAME, SegmentRecord, SynthesisManifest, SynthesisMetadata,
};

pub const CHARON: &str = "ko-KR-Chirp3-HD-Charon";
pub const AOEDE: &str = "ko-KR-Chirp3-HD-Aoede";

/// MPEG-2 Layer III, 32 kbps, 24 kHz, no padding (the speech backend's output)
pub const MPEG2_32K_24K: [u8; 4] = [0xFF, 0xF3, 0x44, 0x00];

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, no padding
pub const MPEG1_128K_44K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

/// `header` followed by zero bytes up to `len`
pub fn mp3_clip(header: [u8; 4], len: usize) -> Vec<u8> {
    let mut bytes = header.to_vec();
    bytes.resize(len.max(4), 0);
    bytes
}

/// A 4000-byte 32 kbps clip, one second of audio
pub fn speech_clip() -> Vec<u8> {
    mp3_clip(MPEG2_32K_24K, 4000)
}

pub fn hosts() -> Hosts {
    Hosts {
        host1: HostProfile {
            name: "김민준".to_string(),
            voice_model: CHARON.to_string(),
            gender: "male".to_string(),
        },
        host2: HostProfile {
            name: "이서연".to_string(),
            voice_model: AOEDE.to_string(),
            gender: "female".to_string(),
        },
    }
}

/// Five segments: opening music at 0, four spoken lines at 1, 2, 4, 5 and
/// background music at 3
pub fn sample_script() -> NewscastScript {
    NewscastScript {
        title: "오늘의 주요 뉴스".to_string(),
        program_name: "AI 뉴스캐스트".to_string(),
        hosts: Some(hosts()),
        opening: None,
        main_content: None,
        closing: None,
        dialogue_lines: vec![
            DialogueSegment::spoken(1, "김민준", CHARON, "안녕하세요, 오늘의 뉴스입니다."),
            DialogueSegment::spoken(2, "이서연", AOEDE, "첫 번째 소식입니다."),
            DialogueSegment::music(3, SegmentKind::BackgroundMusic),
            DialogueSegment::spoken(4, "김민준", CHARON, "다음 소식입니다."),
            DialogueSegment::spoken(5, "이서연", AOEDE, "감사합니다."),
        ],
        metadata: ScriptMetadata {
            estimated_duration: Some("3분".to_string()),
            ..Default::default()
        },
    }
}

pub fn write_script(dir: &Path, script: &NewscastScript) -> PathBuf {
    let path = dir.join("newscast-script.json");
    std::fs::write(&path, serde_json::to_string_pretty(script).unwrap()).unwrap();
    path
}

/// Lay out `<topic>/audio/<seq>-dialogue.mp3` for each sequence and return
/// the matching manifest (not yet saved)
pub fn topic_with_clips(topic: &Path, sequences: &[u32]) -> SynthesisManifest {
    let audio_dir = topic.join("audio");
    std::fs::create_dir_all(&audio_dir).unwrap();

    let audio_files: Vec<AudioFileEntry> = sequences
        .iter()
        .map(|sequence| {
            let name = format!("{sequence:03}-dialogue.mp3");
            std::fs::write(audio_dir.join(&name), format!("clip-{sequence};")).unwrap();
            AudioFileEntry {
                file_path: format!("audio/{name}"),
                sequence: *sequence,
                kind: SegmentKind::Spoken,
                speaker: String::new(),
                duration_seconds: Some(2.0),
            }
        })
        .collect();

    let all_segments = sequences
        .iter()
        .map(|sequence| SegmentRecord {
            segment: DialogueSegment::spoken(*sequence, "김민준", CHARON, "텍스트"),
            has_audio: true,
        })
        .collect();

    SynthesisManifest {
        title: "테스트 뉴스".to_string(),
        program_name: "AI 뉴스캐스트".to_string(),
        generation_timestamp: chrono::Utc::now(),
        total_dialogue_lines: sequences.len(),
        dialogue_lines: sequences.len(),
        music_lines: 0,
        generated_audio_files: sequences.len(),
        skipped_music_files: 0,
        failed_audio_files: 0,
        audio_files,
        all_segments,
        failures: Vec::new(),
        metadata: SynthesisMetadata {
            audio_generation_time_ms: 1200,
            success_rate: "100.0%".to_string(),
            estimated_total_duration: None,
            total_audio_seconds: sequences.len() as f64 * 2.0,
        },
    }
}

pub fn manifest_path(topic: &Path) -> PathBuf {
    topic.join("audio").join(MANIFEST_FILE_NAME)
}
