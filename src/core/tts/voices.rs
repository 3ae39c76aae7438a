//! Voice catalog
//!
//! The catalog is built once at startup and handed to the synthesizer. Lookups
//! are by exact voice id; an unknown id is a configuration error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::script::{HostProfile, Hosts};
use crate::errors::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one synthesis voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub display_name: String,
    pub gender: Gender,
    pub description: String,
    pub role: String,
    pub family: String,
}

impl VoiceProfile {
    pub fn new(
        voice_id: &str,
        display_name: &str,
        gender: Gender,
        description: &str,
        role: &str,
        family: &str,
    ) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            display_name: display_name.to_string(),
            gender,
            description: description.to_string(),
            role: role.to_string(),
            family: family.to_string(),
        }
    }
}

/// Kind of program a host lineup is picked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Newscast,
    Report,
    Analysis,
    Entertainment,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Newscast => "newscast",
            ContentType::Report => "report",
            ContentType::Analysis => "analysis",
            ContentType::Entertainment => "entertainment",
        }
    }

    /// Voice ids for host1 and host2
    pub fn voice_pair(&self) -> (&'static str, &'static str) {
        match self {
            ContentType::Newscast => ("ko-KR-Chirp3-HD-Charon", "ko-KR-Chirp3-HD-Aoede"),
            ContentType::Report => ("ko-KR-Chirp3-HD-Leda", "ko-KR-Chirp3-HD-Fenrir"),
            ContentType::Analysis => ("ko-KR-Chirp3-HD-Orus", "ko-KR-Chirp3-HD-Kore"),
            ContentType::Entertainment => ("ko-KR-Chirp3-HD-Puck", "ko-KR-Chirp3-HD-Zephyr"),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newscast" => Ok(ContentType::Newscast),
            "report" => Ok(ContentType::Report),
            "analysis" => Ok(ContentType::Analysis),
            "entertainment" => Ok(ContentType::Entertainment),
            other => Err(PipelineError::Validation(format!(
                "Unknown content type: {other} (expected newscast, report, analysis or entertainment)"
            ))),
        }
    }
}

/// Family tag of the Chirp 3 HD voices
pub const PREMIUM_CHIRP: &str = "premium_chirp";

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceCatalog {
    voices: BTreeMap<String, VoiceProfile>,
}

impl VoiceCatalog {
    pub fn new(profiles: impl IntoIterator<Item = VoiceProfile>) -> Self {
        Self {
            voices: profiles
                .into_iter()
                .map(|p| (p.voice_id.clone(), p))
                .collect(),
        }
    }

    /// The eight Korean Chirp 3 HD voices
    pub fn chirp3_hd() -> Self {
        use Gender::{Female, Male};
        Self::new([
            VoiceProfile::new("ko-KR-Chirp3-HD-Aoede", "이서연", Female, "부드럽고 따뜻한 목소리의 여성 아나운서", "메인 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Charon", "김민준", Male, "신뢰감 있고 안정적인 목소리의 남성 아나운서", "메인 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Fenrir", "박지훈", Male, "명확하고 힘있는 목소리의 남성 아나운서", "서브 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Kore", "정유진", Female, "지적이고 차분한 목소리의 여성 아나운서", "서브 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Leda", "한소영", Female, "밝고 친근한 목소리의 여성 아나운서", "리포터", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Orus", "최성호", Male, "깊이 있고 권위적인 목소리의 남성 아나운서", "시니어 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Puck", "윤태현", Male, "생동감 있고 활기찬 목소리의 남성 아나운서", "스포츠/엔터테인먼트 앵커", PREMIUM_CHIRP),
            VoiceProfile::new("ko-KR-Chirp3-HD-Zephyr", "강은비", Female, "선명하고 매력적인 목소리의 여성 아나운서", "날씨/문화 앵커", PREMIUM_CHIRP),
        ])
    }

    /// Exact lookup; unknown ids are a configuration error
    pub fn get(&self, voice_id: &str) -> PipelineResult<&VoiceProfile> {
        self.voices.get(voice_id).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "Invalid voice model: {voice_id} (available: {})",
                self.voice_ids().join(", ")
            ))
        })
    }

    pub fn contains(&self, voice_id: &str) -> bool {
        self.voices.contains_key(voice_id)
    }

    pub fn voice_ids(&self) -> Vec<&str> {
        self.voices.keys().map(String::as_str).collect()
    }

    pub fn by_gender(&self, gender: Gender) -> Vec<&VoiceProfile> {
        self.voices.values().filter(|v| v.gender == gender).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceProfile> {
        self.voices.values()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Default two-host lineup built from this catalog
    pub fn default_hosts(&self) -> PipelineResult<Hosts> {
        self.for_content(ContentType::Newscast)
    }

    /// Two-host lineup suited to `content`; both voices must be in the catalog
    pub fn for_content(&self, content: ContentType) -> PipelineResult<Hosts> {
        let (first, second) = content.voice_pair();
        let host = |voice_id: &str| -> PipelineResult<HostProfile> {
            let profile = self.get(voice_id)?;
            Ok(HostProfile {
                name: profile.display_name.clone(),
                voice_model: profile.voice_id.clone(),
                gender: profile.gender.to_string(),
            })
        };
        Ok(Hosts {
            host1: host(first)?,
            host2: host(second)?,
        })
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::chirp3_hd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_chirp_catalog_contents() {
        let catalog = VoiceCatalog::chirp3_hd();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.by_gender(Gender::Male).len(), 4);
        assert_eq!(catalog.by_gender(Gender::Female).len(), 4);

        let charon = catalog.get("ko-KR-Chirp3-HD-Charon").unwrap();
        assert_eq!(charon.display_name, "김민준");
        assert_eq!(charon.role, "메인 앵커");
        assert_eq!(charon.family, PREMIUM_CHIRP);
    }

    #[test]
    fn test_unknown_voice_is_configuration_error() {
        let catalog = VoiceCatalog::chirp3_hd();
        let err = catalog.get("en-US-Standard-A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("en-US-Standard-A"));
        assert!(!catalog.contains("ko-KR-Chirp3-HD-charon"), "lookup is exact");
    }

    #[test]
    fn test_default_hosts() {
        let hosts = VoiceCatalog::default().default_hosts().unwrap();
        assert_eq!(hosts.host1.name, "김민준");
        assert_eq!(hosts.host1.gender, "male");
        assert_eq!(hosts.host2.voice_model, "ko-KR-Chirp3-HD-Aoede");
    }

    #[test]
    fn test_lineup_per_content_type() {
        let catalog = VoiceCatalog::default();

        let report = catalog.for_content(ContentType::Report).unwrap();
        assert_eq!(report.host1.voice_model, "ko-KR-Chirp3-HD-Leda");
        assert_eq!(report.host1.gender, "female");
        assert_eq!(report.host2.name, "박지훈");

        let analysis = catalog.for_content(ContentType::Analysis).unwrap();
        assert_eq!(analysis.host1.name, "최성호");
        assert_eq!(analysis.host2.voice_model, "ko-KR-Chirp3-HD-Kore");

        let entertainment = catalog.for_content(ContentType::Entertainment).unwrap();
        assert_eq!(entertainment.host1.voice_model, "ko-KR-Chirp3-HD-Puck");
        assert_eq!(entertainment.host2.voice_model, "ko-KR-Chirp3-HD-Zephyr");

        assert_eq!(
            catalog.for_content(ContentType::default()).unwrap(),
            catalog.default_hosts().unwrap()
        );
    }

    #[test]
    fn test_every_lineup_pairs_two_distinct_catalog_voices() {
        let catalog = VoiceCatalog::chirp3_hd();
        for content in [
            ContentType::Newscast,
            ContentType::Report,
            ContentType::Analysis,
            ContentType::Entertainment,
        ] {
            let (first, second) = content.voice_pair();
            assert_ne!(first, second, "{content}");
            assert!(catalog.contains(first) && catalog.contains(second), "{content}");
            assert_ne!(
                catalog.get(first).unwrap().gender,
                catalog.get(second).unwrap().gender,
                "{content}"
            );
        }
    }

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("Report".parse::<ContentType>().unwrap(), ContentType::Report);
        assert_eq!(" analysis ".parse::<ContentType>().unwrap(), ContentType::Analysis);
        let err = "sports".parse::<ContentType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let parsed: ContentType = serde_json::from_str("\"entertainment\"").unwrap();
        assert_eq!(parsed, ContentType::Entertainment);
    }

    #[test]
    fn test_custom_catalog_substitution() {
        let catalog = VoiceCatalog::new([VoiceProfile::new(
            "fake-voice",
            "Tester",
            Gender::Female,
            "unit test voice",
            "anchor",
            "fake",
        )]);
        assert!(catalog.contains("fake-voice"));
        assert!(catalog.get("ko-KR-Chirp3-HD-Charon").is_err());
        assert!(catalog.default_hosts().is_err());
        assert!(catalog.for_content(ContentType::Report).is_err());
    }
}
