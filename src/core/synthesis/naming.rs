//! Output file naming
//!
//! A [`FilenamePattern`] renders `{sequence}`, `{type}` and `{speaker}` into a
//! file name. The speaker placeholder receives the display alias produced by
//! [`SpeakerAliases`], never the raw script name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::core::script::{Hosts, SegmentKind};

static REPEATED_HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());
static HYPHEN_BEFORE_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+\.").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Maps script speaker names onto filename-safe aliases
#[derive(Debug, Clone, Default)]
pub struct SpeakerAliases {
    aliases: HashMap<String, String>,
}

impl SpeakerAliases {
    /// `host1`/`host2` names become `host1-<name>`/`host2-<name>`
    pub fn from_hosts(hosts: Option<&Hosts>) -> Self {
        let mut aliases = HashMap::new();
        if let Some(hosts) = hosts {
            aliases.insert(
                hosts.host1.name.clone(),
                format!("host1-{}", sanitize(&hosts.host1.name)),
            );
            aliases.insert(
                hosts.host2.name.clone(),
                format!("host2-{}", sanitize(&hosts.host2.name)),
            );
        }
        Self { aliases }
    }

    pub fn alias(&self, speaker: &str) -> String {
        match self.aliases.get(speaker) {
            Some(alias) => alias.clone(),
            None => sanitize(speaker),
        }
    }
}

/// Whitespace runs become `_`; path separators become `-`
fn sanitize(name: &str) -> String {
    let name = name.trim().replace(['/', '\\'], "-");
    WHITESPACE.replace_all(&name, "_").into_owned()
}

/// Template such as `{sequence}-{type}-{speaker}.mp3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    template: String,
}

impl FilenamePattern {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a file name. `speaker` should already be an alias.
    ///
    /// Music segments render an empty speaker. Doubled hyphens are collapsed
    /// and hyphens before the extension or at the end are dropped.
    pub fn render(&self, sequence: u32, kind: SegmentKind, speaker: &str) -> String {
        let speaker = if kind.is_spoken() { speaker } else { "" };
        let rendered = self
            .template
            .replace("{sequence}", &format!("{sequence:03}"))
            .replace("{type}", kind.as_str())
            .replace("{speaker}", speaker);

        let collapsed = REPEATED_HYPHENS.replace_all(&rendered, "-");
        let collapsed = HYPHEN_BEFORE_DOT.replace_all(&collapsed, ".");
        collapsed.trim_end_matches('-').to_string()
    }
}

impl Default for FilenamePattern {
    fn default() -> Self {
        Self::new("{sequence}-{type}-{speaker}.mp3")
    }
}

/// Placeholder name logged for music segments, e.g. `000-opening_music.mp3`
pub fn music_placeholder(sequence: u32, kind: SegmentKind) -> String {
    format!("{sequence:03}-{}.mp3", kind.as_str())
}
