// Text cleanup module
// Strips remaster/remix/edit suffixes so lyrics searches find the original song

use crate::config::CleanupConfig;
use crate::scrobbler::TrackRef;
use regex::{Regex, RegexBuilder};

/// Ordered suffix patterns; an empty list leaves text untouched
pub struct TextCleaner {
    patterns: Vec<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Invalid cleanup pattern '{}': {}", pattern, e);
            None
        }
    }
}

impl TextCleaner {
    pub fn new(config: &CleanupConfig) -> Self {
        let patterns = if config.enabled {
            config.patterns.iter().filter_map(|p| compile(p)).collect()
        } else {
            Vec::new()
        };
        Self { patterns }
    }

    pub fn clean(&self, text: &str) -> String {
        if self.patterns.is_empty() {
            return text.to_string();
        }
        self.patterns
            .iter()
            .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
            .trim()
            .to_string()
    }

    /// "artist title" with version suffixes removed
    pub fn lyrics_query(&self, track: &TrackRef) -> String {
        self.clean(&format!("{} {}", track.artist, track.title))
    }
}
