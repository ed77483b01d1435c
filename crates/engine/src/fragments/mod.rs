//! Fragment generators — pure mappings from configuration to instruction text.
//!
//! Each generator returns an empty string when its fragment is disabled, so
//! the assembler can drop empty layers without special cases.

pub mod citation;
pub mod memory;
pub mod output;
pub mod skill;
pub mod verbosity;

use serde::{Deserialize, Serialize};

pub use citation::{CitationRule, CitationStyle};
pub use memory::{SessionContext, SessionMemory, UserPreference};
pub use output::{OutputFormatKind, OutputRule};
pub use skill::{SkillLibrary, SkillProfile};
pub use verbosity::{VerbosityBand, clamp_verbosity};

/// Per-conversation fragment settings.
///
/// Each conversation owns one of these. Overrides win over the presets named
/// by the scenario's catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<CitationRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRule>,

    #[serde(default)]
    pub memory: SessionMemory,
}

impl FragmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the citation rule with a named preset. Returns `false` for
    /// unknown preset names.
    pub fn set_citation_preset(&mut self, preset: &str) -> bool {
        match CitationRule::preset(preset) {
            Some(rule) => {
                self.citation = Some(rule);
                true
            }
            None => false,
        }
    }

    /// Override the output rule with a named preset. Returns `false` for
    /// unknown preset names.
    pub fn set_output_preset(&mut self, preset: &str) -> bool {
        match OutputRule::preset(preset) {
            Some(rule) => {
                self.output = Some(rule);
                true
            }
            None => false,
        }
    }

    pub fn set_citation(&mut self, rule: CitationRule) {
        self.citation = Some(rule);
    }

    pub fn set_output(&mut self, rule: OutputRule) {
        self.output = Some(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_set_overrides() {
        let mut config = FragmentConfig::new();
        assert!(config.set_citation_preset("academic"));
        assert!(config.set_output_preset("code"));
        assert!(!config.set_citation_preset("nope"));
        assert_eq!(config.citation.unwrap().style, CitationStyle::Academic);
        assert_eq!(config.output.unwrap().format, OutputFormatKind::Code);
    }

    #[test]
    fn json_roundtrip_keeps_memory() {
        let mut config = FragmentConfig::new();
        config.memory.add_preference("concise");
        let json = serde_json::to_string(&config).unwrap();
        let back: FragmentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.memory.preferences().len(), 1);
        assert!(back.citation.is_none());
    }
}
