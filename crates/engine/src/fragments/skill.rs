//! Skill profiles — per-domain behavior rules parsed from markdown assets.
//!
//! A skill asset is plain markdown with a few recognised headings:
//!
//! ```text
//! ## Identity            free text
//! ### MUST_DO            bullet list
//! ### MUST_NOT           bullet list
//! ### PREFER             bullet list
//! ## Output Format       free text
//! | 1-3 | description |  verbosity table rows, anywhere
//! ## Forbidden Phrases   bullet list
//! - [ ] item             checklist items, anywhere
//! ```
//!
//! Parsing never fails. Missing or malformed sections become empty values.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use promptforge_core::error::{Error, Result};
use regex_lite::Regex;
use tracing::{debug, info, warn};

use super::verbosity::{VerbosityBand, clamp_verbosity};

static TABLE_ROW: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\|\s*(\d+)\s*-\s*(\d+)\s*\|\s*(.+?)\s*\|").ok());

static CHECKLIST_ITEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:[-*]\s*)?\[\s*\]\s*(.+)$").ok());

const BUILTIN_SKILLS: [(&str, &str); 5] = [
    ("coding", include_str!("../../assets/skills/coding.md")),
    ("writing", include_str!("../../assets/skills/writing.md")),
    ("analysis", include_str!("../../assets/skills/analysis.md")),
    ("creative", include_str!("../../assets/skills/creative.md")),
    (
        "customer_service",
        include_str!("../../assets/skills/customer_service.md"),
    ),
];

/// A verbosity range row from a skill's table, e.g. `| 1-3 | terse |`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbosityRange {
    pub min: u8,
    pub max: u8,
    pub description: String,
}

/// A parsed skill asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillProfile {
    pub id: String,
    pub identity: String,
    pub must_do: Vec<String>,
    pub must_not: Vec<String>,
    pub prefer: Vec<String>,
    pub output_format: String,
    pub verbosity: Vec<VerbosityRange>,
    pub forbidden_phrases: Vec<String>,
    pub checklist: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Identity,
    MustDo,
    MustNot,
    Prefer,
    OutputFormat,
    ForbiddenPhrases,
    Other,
}

fn classify_heading(title: &str) -> Section {
    let upper = title.trim().to_ascii_uppercase();
    if upper.contains("MUST_NOT") || upper.contains("MUST NOT") {
        Section::MustNot
    } else if upper.contains("MUST_DO") || upper.contains("MUST DO") {
        Section::MustDo
    } else if upper.starts_with("PREFER") {
        Section::Prefer
    } else if upper.contains("IDENTITY") {
        Section::Identity
    } else if upper.starts_with("OUTPUT FORMAT") {
        Section::OutputFormat
    } else if upper.starts_with("FORBIDDEN") {
        Section::ForbiddenPhrases
    } else {
        Section::Other
    }
}

fn bullet(line: &str) -> Option<&str> {
    let item = line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))?.trim();
    (!item.is_empty() && !item.starts_with('[')).then_some(item)
}

impl SkillProfile {
    /// Parse a skill asset.
    pub fn parse(id: impl Into<String>, markdown: &str) -> Self {
        let mut profile = SkillProfile {
            id: id.into(),
            ..Self::default()
        };
        let mut section = Section::Other;
        let mut identity = Vec::new();
        let mut output_format = Vec::new();

        for raw in markdown.lines() {
            let line = raw.trim();

            if let Some(caps) = TABLE_ROW.as_ref().and_then(|re| re.captures(line)) {
                let bounds = (caps[1].parse::<u8>(), caps[2].parse::<u8>());
                if let (Ok(min), Ok(max)) = bounds {
                    profile.verbosity.push(VerbosityRange {
                        min,
                        max,
                        description: caps[3].to_string(),
                    });
                }
                continue;
            }
            if let Some(caps) = CHECKLIST_ITEM.as_ref().and_then(|re| re.captures(line)) {
                profile.checklist.push(caps[1].trim().to_string());
                continue;
            }
            if line.starts_with('#') {
                section = classify_heading(line.trim_start_matches('#'));
                continue;
            }

            match section {
                Section::Identity if !line.is_empty() => identity.push(line),
                Section::OutputFormat if !line.is_empty() => output_format.push(line),
                Section::MustDo => profile.must_do.extend(bullet(line).map(String::from)),
                Section::MustNot => profile.must_not.extend(bullet(line).map(String::from)),
                Section::Prefer => profile.prefer.extend(bullet(line).map(String::from)),
                Section::ForbiddenPhrases => {
                    profile
                        .forbidden_phrases
                        .extend(bullet(line).map(|p| p.trim_matches('"').to_string()));
                }
                _ => {}
            }
        }

        profile.identity = identity.join("\n");
        profile.output_format = output_format.join("\n");
        profile
    }

    /// Description of the band containing `level`. Falls back to the generic
    /// band name when the asset has no matching table row.
    pub fn band_description(&self, level: u8) -> String {
        let level = clamp_verbosity(level);
        self.verbosity
            .iter()
            .find(|r| r.min <= level && level <= r.max)
            .map(|r| r.description.clone())
            .unwrap_or_else(|| VerbosityBand::for_level(level).style().to_string())
    }

    /// Render the `<skill_context>` block for the given verbosity.
    pub fn render(&self, verbosity: u8) -> String {
        fn list(items: &[String]) -> String {
            if items.is_empty() {
                "- (none)".to_string()
            } else {
                items
                    .iter()
                    .map(|i| format!("- {i}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }

        let level = clamp_verbosity(verbosity);
        let identity = if self.identity.is_empty() {
            "(none)"
        } else {
            &self.identity
        };

        let mut out = format!(
            "<skill_context>\n## Role\n{identity}\n\n## Decision boundaries\n### Must do (MUST_DO)\n{}\n\n### Must not (MUST_NOT)\n{}\n\n### Prefer (PREFER)\n{}\n\n## Output style\nVerbosity level: {level}/10\nStyle: {}",
            list(&self.must_do),
            list(&self.must_not),
            list(&self.prefer),
            self.band_description(level),
        );
        if !self.output_format.is_empty() {
            out.push_str(&format!("\n{}", self.output_format));
        }
        out.push_str(&format!(
            "\n\n## Forbidden phrases\nNever use:\n{}\n\n## Verification checklist\nBefore finishing, make sure that:\n{}\n</skill_context>",
            list(&self.forbidden_phrases),
            list(&self.checklist),
        ));
        out
    }
}

/// The set of available skills, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SkillLibrary {
    skills: BTreeMap<String, SkillProfile>,
}

impl SkillLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// The skills compiled into the binary.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for (id, markdown) in BUILTIN_SKILLS {
            library.insert(SkillProfile::parse(id, markdown));
        }
        library
    }

    pub fn insert(&mut self, profile: SkillProfile) {
        self.skills.insert(profile.id.clone(), profile);
    }

    /// Load every `*.md` file in `dir`, keyed by file stem. Files with the
    /// same id as an existing skill replace it.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| Error::Config {
            message: format!("Failed to read skills directory {}: {e}", dir.display()),
        })?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(markdown) => {
                    self.insert(SkillProfile::parse(id, &markdown));
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable skill file"),
            }
        }

        info!(dir = %dir.display(), loaded, "Skills loaded");
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&SkillProfile> {
        self.skills.get(id)
    }

    /// Skill ids in ascending order.
    pub fn ids(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    /// Render a skill block. Unknown skills render as an empty string.
    pub fn render(&self, id: &str, verbosity: u8) -> String {
        match self.get(id) {
            Some(profile) => profile.render(verbosity),
            None => {
                debug!(skill = id, "Unknown skill, no skill block");
                String::new()
            }
        }
    }
}
