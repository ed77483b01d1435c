//! Prompt catalog — the instruction text the engine composes.
//!
//! Scenario contracts, persona styles, template layouts, framework layouts,
//! the clarifier meta-prompt, the refine/rethink templates and the hard rules
//! are all data. The built-in catalog is embedded in the binary; a TOML file
//! with the same shape replaces it wholesale.

use std::collections::BTreeMap;
use std::path::Path;

use promptforge_core::error::{Error, Result};
use promptforge_core::prompt::Framework;
use serde::Deserialize;
use tracing::{debug, info};

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.toml");

/// Scenario used when an id is unknown.
pub const FALLBACK_SCENARIO: &str = "general";

/// Template used when an id is unknown.
pub const FALLBACK_TEMPLATE: &str = "standard";

/// A task contract plus the fragment presets it implies.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEntry {
    pub title: String,
    pub contract: String,

    /// Skill injected for this scenario, if any.
    #[serde(default)]
    pub skill: Option<String>,

    #[serde(default = "default_citation_preset")]
    pub citation_preset: String,

    #[serde(default = "default_output_preset")]
    pub output_preset: String,

    /// Lowercase keywords used by the intent classifier.
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub recommended_persona: Option<String>,

    #[serde(default = "default_template")]
    pub recommended_template: String,
}

fn default_citation_preset() -> String {
    "casual".into()
}

fn default_output_preset() -> String {
    "standard".into()
}

fn default_template() -> String {
    FALLBACK_TEMPLATE.into()
}

/// A titled block of text (persona style or template layout).
#[derive(Debug, Clone, Deserialize)]
pub struct TextEntry {
    pub title: String,
    pub text: String,
}

/// Final-prompt layout for one framework.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkEntry {
    /// Appended to the clarifier prompt so the model compiles toward this
    /// layout.
    #[serde(default)]
    pub addendum: String,

    /// minijinja template for the rendered final prompt.
    pub template: String,
}

/// All catalog text, keyed by id.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptCatalog {
    pub hard_rules: String,
    pub clarifier: String,
    pub refine: String,
    pub rethink: String,
    pub scenarios: BTreeMap<String, ScenarioEntry>,
    #[serde(default)]
    pub personas: BTreeMap<String, TextEntry>,
    pub templates: BTreeMap<String, TextEntry>,
    pub frameworks: BTreeMap<String, FrameworkEntry>,
}

impl PromptCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG)
    }

    /// Load a replacement catalog from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read catalog {}: {e}", path.display()),
        })?;
        let catalog = Self::parse(&content)?;
        info!(path = %path.display(), scenarios = catalog.scenarios.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// The file catalog when a path is given, the built-in one otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::builtin(),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(content).map_err(|e| Error::Config {
            message: format!("Invalid catalog: {e}"),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The fallback ids and every framework must be present.
    fn validate(&self) -> Result<()> {
        if !self.scenarios.contains_key(FALLBACK_SCENARIO) {
            return Err(Error::Config {
                message: format!("Catalog has no '{FALLBACK_SCENARIO}' scenario"),
            });
        }
        if !self.templates.contains_key(FALLBACK_TEMPLATE) {
            return Err(Error::Config {
                message: format!("Catalog has no '{FALLBACK_TEMPLATE}' template"),
            });
        }
        if let Some(missing) = Framework::ALL
            .iter()
            .find(|f| !self.frameworks.contains_key(f.as_str()))
        {
            return Err(Error::Config {
                message: format!("Catalog has no '{missing}' framework"),
            });
        }
        Ok(())
    }

    /// Resolve a scenario id, falling back to `general`.
    pub fn scenario(&self, id: &str) -> (&str, &ScenarioEntry) {
        if let Some((key, entry)) = self.scenarios.get_key_value(id) {
            return (key, entry);
        }
        debug!(scenario = id, "Unknown scenario, using {FALLBACK_SCENARIO}");
        self.fallback_scenario()
    }

    fn fallback_scenario(&self) -> (&str, &ScenarioEntry) {
        match self.scenarios.get_key_value(FALLBACK_SCENARIO) {
            Some((key, entry)) => (key, entry),
            // validate() guarantees the fallback exists; a hand-built catalog
            // without it still resolves to some scenario.
            None => match self.scenarios.iter().next() {
                Some((key, entry)) => (key, entry),
                None => (FALLBACK_SCENARIO, &EMPTY_SCENARIO),
            },
        }
    }

    /// Resolve a persona id. Unknown ids mean no persona.
    pub fn persona(&self, id: Option<&str>) -> Option<&TextEntry> {
        let id = id?;
        let entry = self.personas.get(id);
        if entry.is_none() {
            debug!(persona = id, "Unknown persona, no persona layer");
        }
        entry
    }

    /// Resolve a template id, falling back to `standard`.
    pub fn template(&self, id: &str) -> Option<&TextEntry> {
        self.templates.get(id).or_else(|| {
            debug!(template = id, "Unknown template, using {FALLBACK_TEMPLATE}");
            self.templates.get(FALLBACK_TEMPLATE)
        })
    }

    pub fn framework(&self, framework: Framework) -> Option<&FrameworkEntry> {
        self.frameworks.get(framework.as_str())
    }

    pub fn scenario_ids(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    pub fn persona_ids(&self) -> Vec<&str> {
        self.personas.keys().map(String::as_str).collect()
    }

    pub fn template_ids(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

static EMPTY_SCENARIO: ScenarioEntry = ScenarioEntry {
    title: String::new(),
    contract: String::new(),
    skill: None,
    citation_preset: String::new(),
    output_preset: String::new(),
    keywords: Vec::new(),
    recommended_persona: None,
    recommended_template: String::new(),
};
