//! Configuration loading, validation, and management for PromptForge.
//!
//! Loads configuration from `~/.promptforge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promptforge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default chat provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature for clarification turns
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per chat reply
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Clarification dialogue settings
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Prompt assembly settings
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Chunking and retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("dialogue", &self.dialogue)
            .field("assembly", &self.assembly)
            .field("retrieval", &self.retrieval)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Whether `refine` calls advance the conversation's turn counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinePolicy {
    /// Refinement never touches the turn counter.
    #[default]
    Independent,
    /// Each refinement consumes a turn and is rejected past `max_turns`.
    CountsTowardMaxTurns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Turn at which the dialogue must produce a final prompt
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Final prompt layout (standard, langgpt, costar, structured)
    #[serde(default = "default_framework")]
    pub framework: String,

    #[serde(default)]
    pub refine_policy: RefinePolicy,

    /// Retrieve reference segments on the first and the forced turn
    #[serde(default)]
    pub retrieval: bool,
}

fn default_max_turns() -> u32 {
    5
}
fn default_framework() -> String {
    "standard".into()
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            framework: default_framework(),
            refine_policy: RefinePolicy::default(),
            retrieval: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default = "default_scenario")]
    pub scenario: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    #[serde(default = "default_template")]
    pub template: String,

    /// Detail level, 1 (terse) to 10 (exhaustive)
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,

    #[serde(default = "default_true")]
    pub skills: bool,

    #[serde(default = "default_true")]
    pub memory: bool,

    #[serde(default = "default_true")]
    pub citations: bool,

    /// Replace the built-in prompt catalog with this TOML file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Extra or overriding skill assets (`<skill>.md`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_dir: Option<PathBuf>,
}

fn default_scenario() -> String {
    "general".into()
}
fn default_template() -> String {
    "standard".into()
}
fn default_verbosity() -> u8 {
    5
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            persona: None,
            template: default_template(),
            verbosity: default_verbosity(),
            skills: true,
            memory: true,
            citations: true,
            catalog_path: None,
            skills_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Window size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    #[serde(default = "default_n_results")]
    pub n_results: usize,

    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// JSONL file backing the persistent index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}
fn default_n_results() -> usize {
    5
}
fn default_embedding_provider() -> String {
    "openai".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            n_results: default_n_results(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            index_path: None,
        }
    }
}

impl RetrievalConfig {
    /// Index file location, defaulting to `~/.promptforge/index.jsonl`.
    pub fn resolved_index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("index.jsonl"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.promptforge/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PROMPTFORGE_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `ANTHROPIC_API_KEY`
    /// - `PROMPTFORGE_PROVIDER`, `PROMPTFORGE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("PROMPTFORGE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("PROMPTFORGE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("PROMPTFORGE_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.dialogue.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "dialogue.max_turns must be at least 1".into(),
            ));
        }

        if !(1..=10).contains(&self.assembly.verbosity) {
            return Err(ConfigError::ValidationError(
                "assembly.verbosity must be between 1 and 10".into(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.chunk_size must be > 0".into(),
            ));
        }

        if self.retrieval.overlap >= self.retrieval.chunk_size {
            return Err(ConfigError::ValidationError(
                "retrieval.overlap must be smaller than retrieval.chunk_size".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            dialogue: DialogueConfig::default(),
            assembly: AssemblyConfig::default(),
            retrieval: RetrievalConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
