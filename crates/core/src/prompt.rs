//! Prompt domain types: the structured task description and the per-turn
//! result of the clarification dialogue.
//!
//! `PromptSpec` is filled in by the model over several turns. Models are
//! sloppy about JSON shapes, so deserialization is lenient: `null` is the
//! same as absent, a lone string is accepted where a list is expected, and
//! the short field names (`task`, `role`) are accepted as aliases.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder rendered for any field the user never pinned down.
pub const UNKNOWN: &str = "UNKNOWN";

// ── Prompt spec ──────────────────────────────────────────────────────────

/// What kind of input the generated prompt will be fed at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum InputType {
    Text,
    Code,
    Data,
    Query,
    Document,
    Mixed,
    #[default]
    None,
}

impl From<Option<String>> for InputType {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("text") => Self::Text,
            Some("code") => Self::Code,
            Some("data") => Self::Data,
            Some("query") => Self::Query,
            Some("document") => Self::Document,
            Some("mixed") => Self::Mixed,
            _ => Self::None,
        }
    }
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Data => "data",
            Self::Query => "query",
            Self::Document => "document",
            Self::Mixed => "mixed",
            Self::None => "none",
        }
    }
}

/// The expected shape of the generated prompt's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputFormatSpec {
    /// Format type, e.g. "markdown table" or "json".
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Required sections, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
}

impl<'de> Deserialize<'de> for OutputFormatSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Object(map) => Self {
                kind: map
                    .get("type")
                    .or_else(|| map.get("kind"))
                    .or_else(|| map.get("format"))
                    .and_then(text_of),
                sections: map.get("sections").map(list_of).unwrap_or_default(),
            },
            other => Self {
                kind: text_of(&other),
                sections: Vec::new(),
            },
        })
    }
}

/// Hard requirements on the generated prompt's behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Constraints {
    #[serde(default)]
    pub must: Vec<String>,
    #[serde(default)]
    pub must_not: Vec<String>,
}

impl<'de> Deserialize<'de> for Constraints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Object(map) => Self {
                must: map.get("must").map(list_of).unwrap_or_default(),
                must_not: map.get("must_not").map(list_of).unwrap_or_default(),
            },
            // A flat list is the short form: everything is a "must".
            other => Self {
                must: list_of(&other),
                must_not: Vec::new(),
            },
        })
    }
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }
}

/// Tools the generated prompt may or may not use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicy {
    #[serde(default, deserialize_with = "lenient_list")]
    pub allowed: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub forbidden: Vec<String>,
}

/// Structured representation of the task the user wants a prompt for.
///
/// Absent text fields stay `None` and render as [`UNKNOWN`]; they are never
/// guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    #[serde(default, alias = "task", deserialize_with = "lenient_text")]
    pub goal: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub audience: Option<String>,

    #[serde(default, alias = "role", deserialize_with = "lenient_text")]
    pub persona: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub context: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub requires_input: bool,

    #[serde(default)]
    pub input_type: InputType,

    #[serde(default)]
    pub output_format: OutputFormatSpec,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default)]
    pub tools: ToolPolicy,

    #[serde(default, deserialize_with = "lenient_list")]
    pub quality_bar: Vec<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub risk_flags: Vec<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub thinking_strategy: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub error_handling: Option<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub unknowns: Vec<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub examples: Vec<String>,
}

/// Short field names and the canonical field each one stands for.
const FIELD_ALIASES: [(&str, &str); 2] = [("task", "goal"), ("role", "persona")];

impl PromptSpec {
    /// Read a spec from a model payload.
    ///
    /// Payloads may carry both a short name and its canonical field (`task`
    /// and `goal`, `role` and `persona`). The canonical field wins unless it
    /// is empty; the short name is dropped before deserializing so the pair
    /// never collides.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let value = match value {
            Value::Object(mut map) => {
                for (alias, canonical) in FIELD_ALIASES {
                    let Some(short) = map.remove(alias) else {
                        continue;
                    };
                    if map.get(canonical).and_then(text_of).is_none() {
                        map.insert(canonical.to_string(), short);
                    }
                }
                Value::Object(map)
            }
            other => other,
        };
        serde_json::from_value(value)
    }

    /// Render an optional field, falling back to [`UNKNOWN`].
    pub fn or_unknown(field: &Option<String>) -> &str {
        field.as_deref().unwrap_or(UNKNOWN)
    }

    /// Whether the prompt consumes run-time input and needs an input section.
    pub fn needs_input_section(&self) -> bool {
        self.requires_input || self.input_type != InputType::None
    }

    /// Whether the prompt should carry an explicit reasoning strategy.
    pub fn needs_reasoning_section(&self) -> bool {
        self.thinking_strategy.is_some()
    }

    /// Whether the prompt should carry explicit error handling.
    pub fn needs_error_handling_section(&self) -> bool {
        self.error_handling.is_some() || self.requires_input
    }
}

// ── Dialogue results ─────────────────────────────────────────────────────

/// One selectable answer to a clarifying question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    #[serde(deserialize_with = "required_text")]
    pub label: String,
    #[serde(default, deserialize_with = "required_text")]
    pub value: String,
}

/// A clarifying question asked by the dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default = "default_true")]
    pub allow_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub understanding_snapshot: Option<String>,
    #[serde(default)]
    pub current_turn: u32,
    #[serde(default)]
    pub max_turns: u32,
}

fn default_true() -> bool {
    true
}

/// The compiled instruction document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPrompt {
    pub spec: PromptSpec,
    pub rendered_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub quality_checklist: Vec<String>,
}

/// Outcome of a single dialogue turn. Exactly one variant per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnResult {
    Question(Question),
    FinalPrompt(FinalPrompt),
}

impl TurnResult {
    pub fn is_final(&self) -> bool {
        matches!(self, TurnResult::FinalPrompt(_))
    }
}

// ── Frameworks ───────────────────────────────────────────────────────────

/// Layout used to render a final prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Standard,
    Langgpt,
    Costar,
    Structured,
}

impl Framework {
    pub const ALL: [Framework; 4] = [
        Framework::Standard,
        Framework::Langgpt,
        Framework::Costar,
        Framework::Structured,
    ];

    /// Parse a framework id. Unknown ids fall back to `Standard`.
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "langgpt" => Self::Langgpt,
            "costar" => Self::Costar,
            "structured" => Self::Structured,
            "standard" => Self::Standard,
            other => {
                tracing::debug!(framework = other, "Unknown framework, using standard");
                Self::Standard
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Langgpt => "langgpt",
            Self::Costar => "costar",
            Self::Structured => "structured",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Lenient field parsing ────────────────────────────────────────────────

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(text_of)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}

fn list_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        other => text_of(other).into_iter().collect(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(&Value::deserialize(deserializer)?))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(list_of(&Value::deserialize(deserializer)?))
}

fn required_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_of(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
