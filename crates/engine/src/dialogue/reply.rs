//! Parsing of the model's structured reply.
//!
//! The model is asked for JSON, usually inside a fenced block. Anything that
//! cannot be read as a question or a prompt becomes a fixed fallback
//! question; parse failures are a tagged result, never an error.

use std::sync::LazyLock;

use promptforge_core::prompt::{PromptSpec, Question, QuestionOption};
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Text of the fallback question.
pub const FALLBACK_QUESTION: &str =
    "Sorry, I need more information. Please describe in detail what you want the AI to do for you?";

/// Hint attached to the fallback question.
pub const FALLBACK_HINT: &str = "Please describe your need in as much detail as possible";

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").ok());

/// A successfully parsed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    Question {
        question: String,
        options: Vec<QuestionOption>,
        allow_custom: bool,
        hint: Option<String>,
        current_understanding: Option<String>,
    },
    Prompt {
        prompt: PromptSpec,
        raw_text: Option<String>,
        tags: Vec<String>,
        quality_checklist: Vec<String>,
    },
}

/// Outcome of reading a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyParse {
    Parsed(ReplyPayload),
    Fallback(Question),
}

#[derive(Deserialize)]
struct QuestionWire {
    #[serde(alias = "text")]
    question: String,
    #[serde(default)]
    options: Vec<Value>,
    #[serde(default)]
    allow_custom: Option<bool>,
    #[serde(default)]
    hint: Option<Value>,
    #[serde(default, alias = "understanding_snapshot")]
    current_understanding: Option<Value>,
}

#[derive(Deserialize)]
struct PromptWire {
    #[serde(default, alias = "final_prompt", alias = "spec")]
    prompt: Option<Value>,
    #[serde(default)]
    raw_text: Option<String>,
    #[serde(default)]
    tags: Vec<Value>,
    #[serde(default)]
    quality_checklist: Vec<Value>,
}

/// The fixed question returned when a reply cannot be understood.
pub fn fallback_question() -> Question {
    Question {
        text: FALLBACK_QUESTION.to_string(),
        options: Vec::new(),
        allow_custom: true,
        hint: Some(FALLBACK_HINT.to_string()),
        understanding_snapshot: None,
        current_turn: 0,
        max_turns: 0,
    }
}

/// The JSON candidate in a reply: the first fenced block if there is one,
/// otherwise the trimmed reply with stray fences removed.
pub fn extract_json(reply: &str) -> &str {
    if let Some(caps) = FENCED_BLOCK.as_ref().and_then(|re| re.captures(reply)) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim();
        }
    }

    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Read a model reply.
pub fn parse_reply(reply: &str) -> ReplyParse {
    let candidate = extract_json(reply);
    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, reply_len = reply.len(), "Reply is not JSON, asking fallback question");
            return ReplyParse::Fallback(fallback_question());
        }
    };

    let kind = value.get("type").and_then(Value::as_str).map(str::to_ascii_lowercase);
    let payload = match kind.as_deref() {
        Some("question") => parse_question(value),
        Some("prompt") | Some("final_prompt") => parse_prompt(value),
        // Refine replies may omit the tag.
        None if value.get("prompt").is_some() => parse_prompt(value),
        other => {
            warn!(kind = ?other, "Unrecognised reply type, asking fallback question");
            None
        }
    };

    match payload {
        Some(payload) => {
            let kind = match &payload {
                ReplyPayload::Question { .. } => "question",
                ReplyPayload::Prompt { .. } => "prompt",
            };
            debug!(kind, "Reply parsed");
            ReplyParse::Parsed(payload)
        }
        None => ReplyParse::Fallback(fallback_question()),
    }
}

fn parse_question(value: Value) -> Option<ReplyPayload> {
    let wire: QuestionWire = match serde_json::from_value(value) {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "Malformed question payload");
            return None;
        }
    };
    if wire.question.trim().is_empty() {
        return None;
    }

    Some(ReplyPayload::Question {
        question: wire.question.trim().to_string(),
        options: wire.options.iter().filter_map(option_of).collect(),
        allow_custom: wire.allow_custom.unwrap_or(true),
        hint: wire.hint.as_ref().and_then(text_of),
        current_understanding: wire.current_understanding.as_ref().and_then(text_of),
    })
}

fn parse_prompt(value: Value) -> Option<ReplyPayload> {
    let wire: PromptWire = match serde_json::from_value(value) {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "Malformed prompt payload");
            return None;
        }
    };

    let prompt = match wire.prompt {
        Some(spec @ Value::Object(_)) => match PromptSpec::from_value(spec) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "Malformed prompt spec");
                return None;
            }
        },
        _ => PromptSpec::default(),
    };

    Some(ReplyPayload::Prompt {
        prompt,
        raw_text: wire.raw_text.filter(|t| !t.trim().is_empty()),
        tags: wire.tags.iter().filter_map(text_of).collect(),
        quality_checklist: wire.quality_checklist.iter().filter_map(text_of).collect(),
    })
}

/// Options come as `{label, value}` objects or as bare strings.
fn option_of(value: &Value) -> Option<QuestionOption> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(QuestionOption {
            label: s.trim().to_string(),
            value: s.trim().to_string(),
        }),
        Value::Object(map) => {
            let label = map.get("label").and_then(text_of)?;
            let value = map.get("value").and_then(text_of).unwrap_or_else(|| label.clone());
            Some(QuestionOption { label, value })
        }
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_question_is_parsed() {
        let reply = r#"Sure! Here is my next question:
```json
{
  "type": "question",
  "question": "Who will read the descriptions?",
  "options": [{"label": "Shoppers", "value": "online shoppers"}, "Retail buyers"],
  "hint": "Pick the main audience",
  "current_understanding": {"goal": "product descriptions"}
}
```"#;
        let ReplyParse::Parsed(ReplyPayload::Question {
            question,
            options,
            allow_custom,
            hint,
            current_understanding,
        }) = parse_reply(reply)
        else {
            panic!("expected a question");
        };

        assert_eq!(question, "Who will read the descriptions?");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value, "online shoppers");
        assert_eq!(options[1].label, "Retail buyers");
        assert!(allow_custom);
        assert_eq!(hint.as_deref(), Some("Pick the main audience"));
        assert_eq!(current_understanding.as_deref(), Some(r#"{"goal":"product descriptions"}"#));
    }

    #[test]
    fn unfenced_prompt_is_parsed() {
        let reply = r#"{"type": "prompt", "prompt": {"role": "copywriter", "task": "write blurbs"}, "tags": ["retail"]}"#;
        let ReplyParse::Parsed(ReplyPayload::Prompt { prompt, tags, .. }) = parse_reply(reply) else {
            panic!("expected a prompt");
        };
        assert_eq!(prompt.persona.as_deref(), Some("copywriter"));
        assert_eq!(prompt.goal.as_deref(), Some("write blurbs"));
        assert_eq!(tags, vec!["retail"]);
    }

    #[test]
    fn prompt_with_both_field_names_is_parsed() {
        let reply = r#"{"type":"prompt","prompt":{"goal":"Write blurbs","task":"Write blurbs","persona":"Copywriter","role":"Writer"}}"#;
        let ReplyParse::Parsed(ReplyPayload::Prompt { prompt, .. }) = parse_reply(reply) else {
            panic!("expected a prompt");
        };
        assert_eq!(prompt.goal.as_deref(), Some("Write blurbs"));
        assert_eq!(prompt.persona.as_deref(), Some("Copywriter"));
    }

    #[test]
    fn final_prompt_tag_and_untagged_refine_are_prompts() {
        let tagged = r#"{"type": "final_prompt", "prompt": {"goal": "g"}}"#;
        let untagged = "```\n{\"prompt\": {\"goal\": \"g\"}, \"raw_text\": \"text\"}\n```";
        assert!(matches!(parse_reply(tagged), ReplyParse::Parsed(ReplyPayload::Prompt { .. })));
        let ReplyParse::Parsed(ReplyPayload::Prompt { raw_text, .. }) = parse_reply(untagged) else {
            panic!("expected a prompt");
        };
        assert_eq!(raw_text.as_deref(), Some("text"));
    }

    #[test]
    fn stray_fences_are_stripped() {
        assert_eq!(extract_json("```json {\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("  {\"a\": 1}```  "), "{\"a\": 1}");
    }

    #[test]
    fn malformed_reply_falls_back() {
        for reply in [
            "I think you want a poem?",
            "```json\n{\"type\": \"question\"\n```",
            r#"{"type": "essay", "text": "..."}"#,
            r#"{"type": "question", "question": ""}"#,
        ] {
            let ReplyParse::Fallback(question) = parse_reply(reply) else {
                panic!("expected fallback for {reply:?}");
            };
            assert_eq!(question.text, FALLBACK_QUESTION);
            assert_eq!(question.hint.as_deref(), Some(FALLBACK_HINT));
            assert!(question.allow_custom);
            assert!(question.options.is_empty());
            assert!(question.understanding_snapshot.is_none());
        }
    }
}
