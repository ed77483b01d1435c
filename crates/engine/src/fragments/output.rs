//! Output-structure rules.

use serde::{Deserialize, Serialize};

/// Target format of the answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormatKind {
    #[default]
    Markdown,
    PlainText,
    Json,
    Xml,
    Code,
}

impl OutputFormatKind {
    fn instruction(&self) -> &'static str {
        match self {
            Self::Markdown => "Use Markdown with headings, lists and code blocks where they help",
            Self::PlainText => "Use plain text without any markup",
            Self::Json => "Output valid JSON",
            Self::Xml => "Output valid XML",
            Self::Code => "Output mainly code, inside properly labeled code blocks",
        }
    }
}

/// Output settings for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRule {
    #[serde(default)]
    pub format: OutputFormatKind,

    /// Maximum answer length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default)]
    pub include_summary: bool,

    #[serde(default)]
    pub include_steps: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_language: Option<String>,

    /// Sections the answer must contain, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
}

impl OutputRule {
    pub const PRESETS: [&'static str; 4] = ["standard", "detailed", "code", "structured"];

    pub fn preset(name: &str) -> Option<Self> {
        let rule = match name {
            "standard" => Self::default(),
            "detailed" => Self {
                include_summary: true,
                include_steps: true,
                ..Self::default()
            },
            "code" => Self {
                format: OutputFormatKind::Code,
                ..Self::default()
            },
            "structured" => Self {
                include_summary: true,
                include_steps: true,
                sections: ["Background", "Analysis", "Conclusion", "Recommendations"]
                    .map(String::from)
                    .to_vec(),
                ..Self::default()
            },
            _ => return None,
        };
        Some(rule)
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "## Output format requirements".to_string(),
            format!("**Format**: {}", self.format.instruction()),
        ];
        if let Some(max) = self.max_length.filter(|m| *m > 0) {
            lines.push(format!("**Length**: keep the answer under {max} characters"));
        }
        if !self.sections.is_empty() {
            lines.push(format!(
                "**Sections**: organize the answer in this order: {}",
                self.sections.join(", ")
            ));
        }
        if self.include_summary {
            lines.push("**Summary**: open with a short summary (2-3 sentences)".into());
        }
        if self.include_steps {
            lines.push("**Steps**: use numbered steps for anything procedural".into());
        }
        if let Some(lang) = &self.code_language {
            lines.push(format!("**Code language**: prefer {lang}"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_format_only() {
        let text = OutputRule::preset("standard").unwrap().render();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Markdown"));
    }

    #[test]
    fn structured_lists_sections_in_order() {
        let text = OutputRule::preset("structured").unwrap().render();
        assert!(text.contains("Background, Analysis, Conclusion, Recommendations"));
        assert!(text.contains("**Summary**"));
        assert!(text.contains("**Steps**"));
    }

    #[test]
    fn custom_rule_renders_optional_lines() {
        let rule = OutputRule {
            format: OutputFormatKind::Json,
            max_length: Some(800),
            code_language: Some("Rust".into()),
            ..OutputRule::default()
        };
        let text = rule.render();
        assert!(text.contains("valid JSON"));
        assert!(text.contains("under 800 characters"));
        assert!(text.contains("prefer Rust"));
        assert!(!text.contains("**Summary**"));
    }
}
