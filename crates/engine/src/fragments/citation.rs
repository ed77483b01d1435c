//! Citation, copyright and factual-accuracy rules.

use serde::{Deserialize, Serialize};

/// How sources are attributed in the answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Inline,
    Footnote,
    Academic,
    Url,
    None,
}

impl CitationStyle {
    fn instruction(&self) -> &'static str {
        match self {
            Self::Inline => "Use inline citations such as [Source name] or [1]",
            Self::Footnote => "Use footnotes and list every source at the end",
            Self::Academic => "Use academic citations such as (Author, Year)",
            Self::Url => "Give the direct URL of each source",
            Self::None => "",
        }
    }
}

/// Citation settings for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRule {
    #[serde(default)]
    pub style: CitationStyle,

    #[serde(default)]
    pub require_sources: bool,

    /// Longest verbatim quote in characters. Zero disables the limit line.
    #[serde(default = "default_quote_length")]
    pub max_direct_quote_length: u32,

    #[serde(default = "default_true")]
    pub paraphrase_preference: bool,

    #[serde(default = "default_true")]
    pub copyright_warning: bool,

    #[serde(default = "default_true")]
    pub fact_check_reminder: bool,
}

fn default_quote_length() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for CitationRule {
    fn default() -> Self {
        Self {
            style: CitationStyle::Inline,
            require_sources: false,
            max_direct_quote_length: default_quote_length(),
            paraphrase_preference: true,
            copyright_warning: true,
            fact_check_reminder: true,
        }
    }
}

const COPYRIGHT_BLOCK: &str = "## Copyright compliance
- Do not reproduce long passages of copyrighted material (lyrics, poems, book chapters)
- When quoting, keep excerpts short and name the source
- For code, respect the terms of its open-source license
- If asked to reproduce copyrighted content, explain politely that you cannot, and instead:
  - offer a summary
  - point to the official source
  - offer similar original content";

const FACT_CHECK_BLOCK: &str = "## Factual accuracy
- State plainly when you are unsure (\"I'm not certain\", \"as far as I know\")
- Take extra care with numbers, dates and proper names
- If information may be outdated, remind the user to verify it
- Never invent citations, studies or data";

impl CitationRule {
    pub const PRESETS: [&'static str; 4] = ["strict", "academic", "casual", "creative"];

    /// Look up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        let rule = match name {
            "strict" => Self {
                style: CitationStyle::Inline,
                require_sources: true,
                max_direct_quote_length: 50,
                paraphrase_preference: true,
                copyright_warning: true,
                fact_check_reminder: true,
            },
            "academic" => Self {
                style: CitationStyle::Academic,
                require_sources: true,
                max_direct_quote_length: 100,
                paraphrase_preference: true,
                copyright_warning: true,
                fact_check_reminder: true,
            },
            "casual" => Self {
                style: CitationStyle::None,
                require_sources: false,
                max_direct_quote_length: 200,
                paraphrase_preference: false,
                copyright_warning: false,
                fact_check_reminder: false,
            },
            "creative" => Self {
                style: CitationStyle::None,
                require_sources: false,
                max_direct_quote_length: 0,
                paraphrase_preference: false,
                copyright_warning: false,
                fact_check_reminder: false,
            },
            _ => return None,
        };
        Some(rule)
    }

    /// Render the citation block. Empty when the style is `None`.
    pub fn render(&self) -> String {
        if self.style == CitationStyle::None {
            return String::new();
        }

        let mut lines = vec![
            "## Citation rules".to_string(),
            format!("**Citation format**: {}", self.style.instruction()),
        ];
        if self.max_direct_quote_length > 0 {
            lines.push(format!(
                "**Direct quotes**: keep each direct quote under {} characters",
                self.max_direct_quote_length
            ));
        }
        if self.paraphrase_preference {
            lines.push(
                "**Paraphrase first**: restate information in your own words instead of copying it"
                    .into(),
            );
        }
        if self.require_sources {
            lines.push("**Sources**: attribute every claim that is not your own".into());
        }

        let mut blocks = vec![lines.join("\n")];
        if self.copyright_warning {
            blocks.push(COPYRIGHT_BLOCK.to_string());
        }
        if self.fact_check_reminder {
            blocks.push(FACT_CHECK_BLOCK.to_string());
        }
        blocks.join("\n\n")
    }
}
