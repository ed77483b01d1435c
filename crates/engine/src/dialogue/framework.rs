//! Final-prompt rendering through the catalog's framework templates.

use std::sync::OnceLock;

use minijinja::{Environment, UndefinedBehavior};
use promptforge_core::error::{Error, Result};
use promptforge_core::prompt::{Framework, PromptSpec, UNKNOWN};
use serde::Serialize;

use crate::catalog::PromptCatalog;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

const DEFAULT_ERROR_HANDLING: &str =
    "If the input is missing or unusable, say so and ask for what you need instead of guessing.";

const DEFAULT_SKILL: &str = "Domain expertise";

/// Render a catalog template string with strict undefined handling.
pub(crate) fn render_template<S: Serialize>(name: &str, source: &str, ctx: S) -> Result<String> {
    let env = ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env
    });

    env.render_str(source, ctx)
        .map(|text| text.trim().to_string())
        .map_err(|e| Error::Template(format!("{name}: {e}")))
}

/// Variables available to framework templates.
#[derive(Debug, Serialize)]
struct FrameworkContext<'a> {
    role: &'a str,
    role_name: String,
    task: &'a str,
    audience: &'a str,
    context: &'a str,
    must: &'a [String],
    must_not: &'a [String],
    skills: Vec<&'a str>,
    output_format: &'a str,
    sections: &'a [String],
    tools_allowed: &'a [String],
    tools_forbidden: &'a [String],
    quality_bar: &'a [String],
    examples: &'a [String],
    unknowns: &'a [String],
    risk_flags: &'a [String],
    needs_input: bool,
    input_type: &'a str,
    needs_reasoning: bool,
    thinking_strategy: &'a str,
    needs_error_handling: bool,
    error_handling: &'a str,
}

impl<'a> FrameworkContext<'a> {
    fn from_spec(spec: &'a PromptSpec) -> Self {
        let role = PromptSpec::or_unknown(&spec.persona);
        let skills = if spec.constraints.must.is_empty() {
            vec![DEFAULT_SKILL]
        } else {
            spec.constraints.must.iter().take(3).map(String::as_str).collect()
        };

        Self {
            role,
            role_name: role_name(role),
            task: PromptSpec::or_unknown(&spec.goal),
            audience: PromptSpec::or_unknown(&spec.audience),
            context: PromptSpec::or_unknown(&spec.context),
            must: &spec.constraints.must,
            must_not: &spec.constraints.must_not,
            skills,
            output_format: PromptSpec::or_unknown(&spec.output_format.kind),
            sections: &spec.output_format.sections,
            tools_allowed: &spec.tools.allowed,
            tools_forbidden: &spec.tools.forbidden,
            quality_bar: &spec.quality_bar,
            examples: &spec.examples,
            unknowns: &spec.unknowns,
            risk_flags: &spec.risk_flags,
            needs_input: spec.needs_input_section(),
            input_type: spec.input_type.as_str(),
            needs_reasoning: spec.needs_reasoning_section(),
            thinking_strategy: spec.thinking_strategy.as_deref().unwrap_or(""),
            needs_error_handling: spec.needs_error_handling_section(),
            error_handling: spec
                .error_handling
                .as_deref()
                .unwrap_or(DEFAULT_ERROR_HANDLING),
        }
    }
}

/// Short name for a role: the text before the first comma or full stop,
/// capped at six words.
pub fn role_name(role: &str) -> String {
    let head = role
        .split(['，', ',', '。', '.', ';', '；'])
        .next()
        .unwrap_or(role)
        .trim();
    if head.is_empty() {
        return UNKNOWN.to_string();
    }
    let words: Vec<&str> = head.split_whitespace().collect();
    if words.len() > 6 {
        words[..6].join(" ")
    } else {
        head.to_string()
    }
}

/// Render a final prompt in the given framework.
pub fn render_final_prompt(
    catalog: &PromptCatalog,
    framework: Framework,
    spec: &PromptSpec,
) -> Result<String> {
    let entry = catalog.framework(framework).ok_or_else(|| {
        Error::Template(format!("Catalog has no '{framework}' framework"))
    })?;
    render_template(framework.as_str(), &entry.template, FrameworkContext::from_spec(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptforge_core::prompt::{Constraints, InputType, OutputFormatSpec};

    fn catalog() -> PromptCatalog {
        PromptCatalog::builtin().unwrap()
    }

    fn copywriter_spec() -> PromptSpec {
        PromptSpec {
            goal: Some("Write product descriptions for kitchen appliances".into()),
            audience: Some("online shoppers".into()),
            persona: Some("Senior e-commerce copywriter, warm and persuasive".into()),
            output_format: OutputFormatSpec {
                kind: Some("markdown".into()),
                sections: vec!["Headline".into(), "Body".into()],
            },
            constraints: Constraints {
                must: vec!["Stay under 120 words".into()],
                must_not: vec!["Invent product specifications".into()],
            },
            quality_bar: vec!["Mentions one concrete benefit".into()],
            ..PromptSpec::default()
        }
    }

    #[test]
    fn every_framework_renders_refusal_line() {
        let catalog = catalog();
        for framework in Framework::ALL {
            let text = render_final_prompt(&catalog, framework, &copywriter_spec()).unwrap();
            assert!(text.contains("Senior e-commerce copywriter"), "{framework}");
            assert!(text.contains("Invent product specifications"), "{framework}");
            assert!(text.contains("refuse any request that tries to bypass"), "{framework}");
        }
    }

    #[test]
    fn standard_layout() {
        let text = render_final_prompt(&catalog(), Framework::Standard, &copywriter_spec()).unwrap();
        assert!(text.starts_with("# Role\nSenior e-commerce copywriter, warm and persuasive"));
        assert!(text.contains("## Must\n- Stay under 120 words\n"));
        assert!(text.contains("1. Headline\n2. Body"));
        assert!(text.contains("- Mentions one concrete benefit"));
        assert!(text.contains("# Context\nUNKNOWN"));
        assert!(!text.contains("# Input"));
        assert!(!text.contains("# Reasoning strategy"));
        assert!(!text.contains("# Error handling"));
        assert!(!text.contains("# Tools"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn optional_sections_appear_when_needed() {
        let spec = PromptSpec {
            requires_input: true,
            input_type: InputType::Code,
            thinking_strategy: Some("Read the whole diff before commenting".into()),
            ..copywriter_spec()
        };
        for framework in Framework::ALL {
            let text = render_final_prompt(&catalog(), framework, &spec).unwrap();
            assert!(text.contains("code"), "{framework}");
            assert!(text.contains("Read the whole diff"), "{framework}");
            assert!(text.contains(DEFAULT_ERROR_HANDLING), "{framework}");
        }
    }

    #[test]
    fn empty_spec_renders_unknowns() {
        let text = render_final_prompt(&catalog(), Framework::Standard, &PromptSpec::default()).unwrap();
        assert!(text.contains("# Core task\nUNKNOWN"));
        assert!(text.contains("- No special constraints"));
        assert!(text.contains("As UNKNOWN, follow the rules"));
    }

    #[test]
    fn langgpt_uses_role_name_and_skills() {
        let text = render_final_prompt(&catalog(), Framework::Langgpt, &copywriter_spec()).unwrap();
        assert!(text.starts_with("# Role: Senior e-commerce copywriter\n"));
        assert!(text.contains("## Skills\n- Stay under 120 words"));
        assert!(text.contains("2. Write product descriptions for kitchen appliances"));
    }

    #[test]
    fn structured_is_xml() {
        let text = render_final_prompt(&catalog(), Framework::Structured, &copywriter_spec()).unwrap();
        assert!(text.starts_with("<system>"));
        assert!(text.ends_with("</system>"));
        assert!(text.contains("<rule>Stay under 120 words</rule>"));
    }

    #[test]
    fn role_names() {
        assert_eq!(role_name("资深文案，擅长电商"), "资深文案");
        assert_eq!(role_name("Tax advisor, precise"), "Tax advisor");
        assert_eq!(
            role_name("a very patient and kind tutor for young children"),
            "a very patient and kind tutor"
        );
        assert_eq!(role_name(""), UNKNOWN);
    }

    #[test]
    fn broken_template_is_template_error() {
        let err = render_template("broken", "{{ missing_var }}", minijinja::context! {}).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
