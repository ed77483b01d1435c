//! `promptforge compile` — Interactive clarification, then refinement.

use std::io::Write;
use std::sync::Arc;

use promptforge_config::AppConfig;
use promptforge_core::error::Error;
use promptforge_core::prompt::{FinalPrompt, Framework, Question, TurnResult};
use promptforge_engine::{AssemblyRequest, ClarificationEngine, Conversation, IntentClassifier};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CliResult, build_assembler, build_retriever, load_config};

pub struct CompileArgs {
    pub idea: Option<String>,
    pub framework: Option<String>,
    pub max_turns: Option<u32>,
    pub scenario: Option<String>,
    pub persona: Option<String>,
    pub auto: bool,
    pub retrieval: bool,
}

pub async fn run(args: CompileArgs) -> CliResult {
    let config = load_config()?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PROMPTFORGE_API_KEY=sk-...   (generic)");
        eprintln!("    OPENAI_API_KEY=sk-...        (OpenAI)");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-... (Anthropic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let assembler = build_assembler(&config)?;
    let router = promptforge_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let retrieval = args.retrieval || config.dialogue.retrieval;
    let mut engine = ClarificationEngine::new(provider, assembler.clone(), &config.default_model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);
    if retrieval {
        engine = engine.with_retriever(Arc::new(build_retriever(&config)?), config.retrieval.n_results);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let idea = match args.idea {
        Some(idea) => idea,
        None => {
            prompt("  Idea > ")?;
            lines.next_line().await?.unwrap_or_default()
        }
    };
    if idea.trim().is_empty() {
        return Err("No idea given".into());
    }

    let mut options = AssemblyRequest::from_config(&config.assembly);
    if args.auto {
        let guess = IntentClassifier::new(assembler.shared_catalog()).classify(&idea);
        println!(
            "  Scenario:  {} (confidence {:.2}, persona {}, template {})",
            guess.scenario,
            guess.confidence,
            guess.persona.as_deref().unwrap_or("-"),
            guess.template
        );
        options.scenario = guess.scenario;
        options.persona = guess.persona.or(options.persona);
        options.template = guess.template;
    }
    if let Some(scenario) = args.scenario {
        options.scenario = scenario;
    }
    if args.persona.is_some() {
        options.persona = args.persona;
    }

    let mut convo = Conversation::from_config(idea, &config)
        .with_options(options)
        .with_retrieval(retrieval);
    if let Some(framework) = args.framework {
        convo = convo.with_framework(Framework::from_id(&framework));
    }
    if let Some(max_turns) = args.max_turns {
        convo = convo.with_max_turns(max_turns);
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        PromptForge — Prompt Compiler          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", engine.provider_name());
    println!("  Model:     {}", config.default_model);
    println!("  Framework: {}", convo.framework());
    println!("  Turns:     up to {}", convo.max_turns());
    println!();
    println!("  Answer with an option number or your own words.");
    println!("  Type 'r' to ask differently, 'exit' to quit.");

    let mut result = convo.start(&engine).await?;
    let final_prompt = loop {
        let question = match result {
            TurnResult::FinalPrompt(prompt) => break prompt,
            TurnResult::Question(question) => question,
        };
        print_question(&question);

        prompt("  You > ")?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let line = line.trim();

        result = match line {
            "exit" | "quit" => return Ok(()),
            "r" | "rethink" => convo.rethink(&engine).await?,
            _ => convo.reply(&engine, &resolve_answer(&question, line)).await?,
        };
    };
    print_final(&final_prompt);

    loop {
        prompt("  Refine (empty to finish) > ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line == "exit" || line == "quit" {
            break;
        }

        match convo.refine(&engine, line).await {
            Ok(refined) => print_final(&refined),
            Err(e @ Error::TurnLimitReached { .. }) => {
                println!("  {e}");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn prompt(text: &str) -> CliResult {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

/// An option number picks that option's value; anything else is free text.
pub(crate) fn resolve_answer(question: &Question, input: &str) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i))
        .map(|option| option.value.clone())
        .unwrap_or_else(|| input.to_string())
}

fn print_question(question: &Question) {
    println!();
    println!("  [{}/{}] {}", question.current_turn, question.max_turns, question.text);
    for (i, option) in question.options.iter().enumerate() {
        println!("     {}. {}", i + 1, option.label);
    }
    if let Some(hint) = &question.hint {
        println!("     ({hint})");
    }
}

fn print_final(prompt: &FinalPrompt) {
    println!();
    println!("  ── Final prompt ─────────────────────────────────");
    println!();
    println!("{}", prompt.rendered_text);
    println!();
    if !prompt.tags.is_empty() {
        println!("  Tags: {}", prompt.tags.join(", "));
    }
    for item in &prompt.quality_checklist {
        println!("  ✔ {item}");
    }
    if !prompt.spec.unknowns.is_empty() {
        println!("  Open questions: {}", prompt.spec.unknowns.join("; "));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptforge_core::prompt::QuestionOption;

    fn question() -> Question {
        Question {
            text: "Tone?".into(),
            options: vec![
                QuestionOption {
                    label: "Warm".into(),
                    value: "warm and friendly".into(),
                },
                QuestionOption {
                    label: "Formal".into(),
                    value: "formal".into(),
                },
            ],
            allow_custom: true,
            hint: None,
            understanding_snapshot: None,
            current_turn: 1,
            max_turns: 5,
        }
    }

    #[test]
    fn option_numbers_pick_values() {
        assert_eq!(resolve_answer(&question(), "1"), "warm and friendly");
        assert_eq!(resolve_answer(&question(), "2"), "formal");
    }

    #[test]
    fn other_input_is_free_text() {
        assert_eq!(resolve_answer(&question(), "0"), "0");
        assert_eq!(resolve_answer(&question(), "3"), "3");
        assert_eq!(resolve_answer(&question(), "playful"), "playful");
    }
}
