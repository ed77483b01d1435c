//! `promptforge classify` — Scenario guess for an idea.

use promptforge_engine::IntentClassifier;

use super::{CliResult, build_assembler, load_config};

pub fn run(idea: &str) -> CliResult {
    let config = load_config()?;
    let assembler = build_assembler(&config)?;
    let classifier = IntentClassifier::new(assembler.shared_catalog());

    let result = classifier.classify(idea);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
