//! `promptforge config` — Configuration commands.

use promptforge_config::AppConfig;

use super::CliResult;

pub fn show() {
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
}

pub fn validate() -> CliResult {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set PROMPTFORGE_API_KEY or OPENAI_API_KEY)");
            }
            if config.retrieval.embedding_provider == "anthropic" {
                warnings.push("retrieval.embedding_provider 'anthropic' has no embeddings");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:   {}", config.default_provider);
            println!("   Model:      {}", config.default_model);
            println!(
                "   Dialogue:   {} turns, {} framework, refine {:?}",
                config.dialogue.max_turns, config.dialogue.framework, config.dialogue.refine_policy
            );
            println!(
                "   Assembly:   scenario={}, template={}, verbosity={}",
                config.assembly.scenario, config.assembly.template, config.assembly.verbosity
            );
            println!(
                "   Retrieval:  chunk {} / overlap {}, index {}",
                config.retrieval.chunk_size,
                config.retrieval.overlap,
                config.retrieval.resolved_index_path().display()
            );
            Ok(())
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            Err(e.into())
        }
    }
}
