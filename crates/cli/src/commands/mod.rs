//! Subcommand implementations and the wiring they share.

pub mod assemble;
pub mod classify;
pub mod compile;
pub mod config_cmd;
pub mod index;

use std::sync::Arc;

use promptforge_config::AppConfig;
use promptforge_engine::{PromptAssembler, PromptCatalog, SkillLibrary};
use promptforge_retrieval::{FileVectorIndex, Retriever};
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Catalog and skills from config (built-ins unless paths are set).
pub fn build_assembler(config: &AppConfig) -> CliResult<Arc<PromptAssembler>> {
    let catalog = PromptCatalog::load(config.assembly.catalog_path.as_deref())?;

    let mut skills = SkillLibrary::builtin();
    if let Some(dir) = &config.assembly.skills_dir {
        let loaded = skills.load_dir(dir)?;
        debug!(dir = %dir.display(), loaded, "Loaded skill files");
    }

    Ok(Arc::new(PromptAssembler::new(
        Arc::new(catalog),
        Arc::new(skills),
    )))
}

/// Configured embedder over the file-backed index.
pub fn build_retriever(config: &AppConfig) -> CliResult<Retriever> {
    let embedder = promptforge_providers::build_embedder(config)?;
    let index = FileVectorIndex::open(config.retrieval.resolved_index_path());
    debug!(path = %index.path().display(), embedder = embedder.name(), "Retriever ready");
    Ok(Retriever::new(embedder, Arc::new(index)))
}
