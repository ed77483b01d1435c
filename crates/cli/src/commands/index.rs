//! `promptforge index` / `promptforge search` — The retrieval corpus.

use std::path::Path;

use promptforge_core::index::MetadataFilter;
use promptforge_retrieval::{ChunkConfig, Document, segment_document};

use super::{CliResult, build_retriever, load_config};

pub async fn run(file: &Path, clear: bool) -> CliResult {
    let config = load_config()?;
    let retriever = build_retriever(&config)?;

    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let chunking = ChunkConfig::new(config.retrieval.chunk_size, config.retrieval.overlap)?;
    let document = Document::new(content)
        .with_metadata("source", source.clone())
        .with_metadata("path", file.display().to_string());
    let segments = segment_document(&document, &chunking)?;

    if clear {
        retriever.clear().await?;
    }
    let added = retriever.add_batch(segments).await?;
    let stats = retriever.stats().await?;

    println!("📚 Indexed {source}");
    println!("   Segments added: {added}");
    println!("   Corpus size:    {}", stats.segments);
    println!("   Embedder:       {}", stats.embedder);
    println!(
        "   Index:          {}",
        config.retrieval.resolved_index_path().display()
    );
    Ok(())
}

pub async fn search(query: &str, limit: Option<usize>, source: Option<String>) -> CliResult {
    let config = load_config()?;
    let retriever = build_retriever(&config)?;

    let filter = source.map(|s| MetadataFilter::new().eq("source", s));
    let n = limit.unwrap_or(config.retrieval.n_results);
    let hits = retriever.search(query, n, filter.as_ref()).await?;

    if hits.is_empty() {
        println!("   No matching segments. Add documents with `promptforge index <FILE>`.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let source = hit.metadata.get("source").map(String::as_str).unwrap_or("-");
        let preview: String = hit.text.chars().take(120).collect();
        println!("  {:>2}. [score: {:.2}] {source} ({})", i + 1, hit.score, hit.id);
        println!("      {}", preview.replace('\n', " "));
    }
    Ok(())
}
