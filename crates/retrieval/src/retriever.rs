//! Retriever — embeds segments into a vector index and ranks them against
//! a text query.

use std::collections::BTreeMap;
use std::sync::Arc;

use promptforge_core::error::{Error, Result};
use promptforge_core::index::{IndexRecord, MetadataFilter, Segment, VectorIndex};
use promptforge_core::provider::Embedder;
use serde::Serialize;
use tracing::{debug, info};

/// A ranked search hit. `score` is `1 - cosine distance`; higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSegment {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

/// Summary of the retriever's backing stores.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStats {
    pub segments: usize,
    pub embedder: String,
    pub index: String,
}

/// Pairs an embedder with a vector index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed and store a single segment.
    pub async fn add(&self, segment: Segment) -> Result<()> {
        self.add_batch(vec![segment]).await.map(|_| ())
    }

    /// Embed all segments with one batch call, then upsert them by id.
    ///
    /// If the embedder fails or returns the wrong number of vectors, nothing
    /// is written.
    pub async fn add_batch(&self, segments: Vec<Segment>) -> Result<usize> {
        if segments.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        if vectors.len() != segments.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} segments",
                vectors.len(),
                segments.len()
            )));
        }

        let count = segments.len();
        let records = segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| IndexRecord { segment, vector })
            .collect();

        self.index.upsert(records).await?;
        info!(count, index = self.index.name(), "Indexed segments");
        Ok(count)
    }

    /// Return up to `n_results` segments ranked by similarity to `query`.
    ///
    /// Sorted by descending score; equal scores by ascending id.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedSegment>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let hits = self.index.query(&vector, n_results, filter).await?;

        let mut results: Vec<RetrievedSegment> = hits
            .into_iter()
            .map(|hit| RetrievedSegment {
                id: hit.segment.id,
                text: hit.segment.text,
                metadata: hit.segment.metadata,
                score: 1.0 - hit.distance,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(n_results);

        debug!(query_len = query.len(), hits = results.len(), "Retrieval complete");
        Ok(results)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.index.count().await?)
    }

    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await?;
        info!(index = self.index.name(), "Index cleared");
        Ok(())
    }

    pub async fn stats(&self) -> Result<RetrieverStats> {
        Ok(RetrieverStats {
            segments: self.count().await?,
            embedder: self.embedder.name().to_string(),
            index: self.index.name().to_string(),
        })
    }
}

/// Render hits as a numbered reference block for a chat context.
pub fn format_context(hits: &[RetrievedSegment]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let source = hit
                .metadata
                .get("source")
                .map(String::as_str)
                .unwrap_or(hit.id.as_str());
            format!(
                "[{}] (source: {}, relevance: {:.2})\n{}",
                i + 1,
                source,
                hit.score,
                hit.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
