//! Vector index trait — storage and nearest-neighbour lookup for segments.
//!
//! A segment is a chunk of a document that can be retrieved on its own.
//! Indexes store one vector per segment id; upserting an existing id
//! replaces its vector, text and metadata wholesale.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// A retrievable piece of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Unique segment ID
    pub id: String,

    /// The segment text
    pub text: String,

    /// Flat string metadata (all values coerced to strings)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Segment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A segment together with its embedding, as stored in an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub segment: Segment,
    pub vector: Vec<f32>,
}

/// One query hit. `distance` is a cosine distance: 0.0 is identical.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub segment: Segment,
    pub distance: f32,
}

/// Equality filter over segment metadata. Every pair must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub equals: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    /// Whether a segment passes this filter.
    pub fn matches(&self, segment: &Segment) -> bool {
        self.equals
            .iter()
            .all(|(k, v)| segment.metadata.get(k) == Some(v))
    }
}

/// The core VectorIndex trait.
///
/// Implementations: in-memory (for tests and short sessions), JSONL file.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The backend name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// Insert or replace records by segment id.
    async fn upsert(&self, records: Vec<IndexRecord>) -> std::result::Result<(), IndexError>;

    /// Return up to `k` nearest records, closest first.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> std::result::Result<Vec<IndexHit>, IndexError>;

    /// Total stored records.
    async fn count(&self) -> std::result::Result<usize, IndexError>;

    /// Remove every record.
    async fn clear(&self) -> std::result::Result<(), IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_requires_every_pair() {
        let seg = Segment::new("a", "text")
            .with_metadata("source", "faq")
            .with_metadata("lang", "en");

        assert!(MetadataFilter::new().matches(&seg));
        assert!(MetadataFilter::new().eq("source", "faq").matches(&seg));
        assert!(
            !MetadataFilter::new()
                .eq("source", "faq")
                .eq("lang", "de")
                .matches(&seg)
        );
        assert!(!MetadataFilter::new().eq("missing", "x").matches(&seg));
    }

    #[test]
    fn segment_serialization() {
        let seg = Segment::new("doc_chunk_0", "hello").with_metadata("chunk_index", "0");
        let json = serde_json::to_string(&seg).unwrap();
        assert!(json.contains("doc_chunk_0"));
        let back: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }
}
