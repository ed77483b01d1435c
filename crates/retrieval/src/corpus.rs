//! Corpus segmentation — turns documents into indexable segments.

use std::collections::BTreeMap;

use promptforge_core::error::Result;
use promptforge_core::index::Segment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::chunker::{ChunkConfig, chunk_text};

/// A source document with arbitrary JSON metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Stable id; derived from content and source when absent.
    #[serde(default)]
    pub id: Option<String>,

    pub content: String,

    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Content-derived document id: SHA-256 of `source:` plus the first 200
/// characters, truncated to 32 hex digits.
pub fn generate_doc_id(content: &str, source: &str) -> String {
    let head: String = content.chars().take(200).collect();
    let digest = Sha256::digest(format!("{source}:{head}").as_bytes());
    digest
        .iter()
        .take(16)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Flatten JSON metadata to strings. Lists and objects become JSON text;
/// nulls are dropped.
pub fn coerce_metadata(metadata: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    metadata
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// Chunk a document into segments with ids `{doc_id}_chunk_{i}`.
///
/// Every segment carries the coerced document metadata plus `doc_id`,
/// `chunk_index` and `total_chunks`.
pub fn segment_document(document: &Document, config: &ChunkConfig) -> Result<Vec<Segment>> {
    let doc_id = document
        .id
        .clone()
        .unwrap_or_else(|| generate_doc_id(&document.content, document.source()));

    let chunks: Vec<String> = chunk_text(&document.content, config)?
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .collect();
    let total = chunks.len();
    let base = coerce_metadata(&document.metadata);

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = base.clone();
            metadata.insert("doc_id".into(), doc_id.clone());
            metadata.insert("chunk_index".into(), i.to_string());
            metadata.insert("total_chunks".into(), total.to_string());
            Segment {
                id: format!("{doc_id}_chunk_{i}"),
                text,
                metadata,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn doc_id_is_stable_and_source_sensitive() {
        let a = generate_doc_id("hello world", "faq.md");
        assert_eq!(a.len(), 32);
        assert_eq!(a, generate_doc_id("hello world", "faq.md"));
        assert_ne!(a, generate_doc_id("hello world", "other.md"));
    }

    #[test]
    fn doc_id_only_reads_prefix() {
        let head = "x".repeat(200);
        assert_eq!(
            generate_doc_id(&format!("{head}tail one"), "s"),
            generate_doc_id(&format!("{head}tail two"), "s")
        );
    }

    #[test]
    fn metadata_is_stringified() {
        let map = json!({
            "source": "guide.pdf",
            "page": 3,
            "tags": ["a", "b"],
            "draft": false,
            "owner": null
        });
        let coerced = coerce_metadata(map.as_object().unwrap());
        assert_eq!(coerced["source"], "guide.pdf");
        assert_eq!(coerced["page"], "3");
        assert_eq!(coerced["tags"], r#"["a","b"]"#);
        assert_eq!(coerced["draft"], "false");
        assert!(!coerced.contains_key("owner"));
    }

    #[test]
    fn segments_carry_position_metadata() {
        let doc = Document::new("Paragraph one.\n\nParagraph two is here.\n\nParagraph three ends it.")
            .with_id("guide")
            .with_metadata("source", "guide.md");
        let segments = segment_document(&doc, &ChunkConfig::new(30, 5).unwrap()).unwrap();

        assert!(segments.len() > 1);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.id, format!("guide_chunk_{i}"));
            assert_eq!(seg.metadata["chunk_index"], i.to_string());
            assert_eq!(seg.metadata["total_chunks"], segments.len().to_string());
            assert_eq!(seg.metadata["source"], "guide.md");
            assert_eq!(seg.metadata["doc_id"], "guide");
        }
    }

    #[test]
    fn short_document_is_one_segment() {
        let doc = Document::new("tiny").with_metadata("source", "n.txt");
        let segments = segment_document(&doc, &ChunkConfig::default()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, format!("{}_chunk_0", generate_doc_id("tiny", "n.txt")));
    }

    #[test]
    fn blank_document_has_no_segments() {
        let segments = segment_document(&Document::new("   "), &ChunkConfig::default()).unwrap();
        assert!(segments.is_empty());
    }
}
