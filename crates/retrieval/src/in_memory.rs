//! In-memory vector index — useful for testing and ephemeral sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use promptforge_core::error::IndexError;
use promptforge_core::index::{IndexHit, IndexRecord, MetadataFilter, VectorIndex};
use tokio::sync::RwLock;

use crate::vector::nearest;

/// An in-memory index keyed by segment id.
pub struct InMemoryVectorIndex {
    records: Arc<RwLock<BTreeMap<String, IndexRecord>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// All vectors in one index share a dimension. Checked before any write.
pub(crate) fn check_dimensions(
    stored: &BTreeMap<String, IndexRecord>,
    incoming: &[IndexRecord],
) -> Result<(), IndexError> {
    let expected = stored
        .values()
        .next()
        .or_else(|| incoming.first())
        .map(|r| r.vector.len());

    if let Some(expected) = expected {
        if let Some(bad) = incoming.iter().find(|r| r.vector.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), IndexError> {
        let mut stored = self.records.write().await;
        check_dimensions(&stored, &records)?;
        for record in records {
            stored.insert(record.segment.id.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>, IndexError> {
        let stored = self.records.read().await;
        Ok(nearest(stored.values(), vector, k, filter))
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptforge_core::index::Segment;

    fn record(id: &str, text: &str, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            segment: Segment::new(id, text),
            vector,
        }
    }

    #[tokio::test]
    async fn upsert_and_query() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", "apples", vec![1.0, 0.0]),
                record("b", "bananas", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[0.9, 0.1], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment.text, "apples");
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = InMemoryVectorIndex::new();
        index.upsert(vec![record("a", "old", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![record("a", "new", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.0, 1.0], 5, None).await.unwrap();
        assert_eq!(hits[0].segment.text, "new");
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn dimension_mismatch_writes_nothing() {
        let index = InMemoryVectorIndex::new();
        index.upsert(vec![record("a", "a", vec![1.0, 0.0])]).await.unwrap();

        let err = index
            .upsert(vec![
                record("b", "b", vec![1.0, 0.0]),
                record("c", "c", vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_empties_index() {
        let index = InMemoryVectorIndex::new();
        index.upsert(vec![record("a", "a", vec![1.0])]).await.unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.query(&[1.0], 3, None).await.unwrap().is_empty());
    }
}
