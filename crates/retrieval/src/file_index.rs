//! File-backed vector index — persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `IndexRecord` (segment plus vector). Records
//! are loaded into memory on creation and the file is rewritten on every
//! mutation. A mutation whose write fails leaves both the file and the
//! in-memory view untouched.
//!
//! Default location: `~/.promptforge/index.jsonl`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use promptforge_core::error::IndexError;
use promptforge_core::index::{IndexHit, IndexRecord, MetadataFilter, VectorIndex};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::in_memory::check_dimensions;
use crate::vector::nearest;

/// A JSONL-backed vector index.
pub struct FileVectorIndex {
    path: PathBuf,
    records: Arc<RwLock<BTreeMap<String, IndexRecord>>>,
}

impl FileVectorIndex {
    /// Open the index at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "File vector index loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> BTreeMap<String, IndexRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return BTreeMap::new(), // File doesn't exist yet, start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<IndexRecord>(line) {
                Ok(record) => Some((record.segment.id.clone(), record)),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted index record");
                    None
                }
            })
            .collect()
    }

    /// Write all records to disk as JSONL.
    fn flush(&self, records: &BTreeMap<String, IndexRecord>) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Storage(format!("Failed to create index directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records.values() {
            let line = serde_json::to_string(record).map_err(|e| {
                IndexError::Storage(format!("Failed to serialize index record: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| IndexError::Storage(format!("Failed to write index file: {e}")))
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    fn name(&self) -> &str {
        "file"
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<(), IndexError> {
        let mut stored = self.records.write().await;
        check_dimensions(&stored, &records)?;

        let mut next = stored.clone();
        for record in records {
            next.insert(record.segment.id.clone(), record);
        }
        self.flush(&next)?;
        *stored = next;
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
        let mut stored = self.records.write().await;
        self.flush(&BTreeMap::new())?;
        stored.clear();
        Ok(())
    }
}
