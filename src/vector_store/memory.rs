//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank, IndexedSource, Record, ScoredRecord, SourceInfo, VectorStore};
use crate::error::{Result, SitatError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct StoredSource {
    info: SourceInfo,
    records: Vec<Record>,
    indexed_at: DateTime<Utc>,
}

impl StoredSource {
    fn summary(&self) -> IndexedSource {
        IndexedSource {
            source_id: self.info.source_id.clone(),
            title: self.info.title.clone(),
            kind: self.info.kind,
            origin: self.info.origin.clone(),
            chunk_count: self.records.len() as u32,
            indexed_at: self.indexed_at,
        }
    }
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    sources: RwLock<HashMap<String, StoredSource>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredSource>>> {
        self.sources
            .read()
            .map_err(|e| SitatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredSource>>> {
        self.sources
            .write()
            .map_err(|e| SitatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn stored(source: &SourceInfo, records: &[Record]) -> StoredSource {
        let mut records = records.to_vec();
        records.sort_by_key(|r| r.chunk.chunk_index);
        StoredSource {
            info: source.clone(),
            records,
            indexed_at: Utc::now(),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn replace_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize> {
        let mut sources = self.write()?;
        sources.insert(source.source_id.clone(), Self::stored(source, records));
        Ok(records.len())
    }

    async fn insert_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize> {
        let mut sources = self.write()?;
        if sources.contains_key(&source.source_id) {
            return Err(SitatError::ReingestConflict(source.source_id.clone()));
        }
        sources.insert(source.source_id.clone(), Self::stored(source, records));
        Ok(records.len())
    }

    async fn query(
        &self,
        source_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let sources = self.read()?;
        Ok(sources
            .get(source_id)
            .map(|s| rank(&s.records, query_embedding, limit))
            .unwrap_or_default())
    }

    async fn source_exists(&self, source_id: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(source_id))
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let sources = self.read()?;
        let mut list: Vec<IndexedSource> = sources.values().map(StoredSource::summary).collect();
        list.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        Ok(list)
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>> {
        Ok(self.read()?.get(source_id).map(StoredSource::summary))
    }

    async fn get_by_source(&self, source_id: &str) -> Result<Vec<Record>> {
        Ok(self
            .read()?
            .get(source_id)
            .map(|s| s.records.clone())
            .unwrap_or_default())
    }

    async fn delete_source(&self, source_id: &str) -> Result<usize> {
        Ok(self
            .write()?
            .remove(source_id)
            .map(|s| s.records.len())
            .unwrap_or(0))
    }

    async fn record_count(&self) -> Result<usize> {
        Ok(self.read()?.values().map(|s| s.records.len()).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::{info, record};

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let records = vec![
            record("video1", 0, 0.0, vec![1.0, 0.0, 0.0]),
            record("video1", 1, 30.0, vec![0.0, 1.0, 0.0]),
        ];
        store.replace_source(&info("video1"), &records).await.unwrap();

        assert_eq!(store.record_count().await.unwrap(), 2);

        let results = store.query("video1", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[0].title, "Title of video1");
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_collection() {
        let store = MemoryVectorStore::new();
        let old: Vec<Record> = (0..5).map(|i| record("v", i, i as f64, vec![1.0])).collect();
        store.replace_source(&info("v"), &old).await.unwrap();

        let new: Vec<Record> = (0..2).map(|i| record("v", i, i as f64, vec![1.0])).collect();
        store.replace_source(&info("v"), &new).await.unwrap();

        assert_eq!(store.get_by_source("v").await.unwrap().len(), 2);
        assert_eq!(store.record_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_existing_source() {
        let store = MemoryVectorStore::new();
        store
            .insert_source(&info("v"), &[record("v", 0, 0.0, vec![1.0])])
            .await
            .unwrap();

        let err = store
            .insert_source(&info("v"), &[record("v", 0, 0.0, vec![0.5])])
            .await
            .unwrap_err();
        assert!(matches!(err, SitatError::ReingestConflict(_)));

        let kept = store.get_by_source("v").await.unwrap();
        assert_eq!(kept[0].embedding, vec![1.0]);
    }

    #[tokio::test]
    async fn test_sources_are_isolated() {
        let store = MemoryVectorStore::new();
        store
            .replace_source(&info("a"), &[record("a", 0, 0.0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .replace_source(&info("b"), &[record("b", 0, 0.0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.query("a", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.chunk.source_id, "a");
        assert!(store.query("missing", &[1.0, 0.0], 10).await.unwrap().is_empty());

        assert_eq!(store.delete_source("a").await.unwrap(), 1);
        assert!(!store.source_exists("a").await.unwrap());
        assert!(store.source_exists("b").await.unwrap());
    }
}
