//! Vector store abstraction for Sitat.
//!
//! Provides a trait-based interface for different vector database backends. A store
//! holds one collection per source id; a collection is always written as a whole.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::error::Result;
use crate::source::SourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A chunk stored together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl Record {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// A record matched by a query, with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matched record.
    pub record: Record,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Metadata written alongside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_id: String,
    pub title: String,
    pub kind: SourceKind,
    /// URL or path the source was read from.
    pub origin: String,
}

/// Summary information about an indexed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source ID.
    pub source_id: String,
    /// Source title.
    pub title: String,
    /// Transcript or document.
    pub kind: SourceKind,
    /// URL or path the source was read from.
    pub origin: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the source was (re)indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedSource {
    /// The metadata this source was written with.
    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            source_id: self.source_id.clone(),
            title: self.title.clone(),
            kind: self.kind,
            origin: self.origin.clone(),
        }
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Swap the records of a source for `records` in one atomic step.
    ///
    /// Creates the source if it does not exist yet.
    async fn replace_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize>;

    /// Store a new source. Fails with `ReingestConflict` if it already exists.
    async fn insert_source(&self, source: &SourceInfo, records: &[Record]) -> Result<usize>;

    /// Rank the records of one source against a query embedding.
    ///
    /// Results are ordered by descending score, ties broken by ascending chunk index.
    /// An unknown source yields an empty list.
    async fn query(
        &self,
        source_id: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>>;

    /// Check if a source is indexed.
    async fn source_exists(&self, source_id: &str) -> Result<bool>;

    /// List all indexed sources, most recently indexed first.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get a specific source's information.
    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>>;

    /// All records for a source, ordered by chunk index.
    async fn get_by_source(&self, source_id: &str) -> Result<Vec<Record>>;

    /// Delete a source and its records. Returns the number of records removed.
    async fn delete_source(&self, source_id: &str) -> Result<usize>;

    /// Get total record count.
    async fn record_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Order by descending score, then ascending chunk index.
pub fn compare_scored(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.record.chunk.chunk_index.cmp(&b.record.chunk.chunk_index))
}

/// Score records against a query and keep the best `limit`.
pub(crate) fn rank<'a, I>(records: I, query_embedding: &[f32], limit: usize) -> Vec<ScoredRecord>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut results: Vec<ScoredRecord> = records
        .into_iter()
        .map(|record| ScoredRecord {
            score: cosine_similarity(query_embedding, &record.embedding),
            record: record.clone(),
        })
        .collect();

    results.sort_by(compare_scored);
    results.truncate(limit);
    results
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_breaks_ties_by_chunk_index() {
        let records = vec![
            record("v", 3, 30.0, vec![1.0, 0.0]),
            record("v", 1, 10.0, vec![1.0, 0.0]),
            record("v", 0, 0.0, vec![0.0, 1.0]),
            record("v", 2, 20.0, vec![2.0, 0.0]),
        ];

        let ranked = rank(&records, &[1.0, 0.0], 3);
        let order: Vec<usize> = ranked.iter().map(|r| r.record.chunk.chunk_index).collect();
        // Equal scores for 1, 2 and 3: ordered by index
        assert_eq!(order, vec![1, 2, 3]);
    }
}
