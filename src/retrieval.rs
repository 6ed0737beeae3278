//! Retrieval over indexed collections.
//!
//! Unknown source ids are always `NotFound`, so callers can tell "nothing indexed under
//! that name" apart from "indexed, but nothing matched".

use crate::chunking::Chunk;
use crate::error::{Result, SitatError};
use crate::source::SourcePosition;
use crate::vector_store::{IndexedSource, VectorStore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A chunk matched by a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Read-side access to collections.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    async fn ensure_exists(&self, source_id: &str) -> Result<()> {
        if self.store.source_exists(source_id).await? {
            Ok(())
        } else {
            Err(SitatError::NotFound(source_id.to_string()))
        }
    }

    /// Top `k` chunks by similarity, ties broken by ascending chunk index.
    #[instrument(skip(self, query_embedding))]
    pub async fn search(
        &self,
        source_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.ensure_exists(source_id).await?;

        let results: Vec<SearchResult> = self
            .store
            .query(source_id, query_embedding, k)
            .await?
            .into_iter()
            .map(|scored| SearchResult {
                chunk: scored.record.chunk,
                score: scored.score,
            })
            .collect();

        debug!("Retrieved {} chunks from {}", results.len(), source_id);
        Ok(results)
    }

    /// All chunks of a source, in order.
    pub async fn chunks(&self, source_id: &str) -> Result<Vec<Chunk>> {
        self.ensure_exists(source_id).await?;
        Ok(self
            .store
            .get_by_source(source_id)
            .await?
            .into_iter()
            .map(|record| record.chunk)
            .collect())
    }

    /// Chunks whose position lies within `window` of `position`.
    ///
    /// Bounds are closed and the lower one is clamped at 0. Line positions only match
    /// chunks from the same document. Ordered by position, then chunk index.
    #[instrument(skip(self))]
    pub async fn context_window(
        &self,
        source_id: &str,
        position: &SourcePosition,
        window: f64,
    ) -> Result<Vec<Chunk>> {
        let chunks = self.chunks(source_id).await?;
        Ok(window_around(chunks, position, window))
    }

    pub async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        self.store.list_sources().await
    }
}

fn window_around(chunks: Vec<Chunk>, position: &SourcePosition, window: f64) -> Vec<Chunk> {
    let center = position.offset();
    let low = (center - window).max(0.0);
    let high = center + window;

    let mut selected: Vec<Chunk> = chunks
        .into_iter()
        .filter(|c| c.source_position.same_axis(position))
        .filter(|c| {
            let offset = c.source_position.offset();
            offset >= low && offset <= high
        })
        .collect();

    selected.sort_by(|a, b| {
        a.source_position
            .offset()
            .partial_cmp(&b.source_position.offset())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use crate::vector_store::{MemoryVectorStore, Record, SourceInfo};

    fn chunk(index: usize, position: SourcePosition) -> Chunk {
        Chunk {
            id: Chunk::make_id("v", index),
            source_id: "v".to_string(),
            text: format!("chunk {}", index),
            char_start: index * 10,
            char_end: index * 10 + 15,
            source_position: position,
            chunk_index: index,
        }
    }

    async fn retriever_with(records: Vec<Record>) -> Retriever {
        let store = Arc::new(MemoryVectorStore::new());
        let info = SourceInfo {
            source_id: "v".to_string(),
            title: "Video".to_string(),
            kind: SourceKind::Transcript,
            origin: String::new(),
        };
        store.replace_source(&info, &records).await.unwrap();
        Retriever::new(store)
    }

    #[tokio::test]
    async fn test_search_top_five_with_tie_break() {
        let embeddings = [
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![1.0, 0.0],
            vec![0.5, 0.0],
            vec![1.0, 0.2],
            vec![0.0, 1.0],
        ];
        let records = embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| Record::new(chunk(i, SourcePosition::timestamp(i as f64)), e.clone()))
            .collect();
        let retriever = retriever_with(records).await;

        let results = retriever.search("v", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 5);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let order: Vec<usize> = results.iter().map(|r| r.chunk.chunk_index).collect();
        // 1, 3 and 4 all score 1.0
        assert_eq!(order, vec![1, 3, 4, 5, 2]);
    }

    #[tokio::test]
    async fn test_unknown_source_is_not_found() {
        let retriever = retriever_with(vec![]).await;

        assert!(retriever.search("nope", &[1.0], 5).await.unwrap_err().is_not_found());
        assert!(retriever
            .context_window("nope", &SourcePosition::timestamp(0.0), 30.0)
            .await
            .unwrap_err()
            .is_not_found());

        // Known but empty is not an error
        assert!(retriever.search("v", &[1.0], 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_window_closed_bounds_clamped_at_zero() {
        let chunks: Vec<Chunk> = [0.0, 10.0, 20.0, 30.0, 45.0]
            .iter()
            .enumerate()
            .map(|(i, s)| chunk(i, SourcePosition::timestamp(*s)))
            .collect();

        let picked = window_around(chunks.clone(), &SourcePosition::timestamp(5.0), 15.0);
        let idx: Vec<usize> = picked.iter().map(|c| c.chunk_index).collect();
        assert_eq!(idx, vec![0, 1, 2]);

        // Both ends are inclusive: 15..=45
        let picked = window_around(chunks, &SourcePosition::timestamp(30.0), 15.0);
        let idx: Vec<usize> = picked.iter().map(|c| c.chunk_index).collect();
        assert_eq!(idx, vec![2, 3, 4]);
    }

    #[test]
    fn test_window_stays_in_same_document() {
        let chunks = vec![
            chunk(0, SourcePosition::line("a.md", 1)),
            chunk(1, SourcePosition::line("a.md", 20)),
            chunk(2, SourcePosition::line("b.md", 3)),
            chunk(3, SourcePosition::line("b.md", 9)),
        ];

        let picked = window_around(chunks, &SourcePosition::line("b.md", 5), 10.0);
        let idx: Vec<usize> = picked.iter().map(|c| c.chunk_index).collect();
        assert_eq!(idx, vec![2, 3]);
    }
}
