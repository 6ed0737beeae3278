//! Collection management: one collection of chunk records per source id.

use crate::chunking::Chunk;
use crate::error::{Result, SitatError};
use crate::vector_store::{IndexedSource, Record, SourceInfo, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// What to do when ingesting a source id that is already indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReingestPolicy {
    /// Atomically swap the old chunk set for the new one.
    #[default]
    Replace,
    /// Refuse with `ReingestConflict`.
    Reject,
}

impl std::fmt::Display for ReingestPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReingestPolicy::Replace => write!(f, "replace"),
            ReingestPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for ReingestPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(ReingestPolicy::Replace),
            "reject" => Ok(ReingestPolicy::Reject),
            _ => Err(format!("Unknown reingest policy: {}", s)),
        }
    }
}

/// Writes and lists collections in a vector store.
pub struct CollectionManager {
    store: Arc<dyn VectorStore>,
    policy: ReingestPolicy,
}

impl CollectionManager {
    pub fn new(store: Arc<dyn VectorStore>, policy: ReingestPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ReingestPolicy {
        self.policy
    }

    /// Store one record per chunk under `source.source_id`.
    ///
    /// Nothing is written if the inputs do not line up or the policy refuses.
    #[instrument(skip(self, source, chunks, embeddings), fields(source_id = %source.source_id))]
    pub async fn upsert(
        &self,
        source: &SourceInfo,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(SitatError::InvalidInput(format!(
                "Got {} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        if let Some(chunk) = chunks.iter().find(|c| c.source_id != source.source_id) {
            return Err(SitatError::InvalidInput(format!(
                "Chunk {} does not belong to {}",
                chunk.id, source.source_id
            )));
        }

        let records: Vec<Record> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Record::new(chunk, embedding))
            .collect();

        let stored = match self.policy {
            ReingestPolicy::Replace => self.store.replace_source(source, &records).await?,
            ReingestPolicy::Reject => self.store.insert_source(source, &records).await?,
        };

        info!("Stored {} records for {}", stored, source.source_id);
        Ok(stored)
    }

    pub async fn exists(&self, source_id: &str) -> Result<bool> {
        self.store.source_exists(source_id).await
    }

    pub async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        self.store.list_sources().await
    }

    /// Look up one source, failing with `NotFound` if it is not indexed.
    pub async fn get(&self, source_id: &str) -> Result<IndexedSource> {
        self.store
            .get_source(source_id)
            .await?
            .ok_or_else(|| SitatError::NotFound(source_id.to_string()))
    }

    /// Remove a collection. Fails with `NotFound` if it is not indexed.
    #[instrument(skip(self))]
    pub async fn delete(&self, source_id: &str) -> Result<usize> {
        if !self.store.source_exists(source_id).await? {
            return Err(SitatError::NotFound(source_id.to_string()));
        }
        self.store.delete_source(source_id).await
    }
}
