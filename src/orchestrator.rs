//! Pipeline orchestrator for Sitat.
//!
//! Coordinates ingestion (fetch, flatten, chunk, embed, store) and the query side
//! (retrieve, prompt, complete, cite). Every stage is awaited before the next starts.

use crate::chunking::{Chunk, WindowChunker};
use crate::collection::{CollectionManager, ReingestPolicy};
use crate::completion::{Completer, ModelConfig, OpenAICompleter};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SitatError};
use crate::mapping::flatten;
use crate::rag::{CitedAnswer, PromptAssembler, RagEngine};
use crate::retrieval::{Retriever, SearchResult};
use crate::source::{detect_fetcher, FetchedSource, SourceKind, SourcePosition};
use crate::vector_store::{
    IndexedSource, MemoryVectorStore, SourceInfo, SqliteVectorStore, VectorStore,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-question overrides for [`Orchestrator::ask`].
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Number of chunks to retrieve (defaults to `retrieval.top_k`).
    pub top_k: Option<usize>,
    /// Passage cap for the prompt (defaults to `rag.max_chunks_in_prompt`).
    pub max_chunks: Option<usize>,
    /// Model override (defaults to `rag.model`).
    pub model: Option<String>,
    /// Add neighbouring chunks around each hit (defaults to `retrieval.expand_context`).
    pub expand_context: Option<bool>,
}

/// Result of ingesting a source.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub source_id: String,
    pub title: String,
    pub kind: SourceKind,
    /// Units read from the source.
    pub units: usize,
    /// Chunks written to the store.
    pub chunks_indexed: usize,
    /// Whether an earlier collection with this id was replaced.
    pub replaced: bool,
}

/// The main orchestrator for the Sitat pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
    vector_store: Arc<dyn VectorStore>,
    collections: CollectionManager,
    retriever: Retriever,
}

impl Orchestrator {
    /// Create an orchestrator with OpenAI clients and the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);
        let completer: Arc<dyn Completer> = Arc::new(OpenAICompleter::new()?);

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "memory" => Arc::new(MemoryVectorStore::new()),
            _ => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        };

        Self::with_components(settings, prompts, embedder, completer, vector_store)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        settings.validate()?;

        let collections =
            CollectionManager::new(vector_store.clone(), settings.ingest.reingest_policy);
        let retriever = Retriever::new(vector_store.clone());

        Ok(Self {
            settings,
            prompts,
            embedder,
            completer,
            vector_store,
            collections,
            retriever,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    fn rag_engine(&self, max_chunks: usize, model: ModelConfig) -> RagEngine {
        RagEngine::new(
            self.completer.clone(),
            PromptAssembler::new(self.prompts.clone(), max_chunks),
            model,
        )
    }

    /// Fetch a YouTube video or a document file/folder and index it.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn ingest(&self, input: &str, source_id: Option<&str>) -> Result<IngestResult> {
        self.settings.validate()?;

        let fetcher = detect_fetcher(input, &self.settings.ingest.transcript_language)
            .ok_or_else(|| {
                SitatError::SourceFetch(format!(
                    "Not a YouTube URL/ID or an existing file or folder: {}",
                    input
                ))
            })?;

        info!("Fetching {} source", fetcher.kind());
        let mut fetched = fetcher.fetch(input).await?;

        if let Some(id) = source_id {
            let id = id.trim();
            if id.is_empty() {
                return Err(SitatError::InvalidInput("Source id must not be empty".to_string()));
            }
            fetched.source_id = id.to_string();
        }

        self.ingest_fetched(fetched).await
    }

    /// Index units that have already been fetched.
    #[instrument(skip(self, fetched), fields(source_id = %fetched.source_id))]
    pub async fn ingest_fetched(&self, fetched: FetchedSource) -> Result<IngestResult> {
        let chunker = WindowChunker::new(self.settings.chunking.to_config())?;

        let replaced = self.collections.exists(&fetched.source_id).await?;
        if replaced && self.collections.policy() == ReingestPolicy::Reject {
            return Err(SitatError::ReingestConflict(fetched.source_id));
        }

        info!("Flattening {} units", fetched.units.len());
        let flattened = flatten(&fetched.units);

        let chunks = chunker.chunk(&fetched.source_id, &flattened);
        info!("Created {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            info!("Generating embeddings for {} chunks", texts.len());
            self.embedder.embed_batch(&texts).await?
        };

        let info = SourceInfo {
            source_id: fetched.source_id.clone(),
            title: fetched.title.clone(),
            kind: fetched.kind,
            origin: fetched.origin.clone(),
        };

        let chunks_indexed = self.collections.upsert(&info, chunks, embeddings).await?;

        Ok(IngestResult {
            source_id: fetched.source_id,
            title: fetched.title,
            kind: fetched.kind,
            units: fetched.units.len(),
            chunks_indexed,
            replaced,
        })
    }

    /// Answer a question about one source, with citations.
    #[instrument(skip(self, options), fields(question = %question))]
    pub async fn ask(
        &self,
        source_id: &str,
        question: &str,
        options: &AskOptions,
    ) -> Result<CitedAnswer> {
        let top_k = options.top_k.unwrap_or(self.settings.retrieval.top_k);
        let max_chunks = options
            .max_chunks
            .unwrap_or(self.settings.rag.max_chunks_in_prompt);
        if top_k == 0 || max_chunks == 0 {
            return Err(SitatError::InvalidInput(
                "top_k and max_chunks must be at least 1".to_string(),
            ));
        }

        let source = self.collections.get(source_id).await?.info();
        let mut model = self.settings.rag.model_config();
        if let Some(name) = &options.model {
            model.model = name.clone();
        }

        info!("Embedding question");
        let query_embedding = self.embedder.embed(question).await?;

        let hits: Vec<SearchResult> = self
            .retriever
            .search(source_id, &query_embedding, top_k)
            .await?
            .into_iter()
            .filter(|hit| hit.score >= self.settings.retrieval.min_score)
            .collect();
        info!("Retrieved {} chunks", hits.len());

        let expand = options
            .expand_context
            .unwrap_or(self.settings.retrieval.expand_context);
        let mut chunks = if expand {
            self.expand_hits(source_id, hits).await?
        } else {
            hits.into_iter().map(|hit| hit.chunk).collect()
        };
        chunks.truncate(max_chunks);

        self.rag_engine(max_chunks, model)
            .answer(question, &source, &chunks)
            .await
    }

    /// Each hit followed by its not-yet-seen neighbours within the context window.
    async fn expand_hits(&self, source_id: &str, hits: Vec<SearchResult>) -> Result<Vec<Chunk>> {
        let window = self.settings.retrieval.context_window;
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();

        for hit in hits {
            let neighbours = self
                .retriever
                .context_window(source_id, &hit.chunk.source_position, window)
                .await?;

            if seen.insert(hit.chunk.id.clone()) {
                chunks.push(hit.chunk);
            }
            for chunk in neighbours {
                if seen.insert(chunk.id.clone()) {
                    chunks.push(chunk);
                }
            }
        }

        debug!("Context expansion produced {} chunks", chunks.len());
        Ok(chunks)
    }

    /// Summarize a whole source, with citations.
    #[instrument(skip(self))]
    pub async fn summarize(&self, source_id: &str) -> Result<CitedAnswer> {
        let source = self.collections.get(source_id).await?.info();
        let chunks = self.retriever.chunks(source_id).await?;

        info!("Summarizing {} chunks", chunks.len());
        self.rag_engine(
            self.settings.rag.max_chunks_in_prompt,
            self.settings.rag.model_config(),
        )
        .summarize(&source, &chunks)
        .await
    }

    /// Semantic search within one source.
    #[instrument(skip(self))]
    pub async fn search(&self, source_id: &str, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if !self.collections.exists(source_id).await? {
            return Err(SitatError::NotFound(source_id.to_string()));
        }
        let query_embedding = self.embedder.embed(query).await?;
        self.retriever.search(source_id, &query_embedding, k).await
    }

    /// Chunks around a position, `window` seconds or lines each way.
    pub async fn context(
        &self,
        source_id: &str,
        position: &SourcePosition,
        window: Option<f64>,
    ) -> Result<Vec<Chunk>> {
        let window = window.unwrap_or(self.settings.retrieval.context_window);
        if window.is_nan() || window < 0.0 {
            return Err(SitatError::InvalidInput(
                "Context window must not be negative".to_string(),
            ));
        }
        self.retriever.context_window(source_id, position, window).await
    }

    /// List all indexed sources.
    pub async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        self.retriever.list_sources().await
    }

    /// Look up one indexed source.
    pub async fn source(&self, source_id: &str) -> Result<IndexedSource> {
        self.collections.get(source_id).await
    }

    /// Delete a source. Returns the number of chunks removed.
    pub async fn delete(&self, source_id: &str) -> Result<usize> {
        self.collections.delete(source_id).await
    }
}
