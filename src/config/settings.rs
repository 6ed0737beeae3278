//! Configuration settings for Sitat.

use crate::chunking::ChunkingConfig;
use crate::collection::ReingestPolicy;
use crate::completion::ModelConfig;
use crate::error::{Result, SitatError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub rag: RagSettings,
    pub vector_store: VectorStoreSettings,
    pub ingest: IngestSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sitat".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Content chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size.
    pub chunk_size_chars: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap_chars: usize,
    /// Final chunks shorter than this merge into the previous one. Defaults to the overlap.
    pub min_tail_chars: Option<usize>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size_chars: 800,
            chunk_overlap_chars: 200,
            min_tail_chars: None,
        }
    }
}

impl ChunkingSettings {
    pub fn to_config(&self) -> ChunkingConfig {
        let config = ChunkingConfig::new(self.chunk_size_chars, self.chunk_overlap_chars);
        match self.min_tail_chars {
            Some(min_tail) => config.with_min_tail(min_tail),
            None => config,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Half-width of the context window, in seconds for videos and lines for documents.
    pub context_window: f64,
    /// Add neighbouring chunks around each hit when answering.
    pub expand_context: bool,
    /// Hits scoring below this are dropped before prompting.
    pub min_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_window: 30.0,
            expand_context: false,
            min_score: 0.0,
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of passages in one prompt.
    pub max_chunks_in_prompt: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_chunks_in_prompt: 8,
        }
    }
}

impl RagSettings {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(self.model.clone(), self.temperature)
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.sitat/index.db".to_string(),
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// What to do when a source id is ingested again.
    pub reingest_policy: ReingestPolicy,
    /// Subtitle language requested from YouTube.
    pub transcript_language: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            reingest_policy: ReingestPolicy::Replace,
            transcript_language: "en".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SitatError::Config(e.to_string()))
    }

    /// Check settings that would otherwise fail halfway through a pipeline.
    pub fn validate(&self) -> Result<()> {
        self.chunking.to_config().validate()?;

        if self.embedding.provider != "openai" {
            return Err(SitatError::Config(format!(
                "Unknown embedding provider: {}",
                self.embedding.provider
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(SitatError::Config("embedding.model must not be empty".to_string()));
        }
        if self.rag.model.trim().is_empty() {
            return Err(SitatError::Config("rag.model must not be empty".to_string()));
        }
        if self.rag.max_chunks_in_prompt == 0 {
            return Err(SitatError::Config(
                "rag.max_chunks_in_prompt must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(SitatError::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.retrieval.context_window.is_nan() || self.retrieval.context_window < 0.0 {
            return Err(SitatError::Config(
                "retrieval.context_window must not be negative".to_string(),
            ));
        }
        match self.vector_store.provider.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(SitatError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.to_config(), ChunkingConfig::new(800, 200));
        assert_eq!(settings.ingest.reingest_policy, ReingestPolicy::Replace);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chunking]
            chunk_size_chars = 500
            min_tail_chars = 120

            [ingest]
            reingest_policy = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(settings.chunking.chunk_size_chars, 500);
        assert_eq!(settings.chunking.chunk_overlap_chars, 200);
        assert_eq!(settings.chunking.to_config().min_tail_chars, 120);
        assert_eq!(settings.ingest.reingest_policy, ReingestPolicy::Reject);
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap_chars = 800;
        assert!(matches!(settings.validate(), Err(SitatError::Config(_))));

        let mut settings = Settings::default();
        settings.rag.model = " ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.vector_store.provider = "qdrant".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_embedding_provider() {
        let mut settings = Settings::default();
        settings.embedding.provider = "ollama".to_string();
        assert!(matches!(settings.validate(), Err(SitatError::Config(_))));
    }

    #[test]
    fn test_unused_general_keys_are_ignored() {
        let settings: Settings = toml::from_str(
            r#"
            [general]
            data_dir = "/srv/sitat"
            temp_dir = "/tmp/old"
            "#,
        )
        .unwrap();
        assert_eq!(settings.data_dir(), PathBuf::from("/srv/sitat"));
        assert!(!settings.to_toml().unwrap().contains("temp_dir"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitat").join("config.toml");

        let mut settings = Settings::default();
        settings.retrieval.top_k = 9;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.retrieval.top_k, 9);
        assert!(loaded.chunking.min_tail_chars.is_none());
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let loaded = Settings::load_from(Some(Path::new("/no/such/config.toml"))).unwrap();
        assert_eq!(loaded.rag.max_chunks_in_prompt, 8);
    }
}
