//! Error types for Sitat.

use thiserror::Error;

/// Library-level error type for Sitat operations.
#[derive(Error, Debug)]
pub enum SitatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Source '{0}' is already ingested and the re-ingest policy is 'reject'")]
    ReingestConflict(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SitatError {
    /// Whether this error means the source id is unknown (as opposed to a failed lookup).
    pub fn is_not_found(&self) -> bool {
        matches!(self, SitatError::NotFound(_))
    }
}

/// Result type alias for Sitat operations.
pub type Result<T> = std::result::Result<T, SitatError>;
