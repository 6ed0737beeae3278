//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{Result, SitatError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingesting a video needs yt-dlp and the API key.
    IngestVideo,
    /// Ingesting documents needs the API key for embeddings.
    IngestDocuments,
    /// Ask, search and summarize call the API.
    Query,
}

impl Operation {
    /// The ingest requirements for `input`: existing paths are documents.
    pub fn for_ingest(input: &str) -> Self {
        if std::path::Path::new(input).exists() {
            Operation::IngestDocuments
        } else {
            Operation::IngestVideo
        }
    }
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::IngestVideo => {
            check_api_key()?;
            check_tool("yt-dlp")?;
        }
        Operation::IngestDocuments | Operation::Query => {
            check_api_key()?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(SitatError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(SitatError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SitatError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SitatError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SitatError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
