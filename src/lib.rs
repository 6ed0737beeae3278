//! Sitat - Cited answers from transcripts and documents
//!
//! A local-first CLI tool that turns a YouTube transcript or a folder of notes into a
//! searchable index, and answers questions with citations that point back to the exact
//! timestamp or line they came from.
//!
//! The name "Sitat" is the Norwegian word for "quote."
//!
//! # Architecture
//!
//! - `source` - Source fetchers (YouTube transcripts, Markdown/text documents)
//! - `mapping` - Flattening units into text with a character-offset map
//! - `chunking` - Overlapping fixed-window chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction (SQLite, in-memory)
//! - `collection` - Per-source collection lifecycle and re-ingest policy
//! - `retrieval` - Similarity search and positional context windows
//! - `completion` - Chat completion abstraction
//! - `rag` - Prompt assembly, answering and citation mapping
//! - `orchestrator` - Pipeline coordination
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use sitat::config::Settings;
//! use sitat::orchestrator::{AskOptions, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator.ingest("dQw4w9WgXcQ", None).await?;
//!     println!("Indexed {} chunks", result.chunks_indexed);
//!
//!     let answer = orchestrator
//!         .ask(&result.source_id, "What is the song about?", &AskOptions::default())
//!         .await?;
//!     println!("{}", answer.answer_text);
//!     for citation in &answer.citations {
//!         println!("[{}] {}", citation.marker, citation.source_reference.label);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod collection;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod mapping;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod source;
pub mod vector_store;

pub use error::{Result, SitatError};
