//! CLI module for Sitat.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Sitat - cited answers from YouTube transcripts and documents
///
/// Index a video transcript or a folder of notes, then ask questions and get answers
/// that point back to the exact timestamp or line they came from.
/// The name "Sitat" is the Norwegian word for "quote."
#[derive(Parser, Debug)]
#[command(name = "sitat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, chunk, embed and index a YouTube video or a document file/folder
    Ingest {
        /// YouTube URL/ID, or a path to a .md/.txt file or folder
        input: String,

        /// Source id to index under (defaults to the video ID or docs_<name>)
        #[arg(long)]
        id: Option<String>,
    },

    /// Ask a question about an indexed source
    Ask {
        /// Source id
        source: String,

        /// The question to ask
        question: String,

        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,

        /// Maximum number of passages in the prompt
        #[arg(short = 'c', long)]
        max_chunks: Option<usize>,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Include neighbouring chunks around each hit
        #[arg(long)]
        expand: bool,

        /// Print the cited answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search an indexed source for relevant chunks
    Search {
        /// Source id
        source: String,

        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, default_value = "5")]
        k: usize,
    },

    /// Show the chunks around a timestamp or document line
    Context {
        /// Source id
        source: String,

        /// MM:SS or HH:MM:SS for videos, <document>:<line> for documents
        position: String,

        /// Seconds (or lines) to include on each side
        #[arg(short, long)]
        window: Option<f64>,
    },

    /// Summarize an indexed source
    Summarize {
        /// Source id
        source: String,

        /// Print the cited summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List indexed sources
    List,

    /// Delete an indexed source
    Delete {
        /// Source id
        source: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
