//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::source_reference;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(source: &str, query: &str, k: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.search(source, query, k).await;
    spinner.finish_and_clear();

    let results = match result {
        Ok(results) => results,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if results.is_empty() {
        Output::info("No results found.");
        return Ok(());
    }

    let info = orchestrator.source(source).await?.info();
    Output::header(&format!("Search Results ({} found)", results.len()));

    for result in &results {
        let reference = source_reference(&info, &result.chunk.source_position);
        Output::chunk(
            &reference.label,
            Some(result.score),
            &result.chunk.text,
            reference.link.as_deref(),
        );
    }

    Ok(())
}
