//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::SourceKind;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(input: &str, id: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::for_ingest(input)) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {}...", input));
    let result = orchestrator.ingest(input, id.as_deref()).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!("Indexed: {}", result.title));
            Output::kv("Source ID", &result.source_id);
            Output::kv("Kind", &result.kind.to_string());
            let unit_label = match result.kind {
                SourceKind::Transcript => "Segments",
                SourceKind::Document => "Paragraphs",
            };
            Output::kv(unit_label, &result.units.to_string());
            Output::kv("Chunks", &result.chunks_indexed.to_string());
            if result.replaced {
                Output::info("Replaced the previous index for this source.");
            }
            if result.chunks_indexed == 0 {
                Output::warning("The source had no text; nothing can be retrieved from it.");
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to ingest: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
