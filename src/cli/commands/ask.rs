//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{AskOptions, Orchestrator};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    source: &str,
    question: &str,
    options: AskOptions,
    json: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching source...");
    let result = orchestrator.ask(source, question, &options).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) if json => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Ok(answer) => Output::cited_answer(&answer),
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            if e.is_not_found() {
                Output::info("Run 'sitat list' to see indexed sources.");
            }
            return Err(e.into());
        }
    }

    Ok(())
}
