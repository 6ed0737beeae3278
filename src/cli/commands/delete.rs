//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(source: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.delete(source).await {
        Ok(removed) => {
            Output::success(&format!("Deleted {} ({} chunks)", source, removed));
        }
        Err(e) => {
            Output::error(&format!("Failed to delete: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
