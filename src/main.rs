//! Sitat CLI entry point.

use anyhow::Result;
use clap::Parser;
use sitat::cli::{commands, Cli, Commands};
use sitat::config::Settings;
use sitat::orchestrator::AskOptions;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sitat={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_deref())?;

    if let Commands::Config { action } = &cli.command {
        return commands::run_config(action, config_path, settings);
    }

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        Commands::Ingest { input, id } => {
            commands::run_ingest(&input, id, settings).await?;
        }

        Commands::Ask {
            source,
            question,
            k,
            max_chunks,
            model,
            expand,
            json,
        } => {
            let options = AskOptions {
                top_k: k,
                max_chunks,
                model,
                expand_context: expand.then_some(true),
            };
            commands::run_ask(&source, &question, options, json, settings).await?;
        }

        Commands::Search { source, query, k } => {
            commands::run_search(&source, &query, k, settings).await?;
        }

        Commands::Context {
            source,
            position,
            window,
        } => {
            commands::run_context(&source, &position, window, settings).await?;
        }

        Commands::Summarize { source, json } => {
            commands::run_summarize(&source, json, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Delete { source } => {
            commands::run_delete(&source, settings).await?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}
