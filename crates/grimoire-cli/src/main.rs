//! Grimoire CLI
//!
//! Command-line interface for the Grimoire content pipeline.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use grimoire_cli::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    if let Err(e) = grimoire_cli::run(cli).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
