//! # pubctl
//!
//! Command-line entry point.
//!
//! Provides:
//! - Publishing one item to every configured endpoint
//! - Configuration validation
//! - Endpoint listing

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{Cli, Commands};
use commands::{run_info, run_publish, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    debug!(version = env!("CARGO_PKG_VERSION"), "pubctl starting");

    let result = match &cli.command {
        Commands::Publish(args) => run_publish(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(cli.observability_config())
}
