//! Rivet CLI
//!
//! Command-line interface for editing pipelines through a cached session. Unsaved
//! edits are kept in the session cache between invocations.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rivet")]
#[command(about = "Rivet pipeline editing CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "RIVET_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// Directory holding cached sessions (default: ~/.cache/rivet/sessions)
    #[arg(long, env = "RIVET_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "RIVET_REQUEST_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Account the pipelines belong to
    #[arg(long, env = "RIVET_ACCOUNT_ID", default_value = "default")]
    account: String,

    /// Print every session action applied by the command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rivet_cli=info,rivet_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::new(
        cli.orchestrator_url,
        cli.cache_dir,
        cli.timeout,
        cli.account,
        cli.verbose,
    )?;

    handle_command(cli.command, &config).await
}
