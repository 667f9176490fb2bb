//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod session;

pub use session::SessionCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline editing sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Session { command } => session::handle_session_command(command, config).await,
    }
}
