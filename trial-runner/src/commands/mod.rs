//! Commands module
//!
//! Defines all CLI commands and their handlers. The CLI is the controller:
//! it validates input, starts jobs and renders what the session reports.

mod list;
mod run;

pub use run::RunArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a job and wait for it to finish
    Run(RunArgs),
    /// List the available job variants
    List,
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - Runner configuration loaded from the environment
pub async fn handle_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle_run_command(args, config).await,
        Commands::List => list::handle_list_command(),
    }
}
