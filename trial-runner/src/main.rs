//! Trial CLI
//!
//! Entry point: sets up logging, loads configuration and dispatches commands.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trial_runner::commands::{Commands, handle_command};
use trial_runner::config::Config;

#[derive(Parser)]
#[command(name = "trial")]
#[command(about = "Run timed background jobs with progress reporting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr so it does not mix with progress output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trial_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = load_config()?;
    info!(
        "Loaded configuration: increment={:?}, tick_interval={:?}, outcome={}",
        config.increment, config.tick_interval, config.outcome
    );

    handle_command(cli.command, config).await
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
