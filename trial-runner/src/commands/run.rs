//! Run command handler
//!
//! Validates the controller input, runs one job in the foreground and
//! renders its progress. Ctrl-C requests cancellation.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trial_core::JobSpec;
use trial_core::domain::progress::format_elapsed;
use trial_core::domain::{JobVariant, Termination};

use crate::config::Config;
use crate::scheduler::{JobSession, ProgressObserver, ProgressSource, RunRequest};
use crate::service::{FileResultSink, InMemoryResultSink, OutcomeMode, ResultSink, SinkError};

const BAR_WIDTH: usize = 20;

/// Arguments of `trial run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job to run: quick, standard, extended, or its index
    #[arg(short, long)]
    pub variant: Option<JobVariant>,

    /// Product identifier; names the result record
    #[arg(short, long)]
    pub product_id: Option<String>,

    /// Directory for result records (overrides TRIAL_OUTPUT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// How the outcome is decided: random, success or failure
    #[arg(long)]
    pub outcome: Option<OutcomeMode>,

    /// Also record failed outcomes
    #[arg(long)]
    pub persist_failures: bool,

    /// Print the record instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the terminal event as JSON instead of progress output
    #[arg(long)]
    pub json: bool,
}

/// Handle `trial run`
pub async fn handle_run_command(args: RunArgs, mut config: Config) -> Result<()> {
    let identifier = match args.product_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            println!("{}", "Enter a product identifier (--product-id).".yellow());
            return Ok(());
        }
    };

    let Some(variant) = args.variant else {
        println!("{}", "Select a job to run (--variant).".yellow());
        return Ok(());
    };

    if let Some(dir) = args.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(outcome) = args.outcome {
        config.outcome = outcome;
    }
    config.persist_failures |= args.persist_failures;
    config.validate()?;

    let preview = InMemoryResultSink::new();
    let sink: Arc<dyn ResultSink> = if args.dry_run {
        Arc::new(preview.clone())
    } else {
        match &config.output_dir {
            Some(dir) => Arc::new(FileResultSink::new(dir)),
            None => {
                println!(
                    "{}",
                    "Choose a folder for result records (--output-dir or TRIAL_OUTPUT_DIR)."
                        .yellow()
                );
                return Ok(());
            }
        }
    };

    let mut session = JobSession::from_config(&config, sink);
    let stop = CancellationToken::new();
    let listener = spawn_interrupt_listener(stop.clone());
    let mut observer = ConsoleObserver::new(!args.json);

    let request = RunRequest {
        variant,
        identifier,
    };
    let result = session.run(&request, &mut observer, &stop).await;
    listener.abort();

    let termination = result.context("Failed to start job")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&termination)?);
    }

    if args.dry_run {
        for record in preview.records() {
            println!("{}", format!("Record for {}:", record.identifier).bold());
            print!("{}", record.contents);
        }
    }

    Ok(())
}

/// Cancels `stop` on Ctrl-C
fn spawn_interrupt_listener(stop: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                debug!("Interrupt received, requesting cancellation");
                stop.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    })
}

/// Renders session callbacks on the terminal
struct ConsoleObserver {
    enabled: bool,
    percent: u8,
    elapsed: Duration,
}

impl ConsoleObserver {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            percent: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn render(&self) {
        if !self.enabled {
            return;
        }

        let filled = usize::from(self.percent) * BAR_WIDTH / 100;
        let bar = format!(
            "{}{}",
            "█".repeat(filled).green(),
            "░".repeat(BAR_WIDTH - filled).dimmed()
        );
        print!(
            "\r{} {:>3}%  Time: {}",
            bar,
            self.percent,
            format_elapsed(self.elapsed)
        );
        let _ = std::io::stdout().flush();
    }
}

impl ProgressObserver for ConsoleObserver {
    fn on_started(&mut self, spec: &JobSpec) {
        if self.enabled {
            println!(
                "{} {}",
                "Testing...".bold(),
                format!("({}, {}s)", spec.variant, spec.nominal_duration_secs).dimmed()
            );
        }
    }

    fn on_progress(&mut self, percent: u8, _source: ProgressSource) {
        self.percent = percent;
        self.render();
    }

    fn on_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.render();
    }

    fn on_terminal(&mut self, termination: &Termination) {
        if !self.enabled {
            return;
        }

        println!();
        match termination {
            Termination::Completed(_) => println!("{}", "Test passed.".green().bold()),
            Termination::Failed(outcome) => println!(
                "{} {}",
                "Test failed:".red().bold(),
                outcome.error_message()
            ),
            Termination::Faulted { error } => {
                println!("{} {}", "Test failed:".red().bold(), error)
            }
            Termination::Cancelled => println!("{}", "Test cancelled.".yellow().bold()),
        }
    }

    fn on_persist_failed(&mut self, error: &SinkError) {
        eprintln!("{} {}", "Could not save the result:".red(), error);
    }
}
