//! Runner configuration
//!
//! Defines the tunable parameters of a run: workload pacing, ticker period,
//! where result records go and how the terminal outcome is decided.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::service::OutcomeMode;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wall time of one workload increment
    pub increment: Duration,

    /// Period of the elapsed-time ticker
    pub tick_interval: Duration,

    /// Directory for result records; must be chosen before a job can start
    pub output_dir: Option<PathBuf>,

    /// How the success predicate decides each run
    pub outcome: OutcomeMode,

    /// Also record failed outcomes, not just successful ones
    pub persist_failures: bool,
}

impl Config {
    /// Creates a configuration with defaults: one-second increments and ticks
    pub fn new() -> Self {
        Self {
            increment: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            output_dir: None,
            outcome: OutcomeMode::Random,
            persist_failures: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - TRIAL_INCREMENT_MS (default: 1000)
    /// - TRIAL_TICK_INTERVAL_MS (default: 1000)
    /// - TRIAL_OUTPUT_DIR (default: unset)
    /// - TRIAL_OUTCOME (random | success | failure, default: random; invalid values keep the default)
    /// - TRIAL_PERSIST_FAILURES (true | false, default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let increment = std::env::var("TRIAL_INCREMENT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.increment);

        let tick_interval = std::env::var("TRIAL_TICK_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_interval);

        let output_dir = std::env::var("TRIAL_OUTPUT_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let outcome = parse_outcome(std::env::var("TRIAL_OUTCOME").ok(), defaults.outcome);

        let persist_failures = std::env::var("TRIAL_PERSIST_FAILURES")
            .ok()
            .and_then(|s| s.trim().parse::<bool>().ok())
            .unwrap_or(defaults.persist_failures);

        Ok(Self {
            increment,
            tick_interval,
            output_dir,
            outcome,
            persist_failures,
        })
    }

    /// Sets the output directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.increment.is_zero() {
            anyhow::bail!("increment must be greater than 0");
        }

        if self.tick_interval.is_zero() {
            anyhow::bail!("tick_interval must be greater than 0");
        }

        if self
            .output_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            anyhow::bail!("output_dir cannot be empty");
        }

        Ok(())
    }
}

/// Parses an outcome mode, keeping `default` when the value is missing or invalid
fn parse_outcome(value: Option<String>, default: OutcomeMode) -> OutcomeMode {
    match value {
        Some(value) => value.parse::<OutcomeMode>().unwrap_or_else(|e| {
            warn!("Ignoring TRIAL_OUTCOME: {}; using '{}'", e, default);
            default
        }),
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.increment, Duration::from_secs(1));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.outcome, OutcomeMode::Random);
        assert!(config.output_dir.is_none());
        assert!(!config.persist_failures);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_outcome_falls_back_for_that_field_only() {
        assert_eq!(
            parse_outcome(Some("sucess".to_string()), OutcomeMode::Random),
            OutcomeMode::Random
        );
        assert_eq!(
            parse_outcome(Some("failure".to_string()), OutcomeMode::Random),
            OutcomeMode::Failure
        );
        assert_eq!(parse_outcome(None, OutcomeMode::Success), OutcomeMode::Success);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.increment = Duration::ZERO;
        assert!(config.validate().is_err());
        config.increment = Duration::from_millis(10);

        config.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.tick_interval = Duration::from_millis(10);

        config.output_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());

        let config = config.with_output_dir("/tmp/results");
        assert!(config.validate().is_ok());
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/results")));
    }
}
