//! Success predicates
//!
//! Evaluated exactly once per run, after the last increment, to decide whether
//! the job completed or failed.

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use trial_core::domain::JobVariant;

/// Message attached to outcomes failed by [`CoinFlip`]
pub const RANDOM_FAILURE_MESSAGE: &str = "A random error occurred.";

/// Decides the terminal outcome of a run that was not cancelled
pub trait SuccessPredicate: Send + Sync {
    /// Returns `true` if the run succeeded
    fn evaluate(&self, variant: JobVariant) -> bool;

    /// Message recorded when [`SuccessPredicate::evaluate`] returns `false`
    fn failure_message(&self) -> String {
        RANDOM_FAILURE_MESSAGE.to_string()
    }
}

/// Fair coin flip: every run has an even chance of failing
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlip;

impl SuccessPredicate for CoinFlip {
    fn evaluate(&self, _variant: JobVariant) -> bool {
        rand::rng().random_bool(0.5)
    }
}

/// Always yields the same result
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub bool);

impl SuccessPredicate for FixedOutcome {
    fn evaluate(&self, _variant: JobVariant) -> bool {
        self.0
    }

    fn failure_message(&self) -> String {
        "Failure forced by configuration.".to_string()
    }
}

/// Predicate selection as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeMode {
    #[default]
    Random,
    Success,
    Failure,
}

impl OutcomeMode {
    pub fn predicate(self) -> Arc<dyn SuccessPredicate> {
        match self {
            OutcomeMode::Random => Arc::new(CoinFlip),
            OutcomeMode::Success => Arc::new(FixedOutcome(true)),
            OutcomeMode::Failure => Arc::new(FixedOutcome(false)),
        }
    }
}

impl FromStr for OutcomeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(OutcomeMode::Random),
            "success" => Ok(OutcomeMode::Success),
            "failure" => Ok(OutcomeMode::Failure),
            other => Err(format!(
                "invalid outcome mode '{}', expected random, success or failure",
                other
            )),
        }
    }
}

impl fmt::Display for OutcomeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeMode::Random => "random",
            OutcomeMode::Success => "success",
            OutcomeMode::Failure => "failure",
        };
        write!(f, "{}", name)
    }
}
