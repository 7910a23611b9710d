//! Job lifecycle and outcome types

use serde::{Deserialize, Serialize};
use std::fmt;

use super::payload::Payload;

/// Lifecycle state of the job engine
///
/// ```text
/// Idle --start--> Running --cancel--> Cancelling --boundary--> Cancelled
///                    |
///                    +--all increments--> Completed | Failed
/// ```
///
/// Terminal states return to `Idle` once acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Cancelling,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// A job is in flight and owns the engine
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Running | JobState::Cancelling)
    }

    /// No further progress events will follow
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Cancelling => "cancelling",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Immutable record of a finished job
///
/// The payload is present exactly when the job succeeded and the error
/// message is non-empty exactly when it did not. Fields are private so the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    succeeded: bool,
    error_message: String,
    payload: Option<Payload>,
}

impl JobOutcome {
    /// Message used when a failure is reported without one
    pub const UNSPECIFIED_FAILURE: &'static str = "Unspecified failure.";

    pub fn success(payload: Payload) -> Self {
        Self {
            succeeded: true,
            error_message: String::new(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut error_message = message.into();
        if error_message.is_empty() {
            error_message = Self::UNSPECIFIED_FAILURE.to_string();
        }
        Self {
            succeeded: false,
            error_message,
            payload: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Empty when the job succeeded
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }
}

/// Terminal event of a single run
///
/// Emitted exactly once per run, after the last progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Termination {
    /// Every increment ran and the success predicate passed
    Completed(JobOutcome),
    /// Every increment ran and the success predicate failed
    Failed(JobOutcome),
    /// A cancellation request was observed at an increment boundary
    Cancelled,
    /// The workload stopped without producing an outcome
    Faulted { error: String },
}

impl Termination {
    /// State the engine settles in after this termination
    pub fn state(&self) -> JobState {
        match self {
            Termination::Completed(_) => JobState::Completed,
            Termination::Failed(_) | Termination::Faulted { .. } => JobState::Failed,
            Termination::Cancelled => JobState::Cancelled,
        }
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        match self {
            Termination::Completed(outcome) | Termination::Failed(outcome) => Some(outcome),
            Termination::Cancelled | Termination::Faulted { .. } => None,
        }
    }

    /// Error raised inside the engine, as opposed to a failed outcome
    pub fn engine_error(&self) -> Option<&str> {
        match self {
            Termination::Faulted { error } => Some(error),
            _ => None,
        }
    }

    /// Builds the termination matching an evaluated outcome
    pub fn from_outcome(outcome: JobOutcome) -> Self {
        if outcome.succeeded() {
            Termination::Completed(outcome)
        } else {
            Termination::Failed(outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variant::JobVariant;

    #[test]
    fn test_success_outcome_carries_payload_only() {
        let outcome = JobOutcome::success(Payload::generate(JobVariant::Quick));
        assert!(outcome.succeeded());
        assert!(outcome.payload().is_some());
        assert_eq!(outcome.error_message(), "");
    }

    #[test]
    fn test_failure_outcome_carries_message_only() {
        let outcome = JobOutcome::failure("A random error occurred.");
        assert!(!outcome.succeeded());
        assert!(outcome.payload().is_none());
        assert_eq!(outcome.error_message(), "A random error occurred.");

        let blank = JobOutcome::failure("");
        assert_eq!(blank.error_message(), JobOutcome::UNSPECIFIED_FAILURE);
    }

    #[test]
    fn test_termination_states() {
        let ok = Termination::from_outcome(JobOutcome::success(Payload::generate(
            JobVariant::Standard,
        )));
        assert_eq!(ok.state(), JobState::Completed);
        assert!(ok.outcome().is_some());

        let failed = Termination::from_outcome(JobOutcome::failure("boom"));
        assert_eq!(failed.state(), JobState::Failed);

        assert_eq!(Termination::Cancelled.state(), JobState::Cancelled);
        assert!(Termination::Cancelled.outcome().is_none());

        let faulted = Termination::Faulted {
            error: "worker panicked".to_string(),
        };
        assert_eq!(faulted.state(), JobState::Failed);
        assert_eq!(faulted.engine_error(), Some("worker panicked"));
    }

    #[test]
    fn test_state_classification() {
        assert!(JobState::Running.is_active());
        assert!(JobState::Cancelling.is_active());
        assert!(!JobState::Idle.is_active());
        assert!(!JobState::Idle.is_terminal());
        for state in [JobState::Completed, JobState::Cancelled, JobState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.is_active());
        }
    }

    #[test]
    fn test_termination_serializes_with_state_tag() {
        let json = serde_json::to_value(Termination::Cancelled).unwrap();
        assert_eq!(json["state"], "cancelled");

        let json = serde_json::to_value(Termination::from_outcome(JobOutcome::failure("boom")))
            .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error_message"], "boom");
    }
}
