//! Error types for Trial

use thiserror::Error;

use crate::domain::job::JobState;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, TrialError>;

/// Errors raised by the job engine and catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    /// A job was started while another one is still active
    #[error("job engine is {state}, a new job can only start when it is idle")]
    InvalidState {
        /// State the engine was in when the request arrived
        state: JobState,
    },

    /// The catalog has no usable entry for the requested variant
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TrialError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error only means "try again once the current job ends"
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
