//! Result sinks
//!
//! A sink records the outcome of a finished job under a caller-supplied
//! identifier. Records are three lines of plain text:
//!
//! ```text
//! Success: True
//! Data: { reading = 42, taken_at = 2026-10-18 12:00:00 }
//! ```
//!
//! with an `Error: <message>` line between them when the job did not succeed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};
use trial_core::domain::JobOutcome;

/// Errors raised while persisting an outcome
#[derive(Debug, Error)]
pub enum SinkError {
    /// The identifier cannot be used as a record name
    #[error("invalid record identifier '{0}'")]
    InvalidIdentifier(String),

    /// Writing the record failed
    #[error("failed to write record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receives the outcome of a finished job
///
/// Called at most once per run, on the session's own task.
pub trait ResultSink: Send + Sync {
    fn persist(&self, identifier: &str, outcome: &JobOutcome) -> Result<(), SinkError>;
}

/// Renders the plain-text record for an outcome
pub fn render_record(outcome: &JobOutcome) -> String {
    let mut record = format!(
        "Success: {}\n",
        if outcome.succeeded() { "True" } else { "False" }
    );
    if !outcome.succeeded() {
        record.push_str(&format!("Error: {}\n", outcome.error_message()));
    }
    let data = outcome
        .payload()
        .map(ToString::to_string)
        .unwrap_or_default();
    record.push_str(&format!("Data: {}\n", data));
    record
}

fn validate_identifier(identifier: &str) -> Result<(), SinkError> {
    let trimmed = identifier.trim();
    let forbidden = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed.contains('\0');
    if forbidden {
        return Err(SinkError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// Writes each record to `<directory>/<identifier>.txt`, replacing any previous one
#[derive(Debug, Clone)]
pub struct FileResultSink {
    directory: PathBuf,
}

impl FileResultSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path the record for `identifier` is written to
    pub fn record_path(&self, identifier: &str) -> Result<PathBuf, SinkError> {
        validate_identifier(identifier)?;
        Ok(self.directory.join(format!("{}.txt", identifier.trim())))
    }
}

impl ResultSink for FileResultSink {
    fn persist(&self, identifier: &str, outcome: &JobOutcome) -> Result<(), SinkError> {
        let path = self.record_path(identifier)?;

        fs::create_dir_all(&self.directory).map_err(|source| SinkError::Io {
            path: self.directory.clone(),
            source,
        })?;

        fs::write(&path, render_record(outcome)).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Wrote result record {}", path.display());
        Ok(())
    }
}

/// A record captured by [`InMemoryResultSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub identifier: String,
    pub contents: String,
}

/// Keeps records in memory instead of writing them out
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultSink {
    records: Arc<Mutex<Vec<PersistedRecord>>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records persisted so far, oldest first
    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResultSink for InMemoryResultSink {
    fn persist(&self, identifier: &str, outcome: &JobOutcome) -> Result<(), SinkError> {
        validate_identifier(identifier)?;
        debug!("Captured result record for {}", identifier);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PersistedRecord {
                identifier: identifier.trim().to_string(),
                contents: render_record(outcome),
            });
        Ok(())
    }
}
