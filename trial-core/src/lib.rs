//! Trial Core
//!
//! Core types for the Trial job runner.
//!
//! This crate contains:
//! - Domain types: job variants, payloads, outcomes, lifecycle states
//! - Catalog: the fixed mapping from a variant to its nominal duration and payload rule
//! - Errors: the engine-level error taxonomy
//!
//! Execution, timing and persistence live in the runner.

pub mod catalog;
pub mod domain;
pub mod error;

pub use catalog::{Catalog, DEFAULT_DURATION_SECS, JobSpec};
pub use error::{Result, TrialError};
