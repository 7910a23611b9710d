//! Trial Runner
//!
//! Runs one cancellable background job at a time and reports its progress.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Services: Job engine, success predicates, result sinks
//! - Scheduler: Drives a run, merges progress signals, records outcomes
//! - Commands: Command-line controller that starts and stops jobs

pub mod commands;
pub mod config;
pub mod scheduler;
pub mod service;
