//! Core domain types
//!
//! These types describe a single job run: which variant was selected, what it
//! produced, and where the engine is in its lifecycle. They are shared between
//! the engine (which creates them) and controllers (which observe them).

pub mod job;
pub mod payload;
pub mod progress;
pub mod variant;

pub use job::{JobOutcome, JobState, Termination};
pub use payload::Payload;
pub use progress::ProgressSnapshot;
pub use variant::JobVariant;
