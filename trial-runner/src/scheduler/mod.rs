//! Scheduler layer for the runner
//!
//! This layer drives a single job from start to its terminal event. It runs
//! the periodic progress ticker next to the engine's event stream, merges
//! both into the display value and hands finished outcomes to a result sink.

pub mod progress;
pub mod session;

pub use progress::{DisplayValue, ProgressCoordinator, ProgressSource};
pub use session::{JobSession, ProgressObserver, RunRequest};
