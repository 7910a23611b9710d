//! Service layer
//!
//! Services contain the runner's business logic: the job engine that owns the
//! lifecycle state machine, the success predicates it evaluates at natural
//! completion, and the sinks that record finished outcomes.
//!
//! Predicates and sinks are trait-based so tests and controllers can swap them.

pub mod engine;
pub mod predicate;
pub mod sink;

pub use engine::{EngineEvent, JobEngine};
pub use predicate::{CoinFlip, FixedOutcome, OutcomeMode, RANDOM_FAILURE_MESSAGE, SuccessPredicate};
pub use sink::{
    FileResultSink, InMemoryResultSink, PersistedRecord, ResultSink, SinkError, render_record,
};
