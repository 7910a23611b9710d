//! Job engine
//!
//! Owns the lifecycle state machine and runs the simulated workload on its own
//! task. The workload advances in fixed increments, reports a percentage after
//! each one and checks for cancellation at every increment boundary.
//!
//! Events travel from the workload task to the engine over an ordered
//! channel. State transitions are applied when [`JobEngine::next_event`]
//! hands an event to the caller, so the state only ever changes on the
//! caller's task.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trial_core::domain::progress::percent_after;
use trial_core::domain::{JobOutcome, JobState, JobVariant, Termination};
use trial_core::{Catalog, JobSpec, Result, TrialError};

use crate::service::predicate::SuccessPredicate;

/// Event produced by a running job, in the order it was produced
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// An increment finished; percentage in `1..=100`
    Progress(u8),
    /// The run ended; always the last event of a run
    Terminated(Termination),
}

/// Bookkeeping for the run currently owned by the engine
struct ActiveRun {
    spec: JobSpec,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    handle: Option<JoinHandle<()>>,
}

/// Everything the workload task needs, moved into it at start
struct Workload {
    spec: JobSpec,
    increment: Duration,
    predicate: Arc<dyn SuccessPredicate>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<EngineEvent>,
}

/// Runs one job at a time and tracks its lifecycle
pub struct JobEngine {
    catalog: Catalog,
    predicate: Arc<dyn SuccessPredicate>,
    increment: Duration,
    state: JobState,
    reported_percent: u8,
    run: Option<ActiveRun>,
}

impl JobEngine {
    /// Creates an idle engine
    ///
    /// # Arguments
    /// * `catalog` - Variant lookup table
    /// * `predicate` - Decides success once all increments have run
    /// * `increment` - Wall time of one workload increment
    pub fn new(
        catalog: Catalog,
        predicate: Arc<dyn SuccessPredicate>,
        increment: Duration,
    ) -> Self {
        Self {
            catalog,
            predicate,
            increment,
            state: JobState::Idle,
            reported_percent: 0,
            run: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Last percentage reported by the current or most recent run
    pub fn reported_percent(&self) -> u8 {
        self.reported_percent
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Spec of the current or most recent run
    pub fn active_spec(&self) -> Option<&JobSpec> {
        self.run.as_ref().map(|run| &run.spec)
    }

    /// Starts a job for `variant`
    ///
    /// Accepted when idle or after a terminal state, which is acknowledged
    /// implicitly. Rejected without side effects while a job is running or
    /// cancelling. Must be called from within a Tokio runtime.
    pub fn start(&mut self, variant: JobVariant) -> Result<JobSpec> {
        if self.state.is_active() {
            warn!("Rejected start of '{}': engine is {}", variant, self.state);
            return Err(TrialError::InvalidState { state: self.state });
        }

        let spec = *self.catalog.lookup(variant)?;

        if self.state.is_terminal() {
            self.acknowledge();
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let workload = Workload {
            spec,
            increment: self.increment,
            predicate: Arc::clone(&self.predicate),
            cancel: cancel.clone(),
            events: events_tx,
        };
        let handle = tokio::spawn(run_workload(workload));

        self.state = JobState::Running;
        self.reported_percent = 0;
        self.run = Some(ActiveRun {
            spec,
            cancel,
            events: events_rx,
            handle: Some(handle),
        });

        info!(
            "Started '{}' job ({} increments of {:?})",
            variant, spec.nominal_duration_secs, self.increment
        );
        Ok(spec)
    }

    /// Asks the running job to stop at its next increment boundary
    ///
    /// Only sets the cancellation flag; returns `false` if nothing is running.
    pub fn request_cancel(&mut self) -> bool {
        if self.state != JobState::Running {
            debug!("Ignoring cancel request: engine is {}", self.state);
            return false;
        }

        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
        self.state = JobState::Cancelling;
        info!("Cancellation requested");
        true
    }

    /// Waits for the next event of the active run
    ///
    /// Returns `None` when no run is active or its terminal event has
    /// already been delivered. Cancel-safe: an event is never lost if the
    /// returned future is dropped before completing.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        if !self.state.is_active() {
            return None;
        }
        let run = self.run.as_mut()?;

        let event = match run.events.recv().await {
            Some(event) => event,
            None => {
                // Sender dropped without a terminal event
                let error = match run.handle.as_mut() {
                    Some(handle) => match handle.await {
                        Ok(()) => "workload ended without reporting an outcome".to_string(),
                        Err(e) => format!("workload task failed: {}", e),
                    },
                    None => "workload ended without reporting an outcome".to_string(),
                };
                run.handle = None;
                EngineEvent::Terminated(Termination::Faulted { error })
            }
        };

        // An accepted cancel always ends cancelled, even if the last
        // increment had already finished when it arrived
        let event = match event {
            EngineEvent::Terminated(Termination::Completed(_) | Termination::Failed(_))
                if self.state == JobState::Cancelling =>
            {
                debug!("Discarding natural outcome of a cancelled run");
                EngineEvent::Terminated(Termination::Cancelled)
            }
            other => other,
        };

        match &event {
            EngineEvent::Progress(percent) => {
                self.reported_percent = self.reported_percent.max(*percent);
            }
            EngineEvent::Terminated(termination) => {
                self.state = termination.state();
                run.handle = None;
                match termination.engine_error() {
                    Some(error) => warn!("Job faulted: {}", error),
                    None => info!("Job finished: {}", self.state),
                }
            }
        }

        Some(event)
    }

    /// Returns a terminal engine to `Idle`
    ///
    /// No-op in any other state. Returns the state that was acknowledged.
    pub fn acknowledge(&mut self) -> JobState {
        let previous = self.state;
        if previous.is_terminal() {
            self.state = JobState::Idle;
            self.reported_percent = 0;
            self.run = None;
            debug!("Acknowledged {} job", previous);
        }
        previous
    }

    /// Cancels and forgets the current run without waiting for its terminal event
    ///
    /// For runs whose events nobody will drain any more. Leaves the engine
    /// `Idle` and returns the state it was in.
    pub fn abandon(&mut self) -> JobState {
        let previous = self.state;
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
        }
        self.state = JobState::Idle;
        self.reported_percent = 0;
        if previous.is_active() {
            warn!("Abandoned {} job", previous);
        }
        previous
    }
}

impl Drop for JobEngine {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
    }
}

/// Workload loop: one sleep-then-report cycle per increment
async fn run_workload(workload: Workload) {
    let Workload {
        spec,
        increment,
        predicate,
        cancel,
        events,
    } = workload;
    let total = spec.nominal_duration_secs;

    for step in 0..total {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = time::sleep(increment) => {}
        }

        if cancel.is_cancelled() {
            debug!("Cancellation observed after {}/{} increments", step, total);
            let _ = events.send(EngineEvent::Terminated(Termination::Cancelled));
            return;
        }

        let percent = percent_after(step, total);
        debug!("Increment {}/{} done ({}%)", step + 1, total, percent);
        if events.send(EngineEvent::Progress(percent)).is_err() {
            debug!("Engine dropped, abandoning workload");
            return;
        }
    }

    let outcome = if predicate.evaluate(spec.variant) {
        JobOutcome::success(spec.generate_payload())
    } else {
        JobOutcome::failure(predicate.failure_message())
    };

    let _ = events.send(EngineEvent::Terminated(Termination::from_outcome(outcome)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::predicate::{FixedOutcome, RANDOM_FAILURE_MESSAGE};
    use trial_core::domain::Payload;

    struct Panicking;

    impl SuccessPredicate for Panicking {
        fn evaluate(&self, _variant: JobVariant) -> bool {
            panic!("predicate exploded")
        }
    }

    struct Failing;

    impl SuccessPredicate for Failing {
        fn evaluate(&self, _variant: JobVariant) -> bool {
            false
        }
    }

    fn engine(success: bool) -> JobEngine {
        JobEngine::new(
            Catalog::standard(),
            Arc::new(FixedOutcome(success)),
            Duration::from_secs(1),
        )
    }

    /// Drains events until the terminal one
    async fn drain(engine: &mut JobEngine) -> (Vec<u8>, Termination) {
        let mut progress = Vec::new();
        loop {
            match engine.next_event().await {
                Some(EngineEvent::Progress(percent)) => progress.push(percent),
                Some(EngineEvent::Terminated(termination)) => return (progress, termination),
                None => panic!("event stream ended without a terminal event"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_reports_every_increment() {
        for variant in JobVariant::ALL {
            let mut engine = engine(true);
            let spec = engine.start(variant).unwrap();
            let total = spec.nominal_duration_secs;

            let (progress, termination) = drain(&mut engine).await;

            let expected: Vec<u8> = (0..total).map(|i| percent_after(i, total)).collect();
            assert_eq!(progress, expected);
            assert_eq!(progress.last(), Some(&100));
            assert!(progress.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(termination.state(), JobState::Completed);
            assert_eq!(engine.state(), JobState::Completed);
            assert!(engine.next_event().await.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_takes_nominal_duration() {
        let mut engine = engine(true);
        let started = time::Instant::now();
        engine.start(JobVariant::Quick).unwrap();
        drain(&mut engine).await;
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_outcome_has_payload() {
        let mut engine = engine(true);
        engine.start(JobVariant::Standard).unwrap();
        let (progress, termination) = drain(&mut engine).await;

        assert_eq!(progress.len(), 20);
        let outcome = termination.outcome().unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.error_message(), "");
        assert!(matches!(outcome.payload(), Some(Payload::Standard { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_outcome_has_message_only() {
        let mut engine = JobEngine::new(
            Catalog::standard(),
            Arc::new(Failing),
            Duration::from_secs(1),
        );
        engine.start(JobVariant::Quick).unwrap();
        let (progress, termination) = drain(&mut engine).await;

        assert_eq!(progress.len(), 10);
        assert_eq!(termination.state(), JobState::Failed);
        let outcome = termination.outcome().unwrap();
        assert!(!outcome.succeeded());
        assert!(outcome.payload().is_none());
        assert_eq!(outcome.error_message(), RANDOM_FAILURE_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fourth_increment() {
        let mut engine = engine(true);
        engine.start(JobVariant::Quick).unwrap();

        let mut progress = Vec::new();
        let termination = loop {
            match engine.next_event().await {
                Some(EngineEvent::Progress(percent)) => {
                    progress.push(percent);
                    if progress.len() == 4 {
                        assert!(engine.request_cancel());
                        assert_eq!(engine.state(), JobState::Cancelling);
                    }
                }
                Some(EngineEvent::Terminated(termination)) => break termination,
                None => panic!("event stream ended without a terminal event"),
            }
        };

        assert_eq!(progress, vec![10, 20, 30, 40]);
        assert_eq!(termination, Termination::Cancelled);
        assert!(termination.outcome().is_none());
        assert!(termination.engine_error().is_none());
        assert_eq!(engine.state(), JobState::Cancelled);
        assert!(engine.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_last_increment_still_cancels() {
        let mut engine = engine(true);
        engine.start(JobVariant::Quick).unwrap();

        let mut progress = Vec::new();
        let termination = loop {
            match engine.next_event().await {
                Some(EngineEvent::Progress(percent)) => {
                    progress.push(percent);
                    if progress.len() == 10 {
                        assert!(engine.request_cancel());
                    }
                }
                Some(EngineEvent::Terminated(termination)) => break termination,
                None => panic!("event stream ended without a terminal event"),
            }
        };

        assert_eq!(progress.len(), 10);
        assert_eq!(termination, Termination::Cancelled);
        assert!(termination.outcome().is_none());
        assert_eq!(engine.state(), JobState::Cancelled);
        assert!(engine.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_increment() {
        let mut engine = engine(true);
        engine.start(JobVariant::Extended).unwrap();
        assert!(engine.request_cancel());

        let (progress, termination) = drain(&mut engine).await;
        assert!(progress.is_empty());
        assert_eq!(termination, Termination::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_only_while_running() {
        let mut engine = engine(true);
        assert!(!engine.request_cancel());
        assert_eq!(engine.state(), JobState::Idle);

        engine.start(JobVariant::Quick).unwrap();
        assert!(engine.request_cancel());
        assert!(!engine.request_cancel());
        assert_eq!(engine.state(), JobState::Cancelling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_is_rejected() {
        let mut engine = engine(true);
        engine.start(JobVariant::Quick).unwrap();

        let err = engine.start(JobVariant::Extended).unwrap_err();
        assert_eq!(
            err,
            TrialError::InvalidState {
                state: JobState::Running
            }
        );
        assert!(err.is_recoverable());
        assert_eq!(engine.state(), JobState::Running);
        assert_eq!(engine.active_spec().unwrap().variant, JobVariant::Quick);

        // Only the first run's events arrive
        let (progress, _) = drain(&mut engine).await;
        assert_eq!(progress.len(), 10);

        engine.start(JobVariant::Quick).unwrap();
        engine.request_cancel();
        assert!(engine.start(JobVariant::Quick).is_err());
        assert_eq!(engine.state(), JobState::Cancelling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_catalog_entry_does_not_start() {
        let catalog = Catalog::empty();
        let mut engine = JobEngine::new(
            catalog,
            Arc::new(FixedOutcome(true)),
            Duration::from_secs(1),
        );

        let err = engine.start(JobVariant::Quick).unwrap_err();
        assert!(matches!(err, TrialError::Configuration(_)));
        assert_eq!(engine.state(), JobState::Idle);
        assert!(engine.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_terminal_is_isolated() {
        let mut engine = engine(true);
        engine.start(JobVariant::Quick).unwrap();
        let (first, _) = drain(&mut engine).await;
        assert_eq!(engine.reported_percent(), 100);

        // Start straight from a terminal state
        engine.start(JobVariant::Quick).unwrap();
        assert_eq!(engine.state(), JobState::Running);
        assert_eq!(engine.reported_percent(), 0);
        let (second, termination) = drain(&mut engine).await;

        assert_eq!(first, second);
        assert_eq!(termination.state(), JobState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_returns_to_idle() {
        let mut engine = engine(false);
        assert_eq!(engine.acknowledge(), JobState::Idle);

        engine.start(JobVariant::Quick).unwrap();
        assert_eq!(engine.acknowledge(), JobState::Running);
        assert_eq!(engine.state(), JobState::Running);

        drain(&mut engine).await;
        assert_eq!(engine.acknowledge(), JobState::Failed);
        assert_eq!(engine.state(), JobState::Idle);
        assert!(engine.active_spec().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_rearms_engine() {
        let mut engine = engine(true);
        engine.start(JobVariant::Extended).unwrap();
        assert_eq!(engine.next_event().await, Some(EngineEvent::Progress(3)));

        assert_eq!(engine.abandon(), JobState::Running);
        assert_eq!(engine.state(), JobState::Idle);
        assert!(engine.active_spec().is_none());
        assert!(engine.next_event().await.is_none());

        engine.start(JobVariant::Quick).unwrap();
        let (progress, termination) = drain(&mut engine).await;
        assert_eq!(progress.len(), 10);
        assert_eq!(termination.state(), JobState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_workload_panic_is_delivered_as_fault() {
        let mut engine = JobEngine::new(
            Catalog::standard(),
            Arc::new(Panicking),
            Duration::from_secs(1),
        );
        engine.start(JobVariant::Quick).unwrap();

        let (progress, termination) = drain(&mut engine).await;
        assert_eq!(progress.len(), 10);
        assert_eq!(termination.state(), JobState::Failed);
        assert!(termination.outcome().is_none());
        assert!(termination.engine_error().unwrap().contains("workload task failed"));
        assert_eq!(engine.state(), JobState::Failed);
    }
}
