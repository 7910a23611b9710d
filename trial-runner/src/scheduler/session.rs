//! Job session
//!
//! Drives one job from start to terminal event on the caller's task. Engine
//! events and ticker periods are awaited side by side; every write to the
//! display value happens here, so the observer never needs a lock.

use std::sync::Arc;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trial_core::domain::{JobState, JobVariant, Termination};
use trial_core::{Catalog, JobSpec, Result};

use crate::config::Config;
use crate::scheduler::progress::{ProgressCoordinator, ProgressSource};
use crate::service::{EngineEvent, JobEngine, ResultSink, SinkError};

/// Receives progress and terminal notifications for a run
///
/// All callbacks run on the session's task, in the order the underlying
/// events were produced.
pub trait ProgressObserver {
    /// The job was accepted and is now running
    fn on_started(&mut self, _spec: &JobSpec) {}

    /// The display value changed
    fn on_progress(&mut self, percent: u8, source: ProgressSource);

    /// A ticker period elapsed
    fn on_elapsed(&mut self, _elapsed: Duration) {}

    /// The run ended; called exactly once per run
    fn on_terminal(&mut self, termination: &Termination);

    /// The result sink rejected the outcome
    fn on_persist_failed(&mut self, _error: &SinkError) {}
}

/// What to run and under which identifier to record it
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub variant: JobVariant,
    pub identifier: String,
}

/// Owns the engine and the sink for a sequence of runs
pub struct JobSession {
    engine: JobEngine,
    sink: Arc<dyn ResultSink>,
    tick_interval: Duration,
    persist_failures: bool,
    in_flight: bool,
}

impl JobSession {
    /// Creates a session
    ///
    /// # Arguments
    /// * `engine` - Idle job engine
    /// * `sink` - Destination for finished outcomes
    /// * `tick_interval` - Period of the elapsed-time ticker
    pub fn new(engine: JobEngine, sink: Arc<dyn ResultSink>, tick_interval: Duration) -> Self {
        Self {
            engine,
            sink,
            tick_interval,
            persist_failures: false,
            in_flight: false,
        }
    }

    /// Builds a session with the standard catalog and the configured predicate
    pub fn from_config(config: &Config, sink: Arc<dyn ResultSink>) -> Self {
        let engine = JobEngine::new(
            Catalog::standard(),
            config.outcome.predicate(),
            config.increment,
        );
        Self::new(engine, sink, config.tick_interval).persist_failures(config.persist_failures)
    }

    /// Also hand failed outcomes to the sink
    pub fn persist_failures(mut self, enabled: bool) -> Self {
        self.persist_failures = enabled;
        self
    }

    pub fn state(&self) -> JobState {
        self.engine.state()
    }

    pub fn engine(&self) -> &JobEngine {
        &self.engine
    }

    /// Runs a job to its terminal event
    ///
    /// Cancelling `stop` issues a cancellation request; the job still runs
    /// until its next increment boundary. Errors only when the job could not
    /// start, in which case no observer callback is made.
    ///
    /// If a previous `run` future was dropped before its job ended, that job
    /// is cancelled and discarded here without reaching any observer or sink.
    pub async fn run<O>(
        &mut self,
        request: &RunRequest,
        observer: &mut O,
        stop: &CancellationToken,
    ) -> Result<Termination>
    where
        O: ProgressObserver + ?Sized,
    {
        if self.in_flight {
            warn!("Previous run was dropped before finishing, abandoning it");
            self.engine.abandon();
            self.in_flight = false;
        }

        let spec = self.engine.start(request.variant)?;
        self.in_flight = true;
        let started_at = Instant::now();
        let mut coordinator = ProgressCoordinator::new(&spec, started_at);

        info!(
            "Running '{}' for {} ({}s nominal)",
            spec.variant, request.identifier, spec.nominal_duration_secs
        );
        observer.on_started(&spec);
        observer.on_progress(0, ProgressSource::Forced);

        let mut ticker = time::interval_at(started_at + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let termination = loop {
            let cancel_pending = self.engine.state() == JobState::Running;

            tokio::select! {
                biased;
                event = self.engine.next_event() => match event {
                    Some(EngineEvent::Progress(percent)) => {
                        let shown = coordinator.on_reported(percent);
                        observer.on_progress(shown, ProgressSource::Worker);
                    }
                    Some(EngineEvent::Terminated(termination)) => break termination,
                    None => {
                        break Termination::Faulted {
                            error: "engine stopped without a terminal event".to_string(),
                        };
                    }
                },
                _ = stop.cancelled(), if cancel_pending => {
                    self.engine.request_cancel();
                }
                now = ticker.tick() => {
                    if let Some(snapshot) = coordinator.on_tick(now) {
                        debug!(
                            "Tick: {:?} elapsed, estimate {}%",
                            snapshot.elapsed, snapshot.estimated_percent
                        );
                        observer.on_elapsed(snapshot.elapsed);
                        observer.on_progress(coordinator.display().get(), ProgressSource::Timer);
                    }
                }
            }
        };

        for percent in coordinator.finish() {
            observer.on_progress(percent, ProgressSource::Forced);
        }
        observer.on_terminal(&termination);

        self.persist(&request.identifier, &termination, observer);
        self.engine.acknowledge();
        self.in_flight = false;

        Ok(termination)
    }

    /// Hands the outcome to the sink when the run warrants a record
    fn persist<O>(&self, identifier: &str, termination: &Termination, observer: &mut O)
    where
        O: ProgressObserver + ?Sized,
    {
        let outcome = match termination {
            Termination::Completed(outcome) => outcome,
            Termination::Failed(outcome) if self.persist_failures => outcome,
            _ => return,
        };

        match self.sink.persist(identifier, outcome) {
            Ok(()) => debug!("Persisted outcome for {}", identifier),
            Err(e) => {
                error!("Failed to persist outcome for {}: {}", identifier, e);
                observer.on_persist_failed(&e);
            }
        }
    }
}
