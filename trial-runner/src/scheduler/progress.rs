//! Progress coordination
//!
//! Two independent signals write the same display value: percentages reported
//! by the workload after each increment, and a wall-clock estimate computed on
//! every ticker period. Whichever wrote last is what the observer sees.

use tokio::time::{Duration, Instant};
use trial_core::JobSpec;
use trial_core::domain::ProgressSnapshot;
use trial_core::domain::progress::estimate_percent;

/// Which signal wrote the display value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Percentage reported by the workload
    Worker,
    /// Estimate derived from elapsed wall time
    Timer,
    /// Values forced by the session when a run starts or ends
    Forced,
}

/// The single observable progress percentage
///
/// Last writer wins; there is no averaging between sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayValue {
    percent: u8,
    source: Option<ProgressSource>,
}

impl DisplayValue {
    pub fn set(&mut self, source: ProgressSource, percent: u8) -> u8 {
        self.percent = percent.min(100);
        self.source = Some(source);
        self.percent
    }

    pub fn get(&self) -> u8 {
        self.percent
    }

    /// Source of the last write, `None` before the first one
    pub fn source(&self) -> Option<ProgressSource> {
        self.source
    }
}

/// Merges workload reports and timer estimates for one run
#[derive(Debug)]
pub struct ProgressCoordinator {
    nominal: Duration,
    started_at: Instant,
    display: DisplayValue,
    snapshot: ProgressSnapshot,
    stopped: bool,
}

impl ProgressCoordinator {
    pub fn new(spec: &JobSpec, started_at: Instant) -> Self {
        Self {
            nominal: spec.nominal_duration(),
            started_at,
            display: DisplayValue::default(),
            snapshot: ProgressSnapshot::default(),
            stopped: false,
        }
    }

    /// Handles a workload report; returns the new display value
    pub fn on_reported(&mut self, percent: u8) -> u8 {
        self.snapshot.reported_percent = self.snapshot.reported_percent.max(percent);
        self.display.set(ProgressSource::Worker, percent)
    }

    /// Handles a ticker period
    ///
    /// Refreshes elapsed time and the wall-clock estimate, which also becomes
    /// the display value. Returns `None` once the run has ended.
    pub fn on_tick(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        if self.stopped {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.started_at);
        let estimate = estimate_percent(elapsed, self.nominal);

        self.snapshot.elapsed = elapsed;
        self.snapshot.estimated_percent = estimate;
        self.display.set(ProgressSource::Timer, estimate);

        Some(self.snapshot)
    }

    /// Stops ticking and returns the terminal display sequence
    ///
    /// The display briefly shows 100 and is then reset to 0, whatever the
    /// outcome. Calling it again yields nothing.
    pub fn finish(&mut self) -> Vec<u8> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;

        vec![
            self.display.set(ProgressSource::Forced, 100),
            self.display.set(ProgressSource::Forced, 0),
        ]
    }

    pub fn display(&self) -> DisplayValue {
        self.display
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
