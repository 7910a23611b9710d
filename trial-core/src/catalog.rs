//! Job catalog
//!
//! Maps each variant to its nominal duration and payload rule. Lookups are
//! pure; the catalog is built once and only read afterwards.

use std::time::Duration;

use crate::domain::payload::Payload;
use crate::domain::variant::JobVariant;
use crate::error::{Result, TrialError};

/// Duration used when a selector has no catalog entry
pub const DEFAULT_DURATION_SECS: u32 = 10;

/// Fixed description of one job variant
#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub variant: JobVariant,
    /// Nominal run time in whole seconds, one increment per second
    pub nominal_duration_secs: u32,
    payload: fn(JobVariant) -> Payload,
}

impl JobSpec {
    /// Creates a spec, rejecting a zero duration
    pub fn new(
        variant: JobVariant,
        nominal_duration_secs: u32,
        payload: fn(JobVariant) -> Payload,
    ) -> Result<Self> {
        if nominal_duration_secs == 0 {
            return Err(TrialError::configuration(format!(
                "variant '{}' must have a non-zero duration",
                variant
            )));
        }
        Ok(Self {
            variant,
            nominal_duration_secs,
            payload,
        })
    }

    pub fn nominal_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.nominal_duration_secs))
    }

    /// Runs the payload rule for this spec's variant
    pub fn generate_payload(&self) -> Payload {
        (self.payload)(self.variant)
    }
}

/// Lookup table of job specs, one entry per variant
#[derive(Debug, Clone)]
pub struct Catalog {
    specs: Vec<JobSpec>,
}

impl Catalog {
    /// The built-in catalog: 10, 20 and 30 second variants
    pub fn standard() -> Self {
        let specs = JobVariant::ALL
            .into_iter()
            .map(|variant| JobSpec {
                variant,
                nominal_duration_secs: 10 * (variant.index() as u32 + 1),
                payload: Payload::generate,
            })
            .collect();
        Self { specs }
    }

    /// A catalog with no entries, to be filled with [`Catalog::with`]
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Adds or replaces the entry for `spec.variant`
    pub fn with(mut self, spec: JobSpec) -> Self {
        self.specs.retain(|existing| existing.variant != spec.variant);
        self.specs.push(spec);
        self
    }

    /// Finds the spec for a variant
    ///
    /// A miss means the catalog was built incorrectly; callers must not start
    /// a job from it.
    pub fn lookup(&self, variant: JobVariant) -> Result<&JobSpec> {
        self.specs
            .iter()
            .find(|spec| spec.variant == variant)
            .ok_or_else(|| {
                TrialError::configuration(format!("no catalog entry for variant '{}'", variant))
            })
    }

    /// Nominal duration in seconds, falling back to [`DEFAULT_DURATION_SECS`]
    pub fn duration_for(&self, variant: JobVariant) -> u32 {
        self.lookup(variant)
            .map(|spec| spec.nominal_duration_secs)
            .unwrap_or(DEFAULT_DURATION_SECS)
    }

    /// Nominal duration for a raw selection index, with the same fallback
    pub fn duration_for_index(&self, index: usize) -> u32 {
        JobVariant::from_index(index)
            .map(|variant| self.duration_for(variant))
            .unwrap_or(DEFAULT_DURATION_SECS)
    }

    pub fn payload_for(&self, variant: JobVariant) -> Result<Payload> {
        self.lookup(variant).map(JobSpec::generate_payload)
    }

    /// Entries in selection order
    pub fn specs(&self) -> impl Iterator<Item = &JobSpec> {
        let mut ordered: Vec<&JobSpec> = self.specs.iter().collect();
        ordered.sort_by_key(|spec| spec.variant.index());
        ordered.into_iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
