//! Job variant selector

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrialError;

/// Identifies which kind of job to run
///
/// The set is fixed. Controllers usually select a variant by its position in
/// a list, so every variant also has a stable zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobVariant {
    Quick,
    Standard,
    Extended,
}

impl JobVariant {
    /// All variants in selection order
    pub const ALL: [JobVariant; 3] = [JobVariant::Quick, JobVariant::Standard, JobVariant::Extended];

    /// Zero-based position in selection order
    pub fn index(self) -> usize {
        match self {
            JobVariant::Quick => 0,
            JobVariant::Standard => 1,
            JobVariant::Extended => 2,
        }
    }

    /// Looks up a variant by its selection index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            JobVariant::Quick => "quick",
            JobVariant::Standard => "standard",
            JobVariant::Extended => "extended",
        }
    }
}

impl fmt::Display for JobVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for JobVariant {
    type Err = TrialError;

    /// Accepts a variant name (case-insensitive) or its selection index
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(index) = trimmed.parse::<usize>() {
            return Self::from_index(index)
                .ok_or_else(|| TrialError::configuration(format!("no variant at index {}", index)));
        }

        Self::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TrialError::configuration(format!("unknown variant '{}'", trimmed)))
    }
}
