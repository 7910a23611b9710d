//! Job payload types
//!
//! Each variant produces its own fixed record. The engine never looks inside a
//! payload; only result sinks and their readers interpret the fields.

use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::variant::JobVariant;

/// Result body produced by a successful job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Payload {
    Quick {
        /// Sampled reading in `0..100`
        reading: u32,
        taken_at: DateTime<Local>,
    },
    Standard {
        /// Ratio in `0.0..1.0`
        ratio: f64,
        run_id: Uuid,
    },
    Extended {
        /// Grade in `1..10`
        grade: u32,
        label: String,
        /// Serial in `0..1000`
        serial: u32,
    },
}

impl Payload {
    /// Generates a fresh payload for `variant` using the thread-local RNG
    pub fn generate(variant: JobVariant) -> Self {
        Self::generate_with(variant, &mut rand::rng())
    }

    /// Generates a payload for `variant` from the given RNG
    pub fn generate_with<R: Rng + ?Sized>(variant: JobVariant, rng: &mut R) -> Self {
        match variant {
            JobVariant::Quick => Payload::Quick {
                reading: rng.random_range(0..100),
                taken_at: Local::now(),
            },
            JobVariant::Standard => Payload::Standard {
                ratio: rng.random::<f64>(),
                run_id: Uuid::new_v4(),
            },
            JobVariant::Extended => Payload::Extended {
                grade: rng.random_range(1..10),
                label: "test".to_string(),
                serial: rng.random_range(0..1000),
            },
        }
    }

    /// Variant this payload belongs to
    pub fn variant(&self) -> JobVariant {
        match self {
            Payload::Quick { .. } => JobVariant::Quick,
            Payload::Standard { .. } => JobVariant::Standard,
            Payload::Extended { .. } => JobVariant::Extended,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Quick { reading, taken_at } => write!(
                f,
                "{{ reading = {}, taken_at = {} }}",
                reading,
                taken_at.format("%Y-%m-%d %H:%M:%S")
            ),
            Payload::Standard { ratio, run_id } => {
                write!(f, "{{ ratio = {}, run_id = {} }}", ratio, run_id)
            }
            Payload::Extended {
                grade,
                label,
                serial,
            } => write!(
                f,
                "{{ grade = {}, label = {}, serial = {} }}",
                grade, label, serial
            ),
        }
    }
}
