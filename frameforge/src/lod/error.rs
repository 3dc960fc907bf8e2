//! LOD configuration errors.

use std::time::Duration;

use thiserror::Error;

/// A malformed [`LodConfig`](super::LodConfig), rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LodConfigError {
    #[error("at least one distance threshold is required")]
    EmptyThresholds,

    #[error("threshold {index} is not finite ({value})")]
    NonFiniteThreshold { index: usize, value: f32 },

    #[error("threshold {index} is negative ({value})")]
    NegativeThreshold { index: usize, value: f32 },

    #[error("threshold {index} ({value}) must be greater than threshold {} ({previous})", .index - 1)]
    NotIncreasing {
        index: usize,
        previous: f32,
        value: f32,
    },

    #[error("{what} has {actual} entries, expected {expected} (one per threshold)")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("compression ratio {index} must be in (0, 1], got {value}")]
    InvalidCompression { index: usize, value: f32 },

    #[error(
        "update interval bounds must satisfy 0 < min ({}ms) <= initial ({}ms) <= max ({}ms)",
        .min.as_millis(), .initial.as_millis(), .max.as_millis()
    )]
    InvalidInterval {
        min: Duration,
        initial: Duration,
        max: Duration,
    },
}
