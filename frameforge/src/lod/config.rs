//! Distance thresholds and per-level detail hints.
//!
//! A config with N thresholds defines N renderable levels plus one culled
//! level:
//!
//! ```text
//! distance:  0 ──── t[0] ──── t[1] ──── ... ──── t[N-1] ────────► ∞
//! level:        0        1                 N-1          N (culled)
//! ```
//!
//! Boundaries are inclusive: an entity exactly at `t[i]` gets level `i`.

use std::time::Duration;

use super::error::LodConfigError;

pub const DEFAULT_THRESHOLDS: [f32; 4] = [50.0, 100.0, 200.0, 400.0];
pub const DEFAULT_POLYGON_COUNTS: [u32; 4] = [10_000, 5_000, 2_000, 500];
pub const DEFAULT_TEXTURE_SIZES: [u32; 4] = [2048, 1024, 512, 256];
pub const DEFAULT_COMPRESSION: [f32; 4] = [1.0, 0.75, 0.5, 0.25];

/// Interval between LOD recomputations before any self-tuning.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Fastest the tick loop will self-tune to.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(16);

/// Slowest the tick loop will self-tune to.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(500);

/// Rendering hints for one detail level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodHint {
    pub polygon_count: u32,
    pub texture_size: u32,
    /// Fraction of full texture quality, in (0, 1].
    pub compression: f32,
}

/// Validated LOD configuration.
///
/// Fields are private so the threshold invariants cannot be broken after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LodConfig {
    thresholds: Vec<f32>,
    hints: Vec<LodHint>,
    update_interval: Duration,
    min_interval: Duration,
    max_interval: Duration,
}

impl LodConfig {
    /// Build a config from N thresholds and N parallel hint arrays.
    ///
    /// Uses the default update interval and bounds.
    pub fn new(
        thresholds: Vec<f32>,
        polygon_counts: &[u32],
        texture_sizes: &[u32],
        compression: &[f32],
    ) -> Result<Self, LodConfigError> {
        if thresholds.is_empty() {
            return Err(LodConfigError::EmptyThresholds);
        }

        for (index, &value) in thresholds.iter().enumerate() {
            if !value.is_finite() {
                return Err(LodConfigError::NonFiniteThreshold { index, value });
            }
            if value < 0.0 {
                return Err(LodConfigError::NegativeThreshold { index, value });
            }
            if index > 0 {
                let previous = thresholds[index - 1];
                if value <= previous {
                    return Err(LodConfigError::NotIncreasing {
                        index,
                        previous,
                        value,
                    });
                }
            }
        }

        let expected = thresholds.len();
        check_len("polygon_counts", expected, polygon_counts.len())?;
        check_len("texture_sizes", expected, texture_sizes.len())?;
        check_len("compression", expected, compression.len())?;

        for (index, &value) in compression.iter().enumerate() {
            if !(value > 0.0 && value <= 1.0) {
                return Err(LodConfigError::InvalidCompression { index, value });
            }
        }

        let hints = polygon_counts
            .iter()
            .zip(texture_sizes)
            .zip(compression)
            .map(|((&polygon_count, &texture_size), &compression)| LodHint {
                polygon_count,
                texture_size,
                compression,
            })
            .collect();

        Ok(Self {
            thresholds,
            hints,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        })
    }

    /// Thresholds only, with the default hint for each level clamped to the
    /// last default entry.
    pub fn from_thresholds(thresholds: Vec<f32>) -> Result<Self, LodConfigError> {
        let n = thresholds.len();
        let pick = |i: usize| i.min(DEFAULT_THRESHOLDS.len() - 1);
        let polygons: Vec<u32> = (0..n).map(|i| DEFAULT_POLYGON_COUNTS[pick(i)]).collect();
        let textures: Vec<u32> = (0..n).map(|i| DEFAULT_TEXTURE_SIZES[pick(i)]).collect();
        let compression: Vec<f32> = (0..n).map(|i| DEFAULT_COMPRESSION[pick(i)]).collect();
        Self::new(thresholds, &polygons, &textures, &compression)
    }

    /// Set the initial update interval and its self-tuning bounds.
    pub fn with_intervals(
        mut self,
        initial: Duration,
        min: Duration,
        max: Duration,
    ) -> Result<Self, LodConfigError> {
        if min.is_zero() || min > initial || initial > max {
            return Err(LodConfigError::InvalidInterval { min, initial, max });
        }
        self.update_interval = initial;
        self.min_interval = min;
        self.max_interval = max;
        Ok(self)
    }

    /// Number of renderable levels (N). Level N means culled.
    pub fn level_count(&self) -> usize {
        self.thresholds.len()
    }

    /// The level value that means "culled".
    pub fn culled_level(&self) -> usize {
        self.thresholds.len()
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn hints(&self) -> &[LodHint] {
        &self.hints
    }

    /// Hints for `level`, or `None` for the culled level.
    pub fn hint(&self, level: usize) -> Option<&LodHint> {
        self.hints.get(level)
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Index of the first threshold `distance` does not exceed.
    ///
    /// Beyond the last threshold (or NaN) is culled.
    pub fn level_for(&self, distance: f32) -> usize {
        self.thresholds
            .iter()
            .position(|&t| distance <= t)
            .unwrap_or(self.thresholds.len())
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            hints: DEFAULT_POLYGON_COUNTS
                .iter()
                .zip(DEFAULT_TEXTURE_SIZES)
                .zip(DEFAULT_COMPRESSION)
                .map(|((&polygon_count, texture_size), compression)| LodHint {
                    polygon_count,
                    texture_size,
                    compression,
                })
                .collect(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), LodConfigError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LodConfigError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
