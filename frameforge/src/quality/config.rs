//! Quality controller configuration.

use std::time::Duration;

use thiserror::Error;

/// Default frame rate the controller steers toward.
pub const DEFAULT_TARGET_FPS: f64 = 60.0;

/// Default number of recent samples inspected per tick.
pub const DEFAULT_SAMPLE_WINDOW: usize = 10;

/// Default interval between ticks when driven by [`run`](super::QualityController::run).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Effective FPS below `target * REDUCE_RATIO` triggers a reduce advisory.
pub const DEFAULT_REDUCE_RATIO: f64 = 0.8;

/// Effective FPS above `target * INCREASE_RATIO` triggers an increase advisory.
pub const DEFAULT_INCREASE_RATIO: f64 = 1.2;

/// Invalid controller configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityConfigError {
    #[error("target FPS must be positive and finite, got {0}")]
    InvalidTargetFps(f64),

    #[error("sample window must be at least 1")]
    EmptyWindow,

    #[error("tick interval must be non-zero")]
    ZeroInterval,

    #[error("ratios must satisfy 0 < reduce ({reduce}) <= 1 <= increase ({increase})")]
    InvalidRatios { reduce: f64, increase: f64 },

    #[error("scale bounds must satisfy 0 < min ({min}) <= 1 <= max ({max})")]
    InvalidScaleBounds { min: f64, max: f64 },
}

/// Configuration for [`QualityController`](super::QualityController).
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    pub target_fps: f64,
    /// Samples averaged per tick (K).
    pub sample_window: usize,
    pub tick_interval: Duration,
    pub reduce_ratio: f64,
    pub increase_ratio: f64,
    /// Lower clamp for the suggested workload scale.
    pub min_scale: f64,
    /// Upper clamp for the suggested workload scale.
    pub max_scale: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            tick_interval: DEFAULT_TICK_INTERVAL,
            reduce_ratio: DEFAULT_REDUCE_RATIO,
            increase_ratio: DEFAULT_INCREASE_RATIO,
            min_scale: 0.5,
            max_scale: 1.5,
        }
    }
}

impl QualityConfig {
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_sample_window(mut self, samples: usize) -> Self {
        self.sample_window = samples;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), QualityConfigError> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(QualityConfigError::InvalidTargetFps(self.target_fps));
        }
        if self.sample_window == 0 {
            return Err(QualityConfigError::EmptyWindow);
        }
        if self.tick_interval.is_zero() {
            return Err(QualityConfigError::ZeroInterval);
        }
        let ratios_ok = self.reduce_ratio > 0.0
            && self.reduce_ratio <= 1.0
            && self.increase_ratio >= 1.0
            && self.increase_ratio.is_finite();
        if !ratios_ok {
            return Err(QualityConfigError::InvalidRatios {
                reduce: self.reduce_ratio,
                increase: self.increase_ratio,
            });
        }
        let scale_ok = self.min_scale > 0.0
            && self.min_scale <= 1.0
            && self.max_scale >= 1.0
            && self.max_scale.is_finite();
        if !scale_ok {
            return Err(QualityConfigError::InvalidScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(QualityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_target() {
        for fps in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let config = QualityConfig::default().with_target_fps(fps);
            assert!(matches!(
                config.validate(),
                Err(QualityConfigError::InvalidTargetFps(_))
            ));
        }
    }

    #[test]
    fn test_rejects_empty_window_and_zero_interval() {
        assert_eq!(
            QualityConfig::default().with_sample_window(0).validate(),
            Err(QualityConfigError::EmptyWindow)
        );
        assert_eq!(
            QualityConfig::default()
                .with_tick_interval(Duration::ZERO)
                .validate(),
            Err(QualityConfigError::ZeroInterval)
        );
    }

    #[test]
    fn test_rejects_inverted_ratios() {
        let config = QualityConfig {
            reduce_ratio: 1.3,
            ..QualityConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(QualityConfigError::InvalidRatios { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_scale_bounds() {
        for (min, max) in [(2.0, 1.0), (0.0, 1.5), (f64::NAN, 1.5), (0.5, f64::NAN), (0.5, f64::INFINITY)] {
            let config = QualityConfig {
                min_scale: min,
                max_scale: max,
                ..QualityConfig::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(QualityConfigError::InvalidScaleBounds { .. })
                ),
                "min={min} max={max}"
            );
        }
    }
}
