//! Adaptive quality controller.
//!
//! Compares the frame rate implied by recent task latency against a target
//! and advises the workload producer to shrink or grow its batches.
//!
//! ```text
//!        last K successful samples
//! SharedMetrics ─────────────► mean ms ──► effective FPS = 1000 / mean
//!                                                  │
//!                 ┌────────────────────────────────┼──────────────────────┐
//!                 ▼                                ▼                      ▼
//!        < 0.8 × target                    within band             > 1.2 × target
//!        ReduceWorkload                        None                IncreaseWorkload
//! ```
//!
//! The controller never changes tasks itself. Producers either use the value
//! returned by [`tick`](QualityController::tick) or subscribe to the broadcast.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::{QualityConfig, QualityConfigError};
use crate::compute::Priority;
use crate::metrics::SharedMetrics;

/// Advisories buffered per subscriber before the oldest are dropped.
const ADVISORY_CHANNEL_CAPACITY: usize = 16;

/// Effective FPS below this fraction of target also lowers the priority ceiling.
const SEVERE_SHORTFALL_RATIO: f64 = 0.5;

/// A suggestion for the workload producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityAdvisory {
    /// Tasks are too slow for the target frame rate.
    ReduceWorkload {
        effective_fps: f64,
        target_fps: f64,
        /// Multiply the next batch size by this (< 1).
        scale: f64,
        /// Highest priority the producer should use until recovery.
        priority_ceiling: Priority,
    },
    /// There is headroom above the target frame rate.
    IncreaseWorkload {
        effective_fps: f64,
        target_fps: f64,
        /// Multiply the next batch size by this (> 1).
        scale: f64,
    },
}

impl QualityAdvisory {
    pub fn scale(&self) -> f64 {
        match self {
            QualityAdvisory::ReduceWorkload { scale, .. }
            | QualityAdvisory::IncreaseWorkload { scale, .. } => *scale,
        }
    }

    pub fn effective_fps(&self) -> f64 {
        match self {
            QualityAdvisory::ReduceWorkload { effective_fps, .. }
            | QualityAdvisory::IncreaseWorkload { effective_fps, .. } => *effective_fps,
        }
    }

    pub fn is_reduce(&self) -> bool {
        matches!(self, QualityAdvisory::ReduceWorkload { .. })
    }
}

impl fmt::Display for QualityAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityAdvisory::ReduceWorkload {
                effective_fps,
                target_fps,
                scale,
                priority_ceiling,
            } => write!(
                f,
                "reduce workload: {:.1} FPS < target {:.1}, scale x{:.2}, priority <= {}",
                effective_fps, target_fps, scale, priority_ceiling
            ),
            QualityAdvisory::IncreaseWorkload {
                effective_fps,
                target_fps,
                scale,
            } => write!(
                f,
                "increase workload: {:.1} FPS > target {:.1}, scale x{:.2}",
                effective_fps, target_fps, scale
            ),
        }
    }
}

/// Periodic latency-to-FPS feedback loop over the metrics ring.
pub struct QualityController {
    metrics: Arc<SharedMetrics>,
    config: QualityConfig,
    advisories: broadcast::Sender<QualityAdvisory>,
    ticks: AtomicU64,
    emitted: AtomicU64,
}

impl QualityController {
    /// Create a controller reading from `metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`QualityConfigError`] if `config` is invalid.
    pub fn new(metrics: Arc<SharedMetrics>, config: QualityConfig) -> Result<Self, QualityConfigError> {
        config.validate()?;
        let (advisories, _) = broadcast::channel(ADVISORY_CHANNEL_CAPACITY);
        Ok(Self {
            metrics,
            config,
            advisories,
            ticks: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
        })
    }

    /// Receive every advisory emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QualityAdvisory> {
        self.advisories.subscribe()
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Ticks that had enough samples to evaluate.
    pub fn evaluated_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn advisories_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Frame rate implied by the mean of the last K successful samples.
    ///
    /// Samples from exhausted tasks are skipped; their time is bounded by
    /// attempt timeouts rather than frame work. `None` with fewer than K
    /// successful samples in the ring.
    pub fn effective_fps(&self) -> Option<f64> {
        let window = self.config.sample_window;
        let times: Vec<f64> = self
            .metrics
            .snapshot()
            .iter()
            .rev()
            .filter(|s| s.succeeded)
            .take(window)
            .map(|s| s.processing_ms())
            .collect();
        if times.len() < window {
            return None;
        }

        let mean_ms = times.iter().sum::<f64>() / window as f64;
        Some(if mean_ms > 0.0 {
            1000.0 / mean_ms
        } else {
            f64::INFINITY
        })
    }

    /// Evaluate the latest window once.
    ///
    /// With fewer than K samples this is a no-op and returns `None`.
    pub fn tick(&self) -> Option<QualityAdvisory> {
        let effective_fps = self.effective_fps()?;
        self.ticks.fetch_add(1, Ordering::Relaxed);

        let target_fps = self.config.target_fps;
        let scale = (effective_fps / target_fps).clamp(self.config.min_scale, self.config.max_scale);

        let advisory = if effective_fps < target_fps * self.config.reduce_ratio {
            let priority_ceiling = if effective_fps < target_fps * SEVERE_SHORTFALL_RATIO {
                Priority::Low
            } else {
                Priority::Normal
            };
            QualityAdvisory::ReduceWorkload {
                effective_fps,
                target_fps,
                scale,
                priority_ceiling,
            }
        } else if effective_fps > target_fps * self.config.increase_ratio {
            QualityAdvisory::IncreaseWorkload {
                effective_fps,
                target_fps,
                scale,
            }
        } else {
            debug!(
                effective_fps = format!("{:.1}", effective_fps),
                target_fps, "Quality within band"
            );
            return None;
        };

        info!(
            effective_fps = format!("{:.1}", effective_fps),
            target_fps,
            scale = format!("{:.2}", scale),
            reduce = advisory.is_reduce(),
            "Quality advisory"
        );

        self.emitted.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine
        let _ = self.advisories.send(advisory);
        Some(advisory)
    }

    /// Tick on the configured interval until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        info!(
            target_fps = self.config.target_fps,
            window = self.config.sample_window,
            "Quality controller started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Quality controller shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
    }
}

impl fmt::Debug for QualityController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualityController")
            .field("config", &self.config)
            .field("evaluated_ticks", &self.evaluated_ticks())
            .field("advisories_emitted", &self.advisories_emitted())
            .finish()
    }
}
