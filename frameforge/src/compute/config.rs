//! Scheduler configuration.

use std::time::Duration;

use super::policy::SelectionThresholds;
use crate::metrics::DEFAULT_RING_CAPACITY;

/// Default per-attempt deadline.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`ComputeScheduler`](super::ComputeScheduler).
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Deadline for a single backend attempt. Expiry triggers fallback.
    pub attempt_timeout: Duration,

    /// Samples retained by the metrics ring.
    pub metrics_capacity: usize,

    /// Size floors used by backend selection.
    pub thresholds: SelectionThresholds,

    /// Native pool width (0 = available parallelism).
    pub native_threads: usize,

    /// Worker pool width (0 = available parallelism).
    pub worker_count: usize,

    /// Try to bring up the GPU backend. Ignored without the `gpu` feature.
    pub enable_gpu: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            metrics_capacity: DEFAULT_RING_CAPACITY,
            thresholds: SelectionThresholds::default(),
            native_threads: 0,
            worker_count: 0,
            enable_gpu: true,
        }
    }
}

impl SchedulerConfig {
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_metrics_capacity(mut self, capacity: usize) -> Self {
        self.metrics_capacity = capacity;
        self
    }

    pub fn with_thresholds(mut self, thresholds: SelectionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_native_threads(mut self, threads: usize) -> Self {
        self.native_threads = threads;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn with_gpu(mut self, enabled: bool) -> Self {
        self.enable_gpu = enabled;
        self
    }
}
