//! Thread-safe metrics store shared by the scheduler and its readers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::ring::{MetricsError, MetricsRing};
use super::sample::PerformanceSample;
use crate::compute::BackendKind;

/// [`MetricsRing`] of samples behind a read-write lock.
///
/// Completion handlers write concurrently. Readers get a copy, so a long
/// read never blocks writers for more than the copy.
#[derive(Debug)]
pub struct SharedMetrics {
    ring: RwLock<MetricsRing<PerformanceSample>>,
    recorded: AtomicU64,
}

impl SharedMetrics {
    pub fn new(capacity: usize) -> Result<Self, MetricsError> {
        Ok(Self {
            ring: RwLock::new(MetricsRing::new(capacity)?),
            recorded: AtomicU64::new(0),
        })
    }

    pub fn record(&self, sample: PerformanceSample) {
        self.ring.write().push(sample);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// All retained samples, oldest first.
    pub fn snapshot(&self) -> Vec<PerformanceSample> {
        self.ring.read().to_vec()
    }

    /// The newest `n` samples, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<PerformanceSample> {
        self.ring.read().last_n(n)
    }

    pub fn latest(&self) -> Option<PerformanceSample> {
        self.ring.read().latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.read().capacity()
    }

    /// Samples ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.ring.write().clear();
    }

    /// Aggregate over the retained window.
    pub fn summary(&self) -> MetricsSummary {
        let ring = self.ring.read();

        let mut per_backend = BTreeMap::new();
        let mut failures = 0;
        let mut total_ms = 0.0;
        let mut total_throughput = 0.0;
        let mut succeeded = 0usize;

        for sample in ring.iter() {
            *per_backend.entry(sample.backend).or_insert(0) += 1;
            if sample.succeeded {
                succeeded += 1;
                total_ms += sample.processing_ms();
                total_throughput += sample.throughput;
            } else {
                failures += 1;
            }
        }

        let mean = |total: f64| {
            if succeeded > 0 {
                total / succeeded as f64
            } else {
                0.0
            }
        };

        MetricsSummary {
            samples: ring.len(),
            failures,
            mean_processing_ms: mean(total_ms),
            mean_throughput: mean(total_throughput),
            per_backend,
            total_recorded: self.total_recorded(),
        }
    }
}

/// Point-in-time aggregate of the metrics window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    /// Samples in the window.
    pub samples: usize,
    /// Samples from exhausted tasks.
    pub failures: usize,
    /// Mean over successful samples.
    pub mean_processing_ms: f64,
    /// Mean elements/second over successful samples.
    pub mean_throughput: f64,
    pub per_backend: BTreeMap<BackendKind, usize>,
    pub total_recorded: u64,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples ({} failed), mean {:.2}ms, {:.0} elem/s",
            self.samples, self.failures, self.mean_processing_ms, self.mean_throughput
        )?;
        for (backend, count) in &self.per_backend {
            write!(f, ", {}={}", backend, count)?;
        }
        Ok(())
    }
}
