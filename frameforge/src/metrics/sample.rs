//! Performance sample recorded per finished task.

use std::time::Duration;

use crate::compute::BackendKind;

/// One task's outcome, as seen by the metrics ring.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSample {
    pub backend: BackendKind,
    pub elements: usize,
    pub processing_time: Duration,
    /// Elements per second.
    pub throughput: f64,
    /// Input plus output buffer size in bytes.
    pub memory_bytes: u64,
    /// Tasks pending in the scheduler when this one was submitted.
    pub queue_depth: usize,
    /// False for the terminating attempt of an exhausted task.
    pub succeeded: bool,
}

impl PerformanceSample {
    /// Sample for a successful attempt.
    pub fn completed(
        backend: BackendKind,
        elements: usize,
        stride: usize,
        processing_time: Duration,
        queue_depth: usize,
    ) -> Self {
        Self {
            backend,
            elements,
            processing_time,
            throughput: throughput(elements, processing_time),
            memory_bytes: memory_estimate(elements, stride),
            queue_depth,
            succeeded: true,
        }
    }

    /// Sample for the final attempt of a task that exhausted its fallbacks.
    pub fn failed(
        backend: BackendKind,
        elements: usize,
        stride: usize,
        processing_time: Duration,
        queue_depth: usize,
    ) -> Self {
        Self {
            throughput: 0.0,
            succeeded: false,
            ..Self::completed(backend, elements, stride, processing_time, queue_depth)
        }
    }

    /// Processing time in fractional milliseconds.
    pub fn processing_ms(&self) -> f64 {
        self.processing_time.as_secs_f64() * 1000.0
    }
}

fn throughput(elements: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        elements as f64 / secs
    } else {
        0.0
    }
}

fn memory_estimate(elements: usize, stride: usize) -> u64 {
    (elements * stride * std::mem::size_of::<f32>() * 2) as u64
}
