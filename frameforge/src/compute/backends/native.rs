//! Native thread-pool backend.
//!
//! Splits the payload across a dedicated rayon pool. The pool is driven from
//! `spawn_blocking` so the async runtime's worker threads never block on
//! compute.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::compute::backend::{BoxFuture, ComputeBackend};
use crate::compute::error::BackendError;
use crate::compute::kernel;
use crate::compute::policy::BackendKind;
use crate::compute::task::TaskParams;

/// Smallest slice of elements handed to one rayon job.
const MIN_ELEMENTS_PER_JOB: usize = 256;

/// Data-parallel backend on a rayon thread pool.
pub struct NativeBackend {
    pool: Arc<ThreadPool>,
    threads: usize,
}

impl NativeBackend {
    /// Build a pool with `threads` workers (0 = available parallelism).
    pub fn new(threads: usize) -> Result<Self, BackendError> {
        let threads = if threads == 0 {
            default_parallelism()
        } else {
            threads
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("frameforge-native-{}", i))
            .build()
            .map_err(|e| BackendError::unavailable(BackendKind::Native, e.to_string()))?;

        debug!(threads, "Native compute pool started");

        Ok(Self {
            pool: Arc::new(pool),
            threads,
        })
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("threads", &self.threads)
            .finish()
    }
}

impl ComputeBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn is_available(&self) -> bool {
        true
    }

    fn units(&self) -> usize {
        self.threads
    }

    fn execute(
        &self,
        payload: Arc<[f32]>,
        params: TaskParams,
        stride: usize,
    ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>> {
        let pool = Arc::clone(&self.pool);
        let threads = self.threads;

        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let elements = payload.len() / stride;
                let per_job = elements.div_ceil(threads).max(MIN_ELEMENTS_PER_JOB);
                let mut output = payload.to_vec();

                pool.install(|| {
                    output
                        .par_chunks_mut(per_job * stride)
                        .enumerate()
                        .for_each(|(job, chunk)| {
                            kernel::transform_in_place(chunk, job * per_job, &params, stride);
                        });
                });

                output
            })
            .await
            .map_err(|e| BackendError::failed(BackendKind::Native, format!("native job aborted: {}", e)))
        })
    }
}

pub(crate) fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
