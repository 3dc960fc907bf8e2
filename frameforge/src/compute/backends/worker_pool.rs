//! Bounded background worker pool.
//!
//! The payload is cut into chunks of at least [`MIN_CHUNK_ELEMENTS`] elements.
//! Each chunk runs on a blocking thread once it holds one of `workers`
//! semaphore permits, so at most `workers` chunks execute at a time across
//! all tasks sharing the pool. Chunks are reassembled in order.
//!
//! ```text
//! payload ──► [chunk 0][chunk 1][chunk 2] ... [chunk n]
//!                │        │        │             │
//!                ▼        ▼        ▼             ▼
//!             permit   permit   (waits)       (waits)
//!                │        │
//!           spawn_blocking ...
//!                │
//!                ▼
//!          try_join_all ──► concat ──► output
//! ```
//!
//! Closing the pool with [`WorkerPoolBackend::shutdown`] makes it unavailable:
//! queued chunks fail with `Unavailable` and the scheduler falls back.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::compute::backend::{BoxFuture, ComputeBackend};
use crate::compute::error::BackendError;
use crate::compute::kernel;
use crate::compute::policy::BackendKind;
use crate::compute::task::TaskParams;

use super::native::default_parallelism;

/// Smallest chunk handed to a single worker.
pub const MIN_CHUNK_ELEMENTS: usize = 1_000;

/// Semaphore-bounded pool of blocking workers.
#[derive(Debug)]
pub struct WorkerPoolBackend {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPoolBackend {
    /// Create a pool with `workers` slots (0 = available parallelism).
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            default_parallelism()
        } else {
            workers
        };
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Stop accepting work. Chunks already running finish normally.
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            self.permits.close();
            info!(workers = self.workers, "Worker pool shut down");
        }
    }

    /// Permits not currently held by a running chunk.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

impl ComputeBackend for WorkerPoolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::WorkerPool
    }

    fn is_available(&self) -> bool {
        !self.permits.is_closed()
    }

    fn units(&self) -> usize {
        if self.is_available() {
            self.workers
        } else {
            0
        }
    }

    fn execute(
        &self,
        payload: Arc<[f32]>,
        params: TaskParams,
        stride: usize,
    ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>> {
        Box::pin(async move {
            if self.permits.is_closed() {
                return Err(BackendError::unavailable(
                    BackendKind::WorkerPool,
                    "worker pool is shut down",
                ));
            }

            let elements = payload.len() / stride;
            let per_chunk = elements.div_ceil(self.workers).max(MIN_CHUNK_ELEMENTS);

            let mut jobs = Vec::with_capacity(elements.div_ceil(per_chunk));
            let mut start = 0;
            while start < elements {
                let end = (start + per_chunk).min(elements);
                jobs.push(run_chunk(
                    Arc::clone(&self.permits),
                    Arc::clone(&payload),
                    start,
                    end,
                    params,
                    stride,
                ));
                start = end;
            }

            debug!(elements, chunks = jobs.len(), "Dispatching to worker pool");

            let chunks = try_join_all(jobs).await?;
            Ok(chunks.concat())
        })
    }
}

async fn run_chunk(
    permits: Arc<Semaphore>,
    payload: Arc<[f32]>,
    start: usize,
    end: usize,
    params: TaskParams,
    stride: usize,
) -> Result<Vec<f32>, BackendError> {
    let permit = permits.acquire_owned().await.map_err(|_| {
        BackendError::unavailable(BackendKind::WorkerPool, "worker pool is shut down")
    })?;

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let mut chunk = payload[start * stride..end * stride].to_vec();
        kernel::transform_in_place(&mut chunk, start, &params, stride);
        chunk
    })
    .await
    .map_err(|e| BackendError::failed(BackendKind::WorkerPool, format!("worker aborted: {}", e)))
}
