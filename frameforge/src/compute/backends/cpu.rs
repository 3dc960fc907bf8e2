//! Same-thread reference backend.

use std::sync::Arc;

use crate::compute::backend::{BoxFuture, ComputeBackend};
use crate::compute::error::BackendError;
use crate::compute::kernel;
use crate::compute::policy::BackendKind;
use crate::compute::task::TaskParams;

/// Runs the kernel inline on the attempt's own task.
///
/// This is the floor of the fallback chain and is always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn is_available(&self) -> bool {
        true
    }

    fn units(&self) -> usize {
        1
    }

    fn execute(
        &self,
        payload: Arc<[f32]>,
        params: TaskParams,
        stride: usize,
    ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>> {
        Box::pin(async move { Ok(kernel::transform(&payload, &params, stride)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::task::PARTICLE_STRIDE;

    #[tokio::test]
    async fn test_cpu_matches_kernel() {
        let payload: Arc<[f32]> = vec![1.0; 3 * PARTICLE_STRIDE].into();
        let params = TaskParams::default().with_elapsed(2.0);

        let out = CpuBackend::new()
            .execute(Arc::clone(&payload), params, PARTICLE_STRIDE)
            .await
            .unwrap();

        assert_eq!(out, kernel::transform(&payload, &params, PARTICLE_STRIDE));
    }
}
