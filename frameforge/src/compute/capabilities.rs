//! Backend capability detection.
//!
//! Capabilities are computed once when the scheduler is built and only change
//! through an explicit refresh. Detection is delegated to a
//! [`CapabilityProbe`] so tests can pin the capability set.

use std::fmt;

use super::backend::BackendSet;
use super::policy::BackendKind;

/// Which backends can currently run work, and how wide they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    pub gpu_compute: bool,
    pub native_concurrency: bool,
    pub worker_pool: bool,
    /// Threads in the native pool (0 if unavailable).
    pub native_threads: usize,
    /// Workers in the worker pool (0 if unavailable).
    pub worker_count: usize,
}

impl BackendCapabilities {
    /// Build from unit counts. A zero count marks the backend unavailable.
    pub fn new(gpu_compute: bool, native_threads: usize, worker_count: usize) -> Self {
        Self {
            gpu_compute,
            native_concurrency: native_threads > 0,
            worker_pool: worker_count > 0,
            native_threads,
            worker_count,
        }
    }

    /// Only the same-thread floor.
    pub fn cpu_only() -> Self {
        Self::default()
    }

    /// Whether `kind` may be selected or used as a fallback target.
    pub fn supports(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Gpu => self.gpu_compute,
            BackendKind::Native => self.native_concurrency,
            BackendKind::WorkerPool => self.worker_pool && self.worker_count > 0,
            BackendKind::Cpu => true,
        }
    }

    /// Supported backends, fastest first. Always ends with `Cpu`.
    pub fn available(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }
}

impl fmt::Display for BackendCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gpu={} native={} ({} threads) workers={} ({} units)",
            if self.gpu_compute { "yes" } else { "no" },
            if self.native_concurrency { "yes" } else { "no" },
            self.native_threads,
            if self.worker_pool { "yes" } else { "no" },
            self.worker_count,
        )
    }
}

/// Detects backend capabilities.
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self, backends: &BackendSet) -> BackendCapabilities;
}

/// Reports what the registered backends say about themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisteredBackendProbe;

impl CapabilityProbe for RegisteredBackendProbe {
    fn probe(&self, backends: &BackendSet) -> BackendCapabilities {
        let units = |kind: BackendKind| {
            backends
                .get(kind)
                .filter(|b| b.is_available())
                .map(|b| b.units())
                .unwrap_or(0)
        };

        let gpu = backends
            .get(BackendKind::Gpu)
            .is_some_and(|b| b.is_available());

        BackendCapabilities::new(gpu, units(BackendKind::Native), units(BackendKind::WorkerPool))
    }
}

/// Always reports a fixed capability set.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub BackendCapabilities);

impl CapabilityProbe for StaticProbe {
    fn probe(&self, _backends: &BackendSet) -> BackendCapabilities {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::backends::CpuBackend;
    use std::sync::Arc;

    #[test]
    fn test_new_derives_flags_from_counts() {
        let caps = BackendCapabilities::new(false, 4, 0);
        assert!(caps.native_concurrency);
        assert!(!caps.worker_pool);
        assert!(!caps.gpu_compute);
    }

    #[test]
    fn test_cpu_is_always_supported() {
        let caps = BackendCapabilities::cpu_only();
        assert!(caps.supports(BackendKind::Cpu));
        assert_eq!(caps.available(), vec![BackendKind::Cpu]);
    }

    #[test]
    fn test_available_is_ordered() {
        let caps = BackendCapabilities::new(true, 2, 2);
        assert_eq!(caps.available(), BackendKind::ALL.to_vec());
    }

    #[test]
    fn test_registered_probe_with_cpu_only() {
        let set = BackendSet::new().with(Arc::new(CpuBackend::new()));
        let caps = RegisteredBackendProbe.probe(&set);
        assert_eq!(caps, BackendCapabilities::cpu_only());
    }

    #[test]
    fn test_static_probe_ignores_registry() {
        let fixed = BackendCapabilities::new(true, 8, 4);
        let caps = StaticProbe(fixed).probe(&BackendSet::new());
        assert_eq!(caps, fixed);
    }

    #[test]
    fn test_display() {
        let caps = BackendCapabilities::new(false, 8, 4);
        assert_eq!(
            caps.to_string(),
            "gpu=no native=yes (8 threads) workers=yes (4 units)"
        );
    }
}
