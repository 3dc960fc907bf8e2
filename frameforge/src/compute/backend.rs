//! Backend execution interface.
//!
//! Every execution strategy implements [`ComputeBackend`]. The scheduler holds
//! backends as `Arc<dyn ComputeBackend>` in a [`BackendSet`], so new backends
//! (or test fakes) can be plugged in without touching dispatch logic.
//!
//! # Dyn Compatibility
//!
//! `execute` returns a [`BoxFuture`] rather than using `async fn` so the trait
//! stays object-safe.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::error::BackendError;
use super::policy::BackendKind;
use super::task::TaskParams;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An execution strategy for compute tasks.
///
/// Implementations must not apply their own deadline: the scheduler wraps
/// every `execute` call in a timeout and treats expiry as a failure.
pub trait ComputeBackend: Send + Sync {
    /// Which slot of the fallback chain this backend fills.
    fn kind(&self) -> BackendKind;

    /// Whether the backend can accept work right now.
    fn is_available(&self) -> bool;

    /// Parallel execution units (threads, workers, or 1).
    fn units(&self) -> usize;

    /// Run the kernel over `payload`.
    ///
    /// `payload` has already been validated: non-empty, a whole number of
    /// `stride`-sized elements, `stride >= PARTICLE_STRIDE`. The returned
    /// buffer must have the same length.
    fn execute(
        &self,
        payload: Arc<[f32]>,
        params: TaskParams,
        stride: usize,
    ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>>;
}

/// Registered backends, at most one per [`BackendKind`].
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: BTreeMap<BackendKind, Arc<dyn ComputeBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any existing one of the same kind.
    pub fn insert(&mut self, backend: Arc<dyn ComputeBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn with(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.insert(backend);
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn ComputeBackend>> {
        self.backends.get(&kind)
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Registered kinds, fastest first.
    pub fn kinds(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.backends.keys().copied()
    }

    /// Registered backends, fastest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ComputeBackend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.backends.keys()).finish()
    }
}
