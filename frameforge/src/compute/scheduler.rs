//! Compute task scheduler.
//!
//! Routes each task to a backend, tracks it until it resolves, and walks the
//! fallback chain when a backend fails.
//!
//! # Lifecycle
//!
//! ```text
//!  submit ──► validate ──► select_backend ──► spawn attempt ──► TaskHandle
//!                                                  │
//!                         ┌────────────────────────┘
//!                         ▼
//!                  execute (with timeout)
//!                    │              │
//!                   Ok             Err
//!                    │              │
//!                    ▼              ▼
//!              record sample   next lower backend? ──yes──► spawn attempt
//!              deliver result       │
//!                                   no
//!                                   ▼
//!                           record failed sample
//!                           deliver ExhaustedFallback
//! ```
//!
//! Every attempt is its own spawned task and carries the task's single
//! completion sender, so at most one attempt can ever deliver. A timed-out
//! attempt is abandoned: its backend may still finish, but the output is
//! dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backend::{BackendSet, BoxFuture, ComputeBackend};
use super::backends::{CpuBackend, NativeBackend, WorkerPoolBackend};
use super::benchmark::{synthetic_particles, BenchmarkEntry, BenchmarkReport, BENCHMARK_SEED};
use super::capabilities::{BackendCapabilities, CapabilityProbe, RegisteredBackendProbe};
use super::config::SchedulerConfig;
use super::error::{BackendError, ComputeError};
use super::handle::TaskHandle;
use super::policy::{select_backend, BackendKind};
use super::task::{ComputeResult, ComputeTask, TaskId, TaskParams, PARTICLE_STRIDE};
use crate::metrics::{MetricsSummary, PerformanceSample, SharedMetrics};

/// Where a pending task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Accepted, first attempt not yet started.
    Submitted,
    /// An attempt is running. `attempt` counts from 1.
    Dispatched { backend: BackendKind, attempt: u32 },
    /// The attempt on `backend` failed; the next one is being scheduled.
    Failed { backend: BackendKind, attempt: u32 },
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`ComputeScheduler`] from backends, a probe and a runtime.
pub struct ComputeSchedulerBuilder {
    config: SchedulerConfig,
    backends: BackendSet,
    probe: Option<Arc<dyn CapabilityProbe>>,
    runtime: Option<Handle>,
}

impl ComputeSchedulerBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            backends: BackendSet::new(),
            probe: None,
            runtime: None,
        }
    }

    /// Register a backend, replacing any previous one of the same kind.
    pub fn with_backend(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.backends.insert(backend);
        self
    }

    /// Register the built-in backends for this configuration.
    ///
    /// The GPU backend is only attempted with the `gpu` feature and
    /// `enable_gpu` set; failure to initialise it is logged, not returned.
    pub fn with_default_backends(mut self) -> Self {
        match NativeBackend::new(self.config.native_threads) {
            Ok(native) => self.backends.insert(Arc::new(native)),
            Err(e) => warn!(error = %e, "Native backend unavailable"),
        }

        self.backends
            .insert(Arc::new(WorkerPoolBackend::new(self.config.worker_count)));
        self.backends.insert(Arc::new(CpuBackend::new()));

        #[cfg(feature = "gpu")]
        {
            if self.config.enable_gpu {
                match super::backends::GpuBackend::new() {
                    Ok(gpu) => self.backends.insert(Arc::new(gpu)),
                    Err(e) => info!(reason = %e, "GPU backend not available"),
                }
            }
        }

        self
    }

    /// Override capability detection.
    pub fn with_probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Run attempts on this runtime instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Probe capabilities and build the scheduler.
    ///
    /// A CPU backend is registered if none was supplied, so the fallback
    /// chain always has a floor.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::NoRuntime`] without a runtime handle or ambient runtime
    /// - [`ComputeError::Metrics`] if the metrics capacity is zero
    pub fn build(self) -> Result<ComputeScheduler, ComputeError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ComputeError::NoRuntime)?,
        };

        let mut backends = self.backends;
        if !backends.contains(BackendKind::Cpu) {
            backends.insert(Arc::new(CpuBackend::new()));
        }

        let metrics = Arc::new(SharedMetrics::new(self.config.metrics_capacity)?);
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(RegisteredBackendProbe));

        let capabilities = probe.probe(&backends);
        info!(
            capabilities = %capabilities,
            backends = ?backends,
            "Compute scheduler ready"
        );
        let (capabilities, _) = watch::channel(capabilities);

        Ok(ComputeScheduler {
            inner: Arc::new(Inner {
                backends,
                probe,
                capabilities,
                pending: DashMap::new(),
                metrics,
                config: self.config,
                runtime,
                shutdown: CancellationToken::new(),
            }),
        })
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Routes compute tasks across backends.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ComputeScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    backends: BackendSet,
    probe: Arc<dyn CapabilityProbe>,
    capabilities: watch::Sender<BackendCapabilities>,
    pending: DashMap<TaskId, TaskState>,
    metrics: Arc<SharedMetrics>,
    config: SchedulerConfig,
    runtime: Handle,
    shutdown: CancellationToken,
}

/// State carried from one attempt to the next.
struct InFlight {
    task: ComputeTask,
    elements: usize,
    queue_depth: usize,
    attempts: u32,
    reply: oneshot::Sender<Result<ComputeResult, ComputeError>>,
}

impl ComputeScheduler {
    pub fn builder(config: SchedulerConfig) -> ComputeSchedulerBuilder {
        ComputeSchedulerBuilder::new(config)
    }

    /// Scheduler with the built-in backends on the ambient runtime.
    pub fn with_default_backends(config: SchedulerConfig) -> Result<Self, ComputeError> {
        ComputeSchedulerBuilder::new(config)
            .with_default_backends()
            .build()
    }

    /// Accept a task and start its first attempt.
    ///
    /// Never waits on compute. Returns a handle that resolves exactly once.
    ///
    /// # Errors
    ///
    /// - [`ComputeError::Validation`] for a malformed task
    /// - [`ComputeError::ShuttingDown`] after [`shutdown`](Self::shutdown)
    pub fn submit(&self, task: ComputeTask) -> Result<TaskHandle, ComputeError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ComputeError::ShuttingDown);
        }
        task.validate()?;

        let id = task.id();
        let elements = task.element_count();
        let capabilities = self.capabilities();
        let selected = select_backend(
            elements,
            task.priority(),
            &capabilities,
            &self.inner.config.thresholds,
        );

        let queue_depth = self.inner.pending.len();
        let (reply, rx) = oneshot::channel();
        self.inner.pending.insert(id, TaskState::Submitted);

        debug!(
            task = %id,
            elements,
            priority = %task.priority(),
            selected = %selected,
            queue_depth,
            "Task submitted"
        );

        let flight = InFlight {
            task,
            elements,
            queue_depth,
            attempts: 0,
            reply,
        };

        match self.inner.resolve(selected, &capabilities) {
            Some(backend) => self.inner.dispatch(flight, backend),
            None => self.inner.exhaust(
                flight,
                BackendKind::Cpu,
                Duration::ZERO,
                BackendError::unavailable(selected, "no registered backend at or below selection"),
            ),
        }

        Ok(TaskHandle::new(id, rx))
    }

    /// Current capability snapshot.
    pub fn capabilities(&self) -> BackendCapabilities {
        *self.inner.capabilities.borrow()
    }

    /// Watch capability changes.
    pub fn subscribe_capabilities(&self) -> watch::Receiver<BackendCapabilities> {
        self.inner.capabilities.subscribe()
    }

    /// Re-run the capability probe and publish the result.
    pub fn refresh_capabilities(&self) -> BackendCapabilities {
        self.inner.refresh_capabilities()
    }

    /// Wait until `kind` is usable, or until `timeout` elapses.
    ///
    /// Returns `true` if the backend became (or already was) available.
    pub async fn wait_for_backend(&self, kind: BackendKind, timeout: Duration) -> bool {
        let mut rx = self.inner.capabilities.subscribe();
        // The `Ref` from `wait_for` borrows `rx`; drop it before returning
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|caps| caps.supports(kind))).await,
            Ok(Ok(_))
        );
        ready
    }

    /// Retained samples, oldest first.
    pub fn metrics(&self) -> Vec<PerformanceSample> {
        self.inner.metrics.snapshot()
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.inner.metrics.summary()
    }

    /// Shared handle to the metrics store, e.g. for a quality controller.
    pub fn metrics_handle(&self) -> Arc<SharedMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Tasks submitted but not yet resolved.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Lifecycle state of a pending task, `None` once resolved.
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.inner.pending.get(&id).map(|state| *state)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Registered backend kinds, fastest first.
    pub fn backends(&self) -> Vec<BackendKind> {
        self.inner.backends.kinds().collect()
    }

    /// Reject new submissions.
    ///
    /// Running attempts finish. Tasks that would fall back instead resolve
    /// to [`ComputeError::ShuttingDown`].
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!(pending = self.pending_count(), "Compute scheduler shutting down");
            self.inner.shutdown.cancel();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Time one synthetic payload on every available backend.
    ///
    /// Bypasses selection and does not record metrics. Each run is bounded
    /// by the attempt timeout.
    pub async fn benchmark(&self, elements: usize) -> BenchmarkReport {
        let elements = elements.max(1);
        let payload: Arc<[f32]> = synthetic_particles(elements, BENCHMARK_SEED).into();
        let params = TaskParams::default().with_elapsed(1.0);
        let capabilities = self.capabilities();
        let deadline = self.inner.config.attempt_timeout;

        let mut entries = Vec::new();
        for backend in self.inner.backends.iter() {
            let kind = backend.kind();
            if !capabilities.supports(kind) || !backend.is_available() {
                continue;
            }

            let started = Instant::now();
            let outcome = match tokio::time::timeout(
                deadline,
                backend.execute(Arc::clone(&payload), params, PARTICLE_STRIDE),
            )
            .await
            {
                Ok(Ok(_)) => Ok(started.elapsed()),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(BackendError::Timeout {
                    backend: kind,
                    timeout: deadline,
                }),
            };

            debug!(backend = %kind, elements, outcome = ?outcome, "Benchmark run");
            entries.push(BenchmarkEntry {
                backend: kind,
                outcome,
            });
        }

        BenchmarkReport { elements, entries }
    }
}

impl std::fmt::Debug for ComputeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeScheduler")
            .field("backends", &self.inner.backends)
            .field("capabilities", &self.capabilities())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Inner {
    /// First backend at or below `start` that is supported, registered and
    /// currently available.
    fn resolve(&self, start: BackendKind, caps: &BackendCapabilities) -> Option<BackendKind> {
        let mut candidate = Some(start);
        while let Some(kind) = candidate {
            let usable = caps.supports(kind)
                && self
                    .backends
                    .get(kind)
                    .is_some_and(|backend| backend.is_available());
            if usable {
                return Some(kind);
            }
            candidate = kind.next_lower();
        }
        None
    }

    fn refresh_capabilities(&self) -> BackendCapabilities {
        let fresh = self.probe.probe(&self.backends);
        let changed = self.capabilities.send_if_modified(|current| {
            if *current == fresh {
                false
            } else {
                *current = fresh;
                true
            }
        });
        if changed {
            info!(capabilities = %fresh, "Backend capabilities changed");
        }
        fresh
    }

    fn dispatch(self: &Arc<Self>, flight: InFlight, backend: BackendKind) {
        let inner = Arc::clone(self);
        self.runtime.spawn(inner.run_attempt(flight, backend));
    }

    // Boxed so the attempt future can spawn its successor without a
    // recursive opaque type.
    fn run_attempt(self: Arc<Self>, mut flight: InFlight, kind: BackendKind) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            flight.attempts += 1;
            let id = flight.task.id();
            let attempt = flight.attempts;
            self.pending.insert(
                id,
                TaskState::Dispatched {
                    backend: kind,
                    attempt,
                },
            );

            debug!(
                task = %id,
                backend = %kind,
                attempt,
                elements = flight.elements,
                "Dispatching attempt"
            );

            let started = Instant::now();
            let outcome = self.execute_on(kind, &flight.task).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(output) => self.complete(flight, kind, elapsed, output),
                Err(err) => self.fail(flight, kind, elapsed, err),
            }
        })
    }

    async fn execute_on(&self, kind: BackendKind, task: &ComputeTask) -> Result<Vec<f32>, BackendError> {
        let backend = self
            .backends
            .get(kind)
            .filter(|b| b.is_available())
            .ok_or_else(|| BackendError::unavailable(kind, "backend became unavailable"))?;

        let deadline = self.config.attempt_timeout;
        let output = tokio::time::timeout(
            deadline,
            backend.execute(task.shared_payload(), *task.params(), task.stride()),
        )
        .await
        .map_err(|_| BackendError::Timeout {
            backend: kind,
            timeout: deadline,
        })??;

        if output.len() != task.payload().len() {
            return Err(BackendError::failed(
                kind,
                format!(
                    "returned {} values, expected {}",
                    output.len(),
                    task.payload().len()
                ),
            ));
        }
        Ok(output)
    }

    fn complete(&self, flight: InFlight, kind: BackendKind, elapsed: Duration, output: Vec<f32>) {
        let id = flight.task.id();
        self.pending.remove(&id);
        self.metrics.record(PerformanceSample::completed(
            kind,
            flight.elements,
            flight.task.stride(),
            elapsed,
            flight.queue_depth,
        ));

        debug!(
            task = %id,
            backend = %kind,
            attempts = flight.attempts,
            elapsed_ms = format!("{:.2}", elapsed.as_secs_f64() * 1000.0),
            "Task completed"
        );

        let result = ComputeResult {
            task_id: id,
            output,
            processing_time: elapsed,
            backend: kind,
            elements: flight.elements,
            attempts: flight.attempts,
        };
        // The caller may have dropped its handle
        let _ = flight.reply.send(Ok(result));
    }

    fn fail(self: &Arc<Self>, flight: InFlight, kind: BackendKind, elapsed: Duration, err: BackendError) {
        let id = flight.task.id();

        if err.is_timeout() {
            warn!(task = %id, backend = %kind, attempt = flight.attempts, "Attempt timed out");
        } else {
            warn!(task = %id, backend = %kind, attempt = flight.attempts, error = %err, "Attempt failed");
        }

        if err.is_device_lost() {
            self.refresh_capabilities();
        }

        self.pending.insert(
            id,
            TaskState::Failed {
                backend: kind,
                attempt: flight.attempts,
            },
        );

        if self.shutdown.is_cancelled() {
            self.pending.remove(&id);
            let _ = flight.reply.send(Err(ComputeError::ShuttingDown));
            return;
        }

        let caps = *self.capabilities.borrow();
        match kind.next_lower().and_then(|lower| self.resolve(lower, &caps)) {
            Some(next) => {
                warn!(task = %id, from = %kind, to = %next, "Falling back");
                self.dispatch(flight, next);
            }
            None => self.exhaust(flight, kind, elapsed, err),
        }
    }

    fn exhaust(&self, flight: InFlight, kind: BackendKind, elapsed: Duration, err: BackendError) {
        let id = flight.task.id();
        self.pending.remove(&id);
        self.metrics.record(PerformanceSample::failed(
            kind,
            flight.elements,
            flight.task.stride(),
            elapsed,
            flight.queue_depth,
        ));

        error!(
            task = %id,
            attempts = flight.attempts,
            last_error = %err,
            "Task exhausted all backends"
        );

        let _ = flight.reply.send(Err(ComputeError::ExhaustedFallback {
            task_id: id,
            attempts: flight.attempts,
            last_error: err,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::capabilities::StaticProbe;
    use crate::compute::kernel;
    use crate::compute::policy::Priority;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend that records calls and either runs the kernel or fails.
    struct FakeBackend {
        kind: BackendKind,
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
        available: AtomicBool,
    }

    impl FakeBackend {
        fn ok(kind: BackendKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            })
        }

        fn failing(kind: BackendKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: true,
                delay: None,
                calls: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            })
        }

        fn slow(kind: BackendKind, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                kind,
                fail: false,
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ComputeBackend for FakeBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn units(&self) -> usize {
            2
        }

        fn execute(
            &self,
            payload: Arc<[f32]>,
            params: TaskParams,
            stride: usize,
        ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail {
                    Err(BackendError::failed(self.kind, "injected failure"))
                } else {
                    Ok(kernel::transform(&payload, &params, stride))
                }
            })
        }
    }

    fn particles(n: usize) -> Vec<f32> {
        synthetic_particles(n, 3)
    }

    fn all_caps() -> StaticProbe {
        StaticProbe(BackendCapabilities::new(true, 2, 2))
    }

    #[tokio::test]
    async fn test_build_registers_cpu_floor() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .build()
            .unwrap();
        assert_eq!(scheduler.backends(), vec![BackendKind::Cpu]);
        assert_eq!(scheduler.capabilities(), BackendCapabilities::cpu_only());
    }

    #[test]
    fn test_build_without_runtime_fails() {
        let result = ComputeScheduler::builder(SchedulerConfig::default()).build();
        assert!(matches!(result, Err(ComputeError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_zero_metrics_capacity_rejected() {
        let result = ComputeScheduler::builder(SchedulerConfig::default().with_metrics_capacity(0))
            .build();
        assert!(matches!(result, Err(ComputeError::Metrics(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_task() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .build()
            .unwrap();
        let err = scheduler
            .submit(ComputeTask::new(Vec::new(), TaskParams::default()))
            .unwrap_err();
        assert!(matches!(err, ComputeError::Validation(_)));
        assert_eq!(scheduler.pending_count(), 0);
        assert!(scheduler.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_small_task_runs_on_cpu() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .build()
            .unwrap();
        let payload = particles(10);
        let params = TaskParams::default().with_elapsed(0.5);

        let result = scheduler
            .submit(ComputeTask::new(payload.clone(), params))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Cpu);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.elements, 10);
        assert_eq!(result.output, kernel::transform(&payload, &params, PARTICLE_STRIDE));
        assert_eq!(scheduler.metrics().len(), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_one_step() {
        let gpu = FakeBackend::failing(BackendKind::Gpu);
        let native = FakeBackend::ok(BackendKind::Native);
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(gpu.clone())
            .with_backend(native.clone())
            .with_probe(all_caps())
            .build()
            .unwrap();

        let task = ComputeTask::new(particles(20_000), TaskParams::default().with_priority(Priority::High));
        let result = scheduler.submit(task).unwrap().await.unwrap();

        assert_eq!(result.backend, BackendKind::Native);
        assert_eq!(result.attempts, 2);
        assert_eq!(gpu.calls(), 1);
        assert_eq!(native.calls(), 1);

        // One sample per completed task, none for the failed attempt
        let samples = scheduler.metrics();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].backend, BackendKind::Native);
    }

    #[tokio::test]
    async fn test_unregistered_backends_are_skipped() {
        // Capabilities claim everything, only the GPU fake is registered
        let gpu = FakeBackend::failing(BackendKind::Gpu);
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(gpu.clone())
            .with_probe(all_caps())
            .build()
            .unwrap();

        let task = ComputeTask::new(particles(60_000), TaskParams::default());
        let result = scheduler.submit(task).unwrap().await.unwrap();

        assert_eq!(result.backend, BackendKind::Cpu);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausted_fallback_reports_error_and_one_sample() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(FakeBackend::failing(BackendKind::Gpu))
            .with_backend(FakeBackend::failing(BackendKind::Native))
            .with_backend(FakeBackend::failing(BackendKind::WorkerPool))
            .with_backend(FakeBackend::failing(BackendKind::Cpu))
            .with_probe(all_caps())
            .build()
            .unwrap();

        let task = ComputeTask::new(particles(60_000), TaskParams::default());
        let id = task.id();
        let err = scheduler.submit(task).unwrap().await.unwrap_err();

        match err {
            ComputeError::ExhaustedFallback {
                task_id,
                attempts,
                last_error,
            } => {
                assert_eq!(task_id, id);
                assert_eq!(attempts, 4);
                assert_eq!(last_error.backend(), BackendKind::Cpu);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let samples = scheduler.metrics();
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].succeeded);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_triggers_fallback() {
        let slow = FakeBackend::slow(BackendKind::Native, Duration::from_secs(60));
        let scheduler = ComputeScheduler::builder(
            SchedulerConfig::default().with_attempt_timeout(Duration::from_millis(100)),
        )
        .with_backend(slow.clone())
        .with_probe(StaticProbe(BackendCapabilities::new(false, 2, 0)))
        .build()
        .unwrap();

        let task = ComputeTask::new(particles(10_000), TaskParams::default());
        let result = scheduler.submit(task).unwrap().await.unwrap();

        assert_eq!(slow.calls(), 1);
        assert_eq!(result.backend, BackendKind::Cpu);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_unavailable_backend_skipped_at_selection() {
        let native = FakeBackend::ok(BackendKind::Native);
        native.available.store(false, Ordering::SeqCst);
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(native.clone())
            .with_probe(StaticProbe(BackendCapabilities::new(false, 2, 0)))
            .build()
            .unwrap();

        let result = scheduler
            .submit(ComputeTask::new(particles(10_000), TaskParams::default()))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(native.calls(), 0);
        assert_eq!(result.backend, BackendKind::Cpu);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_task_state_tracks_dispatch() {
        let slow = FakeBackend::slow(BackendKind::Native, Duration::from_millis(200));
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(slow)
            .with_probe(StaticProbe(BackendCapabilities::new(false, 2, 0)))
            .build()
            .unwrap();

        let handle = scheduler
            .submit(ComputeTask::new(particles(10_000), TaskParams::default()))
            .unwrap();
        let id = handle.id();
        assert!(scheduler.task_state(id).is_some());

        handle.await.unwrap();
        assert_eq!(scheduler.task_state(id), None);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_tasks() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .build()
            .unwrap();
        scheduler.shutdown();
        assert!(scheduler.is_shutdown());

        let err = scheduler
            .submit(ComputeTask::new(particles(1), TaskParams::default()))
            .unwrap_err();
        assert_eq!(err, ComputeError::ShuttingDown);
    }

    #[tokio::test]
    async fn test_wait_for_backend_times_out() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .build()
            .unwrap();

        assert!(scheduler.wait_for_backend(BackendKind::Cpu, Duration::from_millis(10)).await);
        assert!(
            !scheduler
                .wait_for_backend(BackendKind::Gpu, Duration::from_millis(20))
                .await
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_recovered_backend() {
        let native = FakeBackend::ok(BackendKind::Native);
        native.available.store(false, Ordering::SeqCst);
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(native.clone())
            .build()
            .unwrap();
        assert!(!scheduler.capabilities().native_concurrency);

        let waiter = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                scheduler
                    .wait_for_backend(BackendKind::Native, Duration::from_secs(5))
                    .await
            })
        };

        native.available.store(true, Ordering::SeqCst);
        let caps = scheduler.refresh_capabilities();

        assert!(caps.native_concurrency);
        assert_eq!(caps.native_threads, 2);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_benchmark_covers_available_backends() {
        let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
            .with_backend(FakeBackend::ok(BackendKind::Native))
            .with_backend(FakeBackend::failing(BackendKind::WorkerPool))
            .build()
            .unwrap();

        let report = scheduler.benchmark(500).await;

        let kinds: Vec<_> = report.entries.iter().map(|e| e.backend).collect();
        assert_eq!(
            kinds,
            vec![BackendKind::Native, BackendKind::WorkerPool, BackendKind::Cpu]
        );
        assert!(report.get(BackendKind::WorkerPool).unwrap().outcome.is_err());
        assert!(report.fastest().is_some());
        assert!(scheduler.metrics().is_empty());
    }
}
