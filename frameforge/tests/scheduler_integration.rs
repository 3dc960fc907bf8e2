//! End-to-end tests for the compute scheduler.
//!
//! Backends are fakes where a scenario needs a capability the test machine
//! may not have (a GPU), and real where outputs are compared.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use frameforge::compute::backends::{CpuBackend, NativeBackend, WorkerPoolBackend};
use frameforge::compute::{
    kernel, synthetic_particles, AnimationMode, BackendCapabilities, BackendError, BackendKind,
    BoxFuture, ComputeBackend, ComputeError, ComputeScheduler, ComputeTask, Priority,
    SchedulerConfig, StaticProbe, TaskParams, PARTICLE_STRIDE,
};
use frameforge::quality::{QualityAdvisory, QualityConfig, QualityController};
use futures::future::join_all;

struct ScriptedBackend {
    kind: BackendKind,
    fail: bool,
    /// Fail only tasks with an odd element count.
    fail_odd: bool,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn ok(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: false,
            fail_odd: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: true,
            fail_odd: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing_odd(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: false,
            fail_odd: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ComputeBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind = self.kind;
        let fail = self.fail || (self.fail_odd && (payload.len() / stride) % 2 == 1);
        Box::pin(async move {
            if fail {
                Err(BackendError::failed(kind, "scripted failure"))
            } else {
                Ok(kernel::transform(&payload, &params, stride))
            }
        })
    }
}

fn high_priority(elements: usize) -> ComputeTask {
    ComputeTask::new(
        synthetic_particles(elements, 11),
        TaskParams::default().with_priority(Priority::High),
    )
}

#[tokio::test]
async fn test_large_high_priority_task_runs_on_gpu() {
    let gpu = ScriptedBackend::ok(BackendKind::Gpu);
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_backend(gpu.clone())
        .with_backend(ScriptedBackend::ok(BackendKind::Native))
        .with_backend(ScriptedBackend::ok(BackendKind::WorkerPool))
        .with_probe(StaticProbe(BackendCapabilities::new(true, 8, 4)))
        .build()
        .unwrap();

    let result = scheduler.submit(high_priority(200_000)).unwrap().await.unwrap();

    assert_eq!(result.backend, BackendKind::Gpu);
    assert_eq!(result.elements, 200_000);
    assert_eq!(result.attempts, 1);
    assert_eq!(gpu.calls(), 1);
}

#[tokio::test]
async fn test_worker_pool_when_no_gpu_or_native() {
    let workers = ScriptedBackend::ok(BackendKind::WorkerPool);
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_backend(workers.clone())
        .with_probe(StaticProbe(BackendCapabilities::new(false, 0, 4)))
        .build()
        .unwrap();

    let result = scheduler.submit(high_priority(200_000)).unwrap().await.unwrap();

    assert_eq!(result.backend, BackendKind::WorkerPool);
    assert_eq!(workers.calls(), 1);
}

#[tokio::test]
async fn test_failures_walk_down_one_step_at_a_time() {
    let gpu = ScriptedBackend::failing(BackendKind::Gpu);
    let native = ScriptedBackend::failing(BackendKind::Native);
    let workers = ScriptedBackend::ok(BackendKind::WorkerPool);
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_backend(gpu.clone())
        .with_backend(native.clone())
        .with_backend(workers.clone())
        .with_probe(StaticProbe(BackendCapabilities::new(true, 8, 4)))
        .build()
        .unwrap();

    let task = high_priority(60_000);
    let expected = kernel::transform(task.payload(), task.params(), PARTICLE_STRIDE);
    let result = scheduler.submit(task).unwrap().await.unwrap();

    assert_eq!(result.backend, BackendKind::WorkerPool);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.output, expected);
    assert_eq!((gpu.calls(), native.calls(), workers.calls()), (1, 1, 1));

    let samples = scheduler.metrics();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].succeeded);
    assert_eq!(samples[0].backend, BackendKind::WorkerPool);
    assert_eq!(scheduler.pending_count(), 0);
}

#[tokio::test]
async fn test_exhaustion_is_surfaced_once() {
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_backend(ScriptedBackend::failing(BackendKind::Native))
        .with_backend(ScriptedBackend::failing(BackendKind::Cpu))
        .with_probe(StaticProbe(BackendCapabilities::new(false, 4, 0)))
        .build()
        .unwrap();

    let handle = scheduler.submit(high_priority(20_000)).unwrap();
    let id = handle.id();
    let err = handle.await.unwrap_err();

    match err {
        ComputeError::ExhaustedFallback {
            task_id,
            attempts,
            last_error,
        } => {
            assert_eq!(task_id, id);
            assert_eq!(attempts, 2);
            assert_eq!(last_error.backend(), BackendKind::Cpu);
        }
        other => panic!("expected exhaustion, got {}", other),
    }

    let samples = scheduler.metrics();
    assert_eq!(samples.len(), 1);
    assert!(!samples[0].succeeded);
    assert!(scheduler.task_state(id).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_each_resolve_once() {
    const TASKS: usize = 200;

    let native = ScriptedBackend::failing(BackendKind::Native);
    let cpu = ScriptedBackend::failing_odd(BackendKind::Cpu);
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default().with_metrics_capacity(256))
        .with_backend(native.clone())
        .with_backend(cpu.clone())
        .with_probe(StaticProbe(BackendCapabilities::new(false, 4, 0)))
        .build()
        .unwrap();

    // Every task fails on native; the CPU floor rejects odd element counts
    let handles: Vec<_> = (0..TASKS)
        .map(|i| scheduler.submit(high_priority(2_000 + i)).unwrap())
        .collect();
    let ids: Vec<_> = handles.iter().map(|h| h.id()).collect();
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), TASKS);

    let outcomes = join_all(handles).await;
    assert_eq!(outcomes.len(), TASKS);

    let mut succeeded = 0;
    let mut exhausted = 0;
    for (i, (id, outcome)) in ids.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(result) => {
                assert_eq!(result.task_id, *id);
                assert_eq!(result.backend, BackendKind::Cpu);
                assert_eq!(result.attempts, 2);
                assert_eq!((2_000 + i) % 2, 0);
                succeeded += 1;
            }
            Err(ComputeError::ExhaustedFallback {
                task_id, attempts, ..
            }) => {
                assert_eq!(task_id, *id);
                assert_eq!(attempts, 2);
                assert_eq!((2_000 + i) % 2, 1);
                exhausted += 1;
            }
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!((succeeded, exhausted), (TASKS / 2, TASKS / 2));

    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!((native.calls(), cpu.calls()), (TASKS, TASKS));

    let summary = scheduler.metrics_summary();
    assert_eq!(summary.total_recorded, TASKS as u64);
    assert_eq!(summary.samples, TASKS);
    assert_eq!(summary.failures, TASKS / 2);
}

#[tokio::test]
async fn test_invalid_tasks_rejected_before_dispatch() {
    let cpu = ScriptedBackend::ok(BackendKind::Cpu);
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_backend(cpu.clone())
        .build()
        .unwrap();

    let empty = ComputeTask::new(Vec::new(), TaskParams::default());
    assert!(matches!(
        scheduler.submit(empty),
        Err(ComputeError::Validation(_))
    ));

    let misaligned = ComputeTask::new(vec![0.0; 15], TaskParams::default());
    assert!(matches!(
        scheduler.submit(misaligned),
        Err(ComputeError::Validation(_))
    ));

    assert_eq!(cpu.calls(), 0);
    assert!(scheduler.metrics().is_empty());
}

#[tokio::test]
async fn test_cpu_native_and_worker_outputs_are_identical() {
    let payload: Arc<[f32]> = synthetic_particles(12_345, 5).into();
    let params = TaskParams::default()
        .with_mode(AnimationMode::Galaxy)
        .with_elapsed(3.5);

    let cpu = CpuBackend::new()
        .execute(Arc::clone(&payload), params, PARTICLE_STRIDE)
        .await
        .unwrap();
    let native = NativeBackend::new(3)
        .unwrap()
        .execute(Arc::clone(&payload), params, PARTICLE_STRIDE)
        .await
        .unwrap();
    let workers = WorkerPoolBackend::new(4)
        .execute(Arc::clone(&payload), params, PARTICLE_STRIDE)
        .await
        .unwrap();

    assert_eq!(cpu, native);
    assert_eq!(cpu, workers);
}

#[tokio::test]
async fn test_readiness_wait_times_out_cleanly() {
    let scheduler = ComputeScheduler::builder(SchedulerConfig::default())
        .with_probe(StaticProbe(BackendCapabilities::cpu_only()))
        .build()
        .unwrap();

    assert!(scheduler.wait_for_backend(BackendKind::Cpu, Duration::from_millis(10)).await);
    assert!(!scheduler.wait_for_backend(BackendKind::Gpu, Duration::from_millis(20)).await);
}

#[tokio::test]
async fn test_default_backends_feed_quality_controller() {
    let scheduler = ComputeScheduler::with_default_backends(
        SchedulerConfig::default()
            .with_gpu(false)
            .with_native_threads(2)
            .with_worker_count(2),
    )
    .unwrap();

    let controller = QualityController::new(
        scheduler.metrics_handle(),
        QualityConfig::default().with_sample_window(5),
    )
    .unwrap();

    for frame in 0..5 {
        let task = ComputeTask::new(
            synthetic_particles(2_000, frame),
            TaskParams::default().with_elapsed(frame as f32 / 60.0),
        );
        let result = scheduler.submit(task).unwrap().await.unwrap();
        assert_eq!(result.output.len(), 2_000 * PARTICLE_STRIDE);
        if frame < 4 {
            assert_eq!(controller.tick(), None);
        }
    }

    assert_eq!(scheduler.metrics_summary().samples, 5);
    // Whatever the machine speed, a full window is evaluated
    let _advisory: Option<QualityAdvisory> = controller.tick();
    assert_eq!(controller.evaluated_ticks(), 1);
}

#[tokio::test]
async fn test_benchmark_covers_registered_backends() {
    let scheduler = ComputeScheduler::with_default_backends(
        SchedulerConfig::default()
            .with_gpu(false)
            .with_native_threads(2)
            .with_worker_count(2),
    )
    .unwrap();

    let report = scheduler.benchmark(5_000).await;

    assert!(report.get(BackendKind::Cpu).is_some());
    assert!(report.fastest().is_some());
    assert!(scheduler.metrics().is_empty());
}
