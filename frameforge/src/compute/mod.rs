//! Compute task routing.
//!
//! Tasks are dense `f32` buffers of fixed-stride particles. The
//! [`ComputeScheduler`] picks a backend for each task with a deterministic
//! size/priority rule, runs it under a timeout, and walks the fallback chain
//! on failure:
//!
//! ```text
//!   Gpu ──► Native ──► WorkerPool ──► Cpu
//!  (wgpu)   (rayon)    (semaphore +    (inline reference,
//!                       spawn_blocking) never unavailable)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use frameforge::compute::{ComputeScheduler, ComputeTask, SchedulerConfig, TaskParams};
//!
//! let scheduler = ComputeScheduler::with_default_backends(SchedulerConfig::default())?;
//! let handle = scheduler.submit(ComputeTask::new(particles, TaskParams::default()))?;
//! let result = handle.await?;
//! println!("{} particles on {} in {:?}", result.elements, result.backend, result.processing_time);
//! ```

mod backend;
pub mod backends;
mod benchmark;
mod capabilities;
mod config;
mod error;
mod handle;
pub mod kernel;
mod policy;
mod scheduler;
mod task;

pub use backend::{BackendSet, BoxFuture, ComputeBackend};
pub use benchmark::{synthetic_particles, BenchmarkEntry, BenchmarkReport, BENCHMARK_SEED};
pub use capabilities::{
    BackendCapabilities, CapabilityProbe, RegisteredBackendProbe, StaticProbe,
};
pub use config::{SchedulerConfig, DEFAULT_ATTEMPT_TIMEOUT};
pub use error::{BackendError, ComputeError, ValidationError};
pub use handle::TaskHandle;
pub use policy::{
    select_backend, BackendKind, Priority, SelectionThresholds,
    DEFAULT_GPU_HIGH_PRIORITY_THRESHOLD, DEFAULT_LARGE_THRESHOLD, DEFAULT_MEDIUM_THRESHOLD,
    DEFAULT_NATIVE_HIGH_PRIORITY_THRESHOLD, DEFAULT_SMALL_THRESHOLD,
};
pub use scheduler::{ComputeScheduler, ComputeSchedulerBuilder, TaskState};
pub use task::{
    AnimationMode, ComputeResult, ComputeTask, TaskId, TaskParams, DEFAULT_DELTA_TIME,
    PARTICLE_STRIDE,
};
