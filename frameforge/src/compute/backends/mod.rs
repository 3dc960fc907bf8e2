//! Built-in [`ComputeBackend`](super::ComputeBackend) implementations.
//!
//! | Backend               | Execution                          | Feature |
//! |-----------------------|------------------------------------|---------|
//! | [`GpuBackend`]        | wgpu compute shader                | `gpu`   |
//! | [`NativeBackend`]     | rayon thread pool                  |         |
//! | [`WorkerPoolBackend`] | semaphore-bounded blocking workers |         |
//! | [`CpuBackend`]        | inline, same task                  |         |

mod cpu;
#[cfg(feature = "gpu")]
mod gpu;
mod native;
mod worker_pool;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;
pub use native::NativeBackend;
pub use worker_pool::{WorkerPoolBackend, MIN_CHUNK_ELEMENTS};
