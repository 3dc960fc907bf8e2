//! Error types for the compute scheduler.
//!
//! Three layers, matching how far an error travels:
//!
//! - [`ValidationError`] is returned synchronously from `submit` and never
//!   reaches a backend.
//! - [`BackendError`] stays inside the scheduler. It drives fallback and is
//!   only visible through logs and metrics.
//! - [`ComputeError`] is what a caller awaiting a task can see.

use std::time::Duration;

use thiserror::Error;

use super::policy::BackendKind;
use super::task::TaskId;
use crate::metrics::MetricsError;

/// A malformed task, rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("stride must be greater than zero")]
    ZeroStride,

    #[error("stride {stride} is smaller than the {required}-value particle layout")]
    StrideTooSmall { stride: usize, required: usize },

    #[error("payload length {len} is not a multiple of stride {stride}")]
    MisalignedPayload { len: usize, stride: usize },

    #[error("parameter '{name}' is not finite ({value})")]
    NonFiniteParam { name: &'static str, value: f32 },
}

/// A single backend attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend cannot run work right now.
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable {
        backend: BackendKind,
        reason: String,
    },

    /// The attempt did not finish within the scheduler's deadline.
    #[error("{backend} backend timed out after {}ms", .timeout.as_millis())]
    Timeout {
        backend: BackendKind,
        timeout: Duration,
    },

    /// The GPU device was lost; capabilities must be re-probed.
    #[error("{backend} device lost: {reason}")]
    DeviceLost {
        backend: BackendKind,
        reason: String,
    },

    /// The backend cannot handle this task shape.
    #[error("{backend} backend does not support {what}")]
    Unsupported { backend: BackendKind, what: String },

    /// The backend ran and reported an error.
    #[error("{backend} backend failed: {reason}")]
    Failed {
        backend: BackendKind,
        reason: String,
    },
}

impl BackendError {
    pub fn unavailable(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend,
            reason: reason.into(),
        }
    }

    pub fn failed(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::Failed {
            backend,
            reason: reason.into(),
        }
    }

    /// The backend that produced this error.
    pub fn backend(&self) -> BackendKind {
        match self {
            BackendError::Unavailable { backend, .. }
            | BackendError::Timeout { backend, .. }
            | BackendError::DeviceLost { backend, .. }
            | BackendError::Unsupported { backend, .. }
            | BackendError::Failed { backend, .. } => *backend,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout { .. })
    }

    pub fn is_device_lost(&self) -> bool {
        matches!(self, BackendError::DeviceLost { .. })
    }
}

/// Errors surfaced to callers of the scheduler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),

    /// Every backend in the fallback chain failed, including the CPU floor.
    #[error("{task_id} exhausted all backends after {attempts} attempt(s): {last_error}")]
    ExhaustedFallback {
        task_id: TaskId,
        attempts: u32,
        last_error: BackendError,
    },

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("no tokio runtime available to run compute tasks")]
    NoRuntime,

    #[error("scheduler shut down before the task completed")]
    ShuttingDown,
}
