//! Task and result types.
//!
//! A [`ComputeTask`] is a dense `f32` buffer of fixed-stride elements plus the
//! parameters the kernel needs. The default element is one particle:
//!
//! ```text
//! offset: 0  1  2  3   4   5   6      7          8     9
//!         x  y  z  vx  vy  vz  phase  intensity  type  id
//! ```
//!
//! Strides wider than [`PARTICLE_STRIDE`] are allowed; trailing values are
//! carried through untouched.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::ValidationError;
use super::policy::{BackendKind, Priority};

/// Number of `f32` values per particle.
pub const PARTICLE_STRIDE: usize = 10;

/// Default frame delta (60 FPS).
pub const DEFAULT_DELTA_TIME: f32 = 1.0 / 60.0;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocate a fresh process-wide id.
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw value. Intended for tests and log correlation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Particle animation applied by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationMode {
    /// Small sinusoidal wander around the current position.
    #[default]
    Drift,
    /// Rotation about the Y axis, faster for brighter particles.
    Galaxy,
    /// Vertical displacement from two travelling waves.
    Wave,
    /// Uniform rotation about the Y axis with a vertical bob.
    Spiral,
}

impl AnimationMode {
    /// Numeric code shared with the GPU shader.
    pub fn code(self) -> u32 {
        match self {
            AnimationMode::Drift => 0,
            AnimationMode::Galaxy => 1,
            AnimationMode::Wave => 2,
            AnimationMode::Spiral => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(AnimationMode::Drift),
            1 => Some(AnimationMode::Galaxy),
            2 => Some(AnimationMode::Wave),
            3 => Some(AnimationMode::Spiral),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnimationMode::Drift => "drift",
            AnimationMode::Galaxy => "galaxy",
            AnimationMode::Wave => "wave",
            AnimationMode::Spiral => "spiral",
        }
    }
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drift" => Ok(AnimationMode::Drift),
            "galaxy" => Ok(AnimationMode::Galaxy),
            "wave" => Ok(AnimationMode::Wave),
            "spiral" => Ok(AnimationMode::Spiral),
            other => Err(format!("unknown animation mode '{}'", other)),
        }
    }
}

/// Per-task kernel parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskParams {
    /// Seconds since the previous frame. Used to derive velocities.
    pub delta_time: f32,
    /// Seconds since the simulation started. Drives the animation phase.
    pub elapsed: f32,
    pub mode: AnimationMode,
    pub priority: Priority,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            delta_time: DEFAULT_DELTA_TIME,
            elapsed: 0.0,
            mode: AnimationMode::default(),
            priority: Priority::default(),
        }
    }
}

impl TaskParams {
    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    pub fn with_elapsed(mut self, elapsed: f32) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn with_mode(mut self, mode: AnimationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A unit of numeric work.
#[derive(Debug, Clone)]
pub struct ComputeTask {
    id: TaskId,
    payload: Arc<[f32]>,
    stride: usize,
    params: TaskParams,
}

impl ComputeTask {
    /// Create a particle task with a fresh id and the default stride.
    pub fn new(payload: Vec<f32>, params: TaskParams) -> Self {
        Self {
            id: TaskId::next(),
            payload: payload.into(),
            stride: PARTICLE_STRIDE,
            params,
        }
    }

    /// Override the element stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn payload(&self) -> &[f32] {
        &self.payload
    }

    pub(crate) fn shared_payload(&self) -> Arc<[f32]> {
        Arc::clone(&self.payload)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn params(&self) -> &TaskParams {
        &self.params
    }

    pub fn priority(&self) -> Priority {
        self.params.priority
    }

    /// Number of elements, or zero if the stride is zero.
    pub fn element_count(&self) -> usize {
        self.payload.len().checked_div(self.stride).unwrap_or(0)
    }

    /// Check the task shape and parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stride == 0 {
            return Err(ValidationError::ZeroStride);
        }
        if self.stride < PARTICLE_STRIDE {
            return Err(ValidationError::StrideTooSmall {
                stride: self.stride,
                required: PARTICLE_STRIDE,
            });
        }
        if self.payload.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        if self.payload.len() % self.stride != 0 {
            return Err(ValidationError::MisalignedPayload {
                len: self.payload.len(),
                stride: self.stride,
            });
        }
        if !self.params.delta_time.is_finite() {
            return Err(ValidationError::NonFiniteParam {
                name: "delta_time",
                value: self.params.delta_time,
            });
        }
        if !self.params.elapsed.is_finite() {
            return Err(ValidationError::NonFiniteParam {
                name: "elapsed",
                value: self.params.elapsed,
            });
        }
        Ok(())
    }
}

/// Output of a completed task.
#[derive(Debug, Clone)]
pub struct ComputeResult {
    pub task_id: TaskId,
    /// Transformed buffer, same stride as the input.
    pub output: Vec<f32>,
    /// Wall time of the successful attempt.
    pub processing_time: Duration,
    pub backend: BackendKind,
    pub elements: usize,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}
