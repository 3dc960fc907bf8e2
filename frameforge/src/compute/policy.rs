//! Backend selection policy.
//!
//! This module defines which backend a task runs on first and where it goes
//! when that backend fails.
//!
//! # Policy Types
//!
//! - [`BackendKind`]: The four execution strategies, ordered fastest-first
//! - [`Priority`]: Caller-assigned task importance
//! - [`SelectionThresholds`]: Size floors (in elements) for each backend
//!
//! # Selection Order
//!
//! [`select_backend`] evaluates these rules in order and returns the first
//! match. Sizes are element counts and every comparison is strict.
//!
//! | Rule | Priority | Size        | Requires      | Backend      |
//! |------|----------|-------------|---------------|--------------|
//! | 1    | High     | > gpu_high  | GPU           | `Gpu`        |
//! | 2    | High     | > native_high | native      | `Native`     |
//! | 3    | any      | > large     | GPU           | `Gpu`        |
//! | 4    | any      | > medium    | native        | `Native`     |
//! | 5    | any      | > small     | workers > 0   | `WorkerPool` |
//! | 6    | any      | any         | -             | `Cpu`        |
//!
//! # Example
//!
//! ```
//! use frameforge::compute::{select_backend, BackendCapabilities, BackendKind,
//!     Priority, SelectionThresholds};
//!
//! let caps = BackendCapabilities::new(true, 8, 4);
//! let thresholds = SelectionThresholds::default();
//!
//! let kind = select_backend(200_000, Priority::High, &caps, &thresholds);
//! assert_eq!(kind, BackendKind::Gpu);
//! ```

use std::fmt;
use std::str::FromStr;

use super::capabilities::BackendCapabilities;

// =============================================================================
// Threshold Constants
// =============================================================================

/// Elements above which high-priority work goes to the GPU.
pub const DEFAULT_GPU_HIGH_PRIORITY_THRESHOLD: usize = 10_000;

/// Elements above which high-priority work goes to native threads.
pub const DEFAULT_NATIVE_HIGH_PRIORITY_THRESHOLD: usize = 1_000;

/// Elements above which any work goes to the GPU.
pub const DEFAULT_LARGE_THRESHOLD: usize = 50_000;

/// Elements above which any work goes to native threads.
pub const DEFAULT_MEDIUM_THRESHOLD: usize = 5_000;

/// Elements above which any work goes to the worker pool.
pub const DEFAULT_SMALL_THRESHOLD: usize = 1_000;

// =============================================================================
// Backend Kind
// =============================================================================

/// An execution strategy for compute tasks.
///
/// Variants are declared in fallback order: a failing backend hands the task
/// to the next variant below it that is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// GPU compute shader.
    Gpu,
    /// Work-stealing native thread pool.
    Native,
    /// Bounded pool of background workers.
    WorkerPool,
    /// Same-thread reference implementation. Never unavailable.
    Cpu,
}

impl BackendKind {
    /// All backends, fastest first.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Gpu,
        BackendKind::Native,
        BackendKind::WorkerPool,
        BackendKind::Cpu,
    ];

    /// The next backend down the fallback chain, or `None` at the floor.
    pub fn next_lower(self) -> Option<BackendKind> {
        match self {
            BackendKind::Gpu => Some(BackendKind::Native),
            BackendKind::Native => Some(BackendKind::WorkerPool),
            BackendKind::WorkerPool => Some(BackendKind::Cpu),
            BackendKind::Cpu => None,
        }
    }

    /// Short lowercase name used in logs, config and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Gpu => "gpu",
            BackendKind::Native => "native",
            BackendKind::WorkerPool => "worker",
            BackendKind::Cpu => "cpu",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(BackendKind::Gpu),
            "native" => Ok(BackendKind::Native),
            "worker" | "workers" | "worker-pool" | "worker_pool" => Ok(BackendKind::WorkerPool),
            "cpu" => Ok(BackendKind::Cpu),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Task importance, used only by backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    /// Latency-sensitive work. Qualifies for accelerated backends at a
    /// lower size floor.
    High,
    /// Regular per-frame work.
    #[default]
    Normal,
    /// Background work.
    Low,
}

impl Priority {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// One step less important, saturating at `Low`.
    pub fn lowered(self) -> Priority {
        match self {
            Priority::High => Priority::Normal,
            Priority::Normal | Priority::Low => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

// =============================================================================
// Selection Thresholds
// =============================================================================

/// Size floors for backend selection, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionThresholds {
    /// Rule 1: high priority above this goes to the GPU.
    pub gpu_high_priority: usize,
    /// Rule 2: high priority above this goes to native threads.
    pub native_high_priority: usize,
    /// Rule 3: anything above this goes to the GPU.
    pub large: usize,
    /// Rule 4: anything above this goes to native threads.
    pub medium: usize,
    /// Rule 5: anything above this goes to the worker pool.
    pub small: usize,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            gpu_high_priority: DEFAULT_GPU_HIGH_PRIORITY_THRESHOLD,
            native_high_priority: DEFAULT_NATIVE_HIGH_PRIORITY_THRESHOLD,
            large: DEFAULT_LARGE_THRESHOLD,
            medium: DEFAULT_MEDIUM_THRESHOLD,
            small: DEFAULT_SMALL_THRESHOLD,
        }
    }
}

impl SelectionThresholds {
    pub fn with_gpu_high_priority(mut self, elements: usize) -> Self {
        self.gpu_high_priority = elements;
        self
    }

    pub fn with_native_high_priority(mut self, elements: usize) -> Self {
        self.native_high_priority = elements;
        self
    }

    pub fn with_large(mut self, elements: usize) -> Self {
        self.large = elements;
        self
    }

    pub fn with_medium(mut self, elements: usize) -> Self {
        self.medium = elements;
        self
    }

    pub fn with_small(mut self, elements: usize) -> Self {
        self.small = elements;
        self
    }
}

/// Choose the first backend for a task.
///
/// Pure function of its inputs. See the module docs for the rule table.
pub fn select_backend(
    elements: usize,
    priority: Priority,
    capabilities: &BackendCapabilities,
    thresholds: &SelectionThresholds,
) -> BackendKind {
    let high = priority == Priority::High;

    if high && capabilities.gpu_compute && elements > thresholds.gpu_high_priority {
        return BackendKind::Gpu;
    }
    if high && capabilities.native_concurrency && elements > thresholds.native_high_priority {
        return BackendKind::Native;
    }
    if elements > thresholds.large && capabilities.gpu_compute {
        return BackendKind::Gpu;
    }
    if elements > thresholds.medium && capabilities.native_concurrency {
        return BackendKind::Native;
    }
    if elements > thresholds.small && capabilities.worker_pool && capabilities.worker_count > 0 {
        return BackendKind::WorkerPool;
    }
    BackendKind::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all_caps() -> BackendCapabilities {
        BackendCapabilities::new(true, 8, 4)
    }

    #[test]
    fn test_fallback_chain_is_strictly_downward() {
        assert_eq!(BackendKind::Gpu.next_lower(), Some(BackendKind::Native));
        assert_eq!(BackendKind::Native.next_lower(), Some(BackendKind::WorkerPool));
        assert_eq!(BackendKind::WorkerPool.next_lower(), Some(BackendKind::Cpu));
        assert_eq!(BackendKind::Cpu.next_lower(), None);

        for kind in BackendKind::ALL {
            if let Some(lower) = kind.next_lower() {
                assert!(lower > kind);
            }
        }
    }

    #[test]
    fn test_backend_kind_parse_roundtrip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
        assert!("tpu".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_lowered_saturates() {
        assert_eq!(Priority::High.lowered(), Priority::Normal);
        assert_eq!(Priority::Normal.lowered(), Priority::Low);
        assert_eq!(Priority::Low.lowered(), Priority::Low);
    }

    #[test]
    fn test_rule_1_high_priority_gpu() {
        let kind = select_backend(
            200_000,
            Priority::High,
            &all_caps(),
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Gpu);
    }

    #[test]
    fn test_rule_2_high_priority_native() {
        // Above the native floor, below the GPU floor
        let kind = select_backend(
            5_000,
            Priority::High,
            &all_caps(),
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Native);
    }

    #[test]
    fn test_rule_3_large_goes_to_gpu() {
        let kind = select_backend(
            60_000,
            Priority::Normal,
            &all_caps(),
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Gpu);
    }

    #[test]
    fn test_rule_4_medium_goes_to_native() {
        let kind = select_backend(
            20_000,
            Priority::Low,
            &all_caps(),
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Native);
    }

    #[test]
    fn test_rule_5_workers_when_nothing_accelerated() {
        let caps = BackendCapabilities::new(false, 0, 4);
        let kind = select_backend(
            200_000,
            Priority::High,
            &caps,
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::WorkerPool);
    }

    #[test]
    fn test_rule_5_requires_nonempty_pool() {
        let caps = BackendCapabilities::new(false, 0, 0);
        let kind = select_backend(
            200_000,
            Priority::High,
            &caps,
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Cpu);
    }

    #[test]
    fn test_rule_6_small_stays_on_cpu() {
        let kind = select_backend(
            500,
            Priority::High,
            &all_caps(),
            &SelectionThresholds::default(),
        );
        assert_eq!(kind, BackendKind::Cpu);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let t = SelectionThresholds::default();
        let caps = all_caps();

        assert_eq!(
            select_backend(t.large, Priority::Normal, &caps, &t),
            BackendKind::Native
        );
        assert_eq!(
            select_backend(t.large + 1, Priority::Normal, &caps, &t),
            BackendKind::Gpu
        );
        assert_eq!(
            select_backend(t.small, Priority::Normal, &caps, &t),
            BackendKind::Cpu
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let t = SelectionThresholds::default().with_small(10).with_medium(100);
        let caps = BackendCapabilities::new(false, 0, 2);

        assert_eq!(
            select_backend(11, Priority::Normal, &caps, &t),
            BackendKind::WorkerPool
        );
    }

    fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::High),
            Just(Priority::Normal),
            Just(Priority::Low)
        ]
    }

    fn arb_caps() -> impl Strategy<Value = BackendCapabilities> {
        (any::<bool>(), 0usize..16, 0usize..16)
            .prop_map(|(gpu, threads, workers)| BackendCapabilities::new(gpu, threads, workers))
    }

    proptest! {
        /// Same inputs always select the same backend.
        #[test]
        fn prop_selection_is_deterministic(
            elements in 0usize..1_000_000,
            priority in arb_priority(),
            caps in arb_caps()
        ) {
            let t = SelectionThresholds::default();
            let first = select_backend(elements, priority, &caps, &t);
            let second = select_backend(elements, priority, &caps, &t);
            prop_assert_eq!(first, second);
        }

        /// Selection never picks a backend the capabilities rule out.
        #[test]
        fn prop_selection_respects_capabilities(
            elements in 0usize..1_000_000,
            priority in arb_priority(),
            caps in arb_caps()
        ) {
            let kind = select_backend(elements, priority, &caps, &SelectionThresholds::default());
            prop_assert!(caps.supports(kind));
        }
    }
}
