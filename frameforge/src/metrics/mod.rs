//! Bounded performance history.
//!
//! ```text
//! attempt completes ──► PerformanceSample ──► SharedMetrics ──► snapshot / summary
//!                                             (RwLock<MetricsRing>)      │
//!                                                                        ▼
//!                                                               QualityController
//! ```

mod ring;
mod sample;
mod shared;

pub use ring::{MetricsError, MetricsRing, DEFAULT_RING_CAPACITY};
pub use sample::PerformanceSample;
pub use shared::{MetricsSummary, SharedMetrics};
