//! Adaptive quality control.
//!
//! A periodic feedback loop that turns recent task latency into workload
//! advisories. See [`QualityController`].

mod config;
mod controller;

pub use config::{
    QualityConfig, QualityConfigError, DEFAULT_INCREASE_RATIO, DEFAULT_REDUCE_RATIO,
    DEFAULT_SAMPLE_WINDOW, DEFAULT_TARGET_FPS, DEFAULT_TICK_INTERVAL,
};
pub use controller::{QualityAdvisory, QualityController};
