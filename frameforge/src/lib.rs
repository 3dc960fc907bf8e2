//! FrameForge - per-frame compute routing and level-of-detail culling
//!
//! This library distributes large, repeated numeric workloads (particle state
//! updates) across heterogeneous compute backends and maintains
//! distance-based detail levels for tracked entities.
//!
//! # Components
//!
//! - [`compute`] - task scheduler, backend selection, fallback chain
//! - [`metrics`] - bounded ring of recent performance samples
//! - [`quality`] - adaptive workload advisories from task latency
//! - [`lod`] - per-entity detail levels with a self-tuned tick
//! - [`world`] - upstream entity positions
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup
//!
//! The scheduler and the LOD manager are independent; a render loop typically
//! feeds both from the same particle payload.

pub mod clock;
pub mod compute;
pub mod config;
pub mod lod;
pub mod logging;
pub mod metrics;
pub mod quality;
pub mod world;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
