//! Level-of-detail management.
//!
//! Assigns each tracked entity a detail level from its distance to the
//! camera and keeps visible/culled partitions current on a self-tuned tick.
//!
//! # Example
//!
//! ```
//! use frameforge::lod::{EntityId, LodConfig, LodEntity, LodManager, Vec3};
//!
//! let lod = LodManager::new(LodConfig::from_thresholds(vec![50.0, 100.0, 200.0]).unwrap());
//! lod.track(LodEntity::new(EntityId(1), "tree", Vec3::new(75.0, 0.0, 0.0)));
//! lod.track(LodEntity::new(EntityId(2), "tree", Vec3::new(250.0, 0.0, 0.0)));
//! lod.tick();
//!
//! assert_eq!(lod.entity(EntityId(1)).unwrap().current_lod, 1);
//! assert_eq!(lod.culled_count(), 1);
//! ```

mod config;
mod entity;
mod error;
mod manager;
mod stats;

pub use config::{
    LodConfig, LodHint, DEFAULT_COMPRESSION, DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL,
    DEFAULT_POLYGON_COUNTS, DEFAULT_TEXTURE_SIZES, DEFAULT_THRESHOLDS, DEFAULT_UPDATE_INTERVAL,
};
pub use entity::{EntityId, LodEntity, Vec3};
pub use error::LodConfigError;
pub use manager::{
    LodChangeEvent, LodManager, SyncReport, TickOutcome, RENDER_BUDGET, RENDER_HEADROOM,
};
pub use stats::LodStats;
