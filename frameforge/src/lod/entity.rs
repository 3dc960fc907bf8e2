//! Tracked entities and their positions.

use std::collections::HashMap;
use std::fmt;
use std::ops::Sub;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// A point or offset in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Identifies a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One entity's detail record.
///
/// `target_lod` always mirrors `current_lod`; it is reserved for smoothing
/// level transitions over several ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct LodEntity {
    pub id: EntityId,
    pub position: Vec3,
    pub entity_type: String,
    pub current_lod: usize,
    pub target_lod: usize,
    /// When `current_lod` was last computed.
    pub last_update: Instant,
    pub properties: HashMap<String, serde_json::Value>,
}

impl LodEntity {
    /// A new entity at full detail. The manager assigns the real level when
    /// it is tracked.
    pub fn new(id: EntityId, entity_type: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            position,
            entity_type: entity_type.into(),
            current_lod: 0,
            target_lod: 0,
            last_update: Instant::now(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub(crate) fn set_level(&mut self, level: usize, now: Instant) {
        self.current_lod = level;
        self.target_lod = level;
        self.last_update = now;
    }
}
