//! Aggregate visibility counters.

use std::fmt;

/// Counters recomputed at the end of every LOD tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LodStats {
    pub total_entities: usize,
    /// Entities with a level below the culled level.
    pub visible: usize,
    pub culled: usize,
    /// Mean level over visible entities, 0 when none are visible.
    pub average_visible_level: f64,
    /// Level changes in the most recent tick.
    pub last_changes: usize,
    /// Ticks that did work since construction.
    pub updates: u64,
}

impl LodStats {
    /// Fraction of tracked entities that are culled.
    pub fn culled_ratio(&self) -> f64 {
        if self.total_entities == 0 {
            0.0
        } else {
            self.culled as f64 / self.total_entities as f64
        }
    }
}

impl fmt::Display for LodStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entities: {} visible, {} culled, avg level {:.2}",
            self.total_entities, self.visible, self.culled, self.average_visible_level
        )
    }
}
