//! LOD manager: distance-bucketed detail levels with a self-paced tick.
//!
//! ```text
//!  track / untrack / update_position        set_camera_position
//!               │                                  │
//!               ▼                                  ▼
//!        ┌─────────────────────────────────────────────────┐
//!        │ entities: HashMap<EntityId, LodEntity>   camera │
//!        └─────────────────────────────────────────────────┘
//!                              │ tick() once per update interval
//!                              ▼
//!       level = first threshold >= |position - camera|  (N = culled)
//!                              │
//!               ┌──────────────┴───────────────┐
//!               ▼                              ▼
//!     LodChangeEvent per change          LodStats recomputed
//!   (unbounded channel per subscriber)
//! ```
//!
//! The update interval tunes itself from render-time samples passed to
//! [`LodManager::optimize_for_performance`], bounded by the configured floor
//! and ceiling.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::LodConfig;
use super::entity::{EntityId, LodEntity, Vec3};
use super::stats::LodStats;
use crate::clock::{SharedClock, SystemClock};
use crate::world::PositionSource;

/// Render time above which the update interval backs off (60 FPS budget).
pub const RENDER_BUDGET: Duration = Duration::from_micros(16_667);

/// Render time below which the update interval tightens (120 FPS).
pub const RENDER_HEADROOM: Duration = Duration::from_micros(8_333);

const SLOW_FRAME_FACTOR: f64 = 1.5;
const FAST_FRAME_FACTOR: f64 = 0.8;

// Suggestion triggers
const MANY_VISIBLE: usize = 500;
const MANY_FULL_DETAIL: usize = 100;

/// An entity moved to a different detail level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodChangeEvent {
    pub entity_id: EntityId,
    pub old_level: usize,
    pub new_level: usize,
}

/// Result of [`LodManager::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The update interval has not elapsed. Nothing was recomputed.
    Skipped { remaining: Duration },
    /// Every entity was recomputed.
    Updated { changes: usize },
}

impl TickOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, TickOutcome::Updated { .. })
    }
}

/// Result of [`LodManager::sync_positions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Known entities whose position was replaced.
    pub updated: usize,
    /// Entities seen for the first time and now tracked.
    pub tracked: usize,
}

struct LodState {
    entities: HashMap<EntityId, LodEntity>,
    camera: Vec3,
    update_interval: Duration,
    last_tick: Option<Instant>,
    stats: LodStats,
}

/// Maintains one [`LodEntity`] per tracked id.
///
/// All methods take `&self`; share the manager behind an `Arc` to track from
/// one task while another drives [`run`](LodManager::run).
pub struct LodManager {
    config: LodConfig,
    clock: SharedClock,
    state: RwLock<LodState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LodChangeEvent>>>,
}

impl LodManager {
    pub fn new(config: LodConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager that reads time from `clock`.
    pub fn with_clock(config: LodConfig, clock: SharedClock) -> Self {
        let state = LodState {
            entities: HashMap::new(),
            camera: Vec3::ZERO,
            update_interval: config.update_interval(),
            last_tick: None,
            stats: LodStats::default(),
        };
        Self {
            config,
            clock,
            state: RwLock::new(state),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    // =========================================================================
    // Tracking
    // =========================================================================

    /// Start tracking `entity`, replacing any entity with the same id.
    ///
    /// The initial level is computed against the current camera. No change
    /// event is emitted for it.
    pub fn track(&self, mut entity: LodEntity) -> Option<LodEntity> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let level = self.config.level_for(entity.position.distance(state.camera));
        entity.set_level(level, now);
        state.entities.insert(entity.id, entity)
    }

    pub fn untrack(&self, id: EntityId) -> Option<LodEntity> {
        self.state.write().entities.remove(&id)
    }

    /// Move a tracked entity. The level is recomputed on the next tick.
    ///
    /// Returns `false` if `id` is not tracked.
    pub fn update_position(&self, id: EntityId, position: Vec3) -> bool {
        match self.state.write().entities.get_mut(&id) {
            Some(entity) => {
                entity.position = position;
                true
            }
            None => false,
        }
    }

    /// Move the camera. Levels are recomputed on the next tick.
    pub fn set_camera_position(&self, position: Vec3) {
        self.state.write().camera = position;
    }

    pub fn camera_position(&self) -> Vec3 {
        self.state.read().camera
    }

    /// Apply an upstream position snapshot.
    ///
    /// Known entities get their position replaced; unknown ones are tracked.
    /// Entities missing from the snapshot are left alone.
    pub fn sync_positions(&self, source: &dyn PositionSource) -> SyncReport {
        let snapshot = source.snapshot();
        let now = self.clock.now();
        let mut report = SyncReport::default();

        let mut state = self.state.write();
        let camera = state.camera;
        for entry in snapshot {
            match state.entities.get_mut(&entry.id) {
                Some(entity) => {
                    entity.position = entry.position;
                    report.updated += 1;
                }
                None => {
                    let mut entity = LodEntity::new(entry.id, entry.entity_type, entry.position);
                    let level = self.config.level_for(entry.position.distance(camera));
                    entity.set_level(level, now);
                    state.entities.insert(entry.id, entity);
                    report.tracked += 1;
                }
            }
        }

        debug!(
            updated = report.updated,
            tracked = report.tracked,
            "Synced entity positions"
        );
        report
    }

    // =========================================================================
    // Tick loop
    // =========================================================================

    /// Recompute every entity's level if the update interval has elapsed.
    ///
    /// The first call always does work.
    pub fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let mut state = self.state.write();

        if let Some(last) = state.last_tick {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < state.update_interval {
                return TickOutcome::Skipped {
                    remaining: state.update_interval - elapsed,
                };
            }
        }

        let culled_level = self.config.culled_level();
        let camera = state.camera;
        let mut changes = Vec::new();
        let mut visible = 0usize;
        let mut level_sum = 0usize;

        for entity in state.entities.values_mut() {
            let level = self.config.level_for(entity.position.distance(camera));
            if level != entity.current_lod {
                changes.push(LodChangeEvent {
                    entity_id: entity.id,
                    old_level: entity.current_lod,
                    new_level: level,
                });
            }
            entity.set_level(level, now);

            if level < culled_level {
                visible += 1;
                level_sum += level;
            }
        }

        let total = state.entities.len();
        state.stats = LodStats {
            total_entities: total,
            visible,
            culled: total - visible,
            average_visible_level: if visible > 0 {
                level_sum as f64 / visible as f64
            } else {
                0.0
            },
            last_changes: changes.len(),
            updates: state.stats.updates + 1,
        };
        state.last_tick = Some(now);
        drop(state);

        if !changes.is_empty() {
            debug!(changes = changes.len(), entities = total, "LOD levels changed");
        }
        self.publish(&changes);

        TickOutcome::Updated {
            changes: changes.len(),
        }
    }

    /// Tune the update interval from one render-time sample.
    ///
    /// Over budget backs off by 1.5x up to the ceiling; well under budget
    /// tightens by 0.8x down to the floor. Returns the resulting interval.
    pub fn optimize_for_performance(&self, render_time: Duration) -> Duration {
        let mut state = self.state.write();
        let current = state.update_interval;

        let next = if render_time > RENDER_BUDGET {
            current
                .mul_f64(SLOW_FRAME_FACTOR)
                .min(self.config.max_interval())
        } else if render_time < RENDER_HEADROOM {
            current
                .mul_f64(FAST_FRAME_FACTOR)
                .max(self.config.min_interval())
        } else {
            current
        };

        if next != current {
            debug!(
                render_ms = format!("{:.2}", render_time.as_secs_f64() * 1000.0),
                from_ms = current.as_millis() as u64,
                to_ms = next.as_millis() as u64,
                "LOD update interval adjusted"
            );
            state.update_interval = next;
        }
        next
    }

    pub fn update_interval(&self) -> Duration {
        self.state.read().update_interval
    }

    /// Call [`tick`](Self::tick) once per `frame_period` until `shutdown` fires.
    pub async fn run(&self, frame_period: Duration, shutdown: CancellationToken) {
        let mut frames = tokio::time::interval(frame_period.max(Duration::from_millis(1)));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            frame_ms = frame_period.as_millis() as u64,
            entities = self.entity_count(),
            "LOD tick loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("LOD tick loop shutting down");
                    break;
                }

                _ = frames.tick() => {
                    self.tick();
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Receive every level change from now on.
    ///
    /// Each subscriber gets its own unbounded queue, so a slow reader never
    /// misses a change. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LodChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, changes: &[LodChangeEvent]) {
        if changes.is_empty() {
            return;
        }
        self.subscribers
            .lock()
            .retain(|tx| changes.iter().all(|event| tx.send(*event).is_ok()));
    }

    /// Counters from the most recent tick that did work.
    ///
    /// This is a snapshot: `track`, `untrack` and position changes are not
    /// reflected until the next tick. Use [`visible_count`](Self::visible_count)
    /// and [`culled_count`](Self::culled_count) for live counts.
    pub fn stats(&self) -> LodStats {
        self.state.read().stats
    }

    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    /// Entities currently below the culled level.
    pub fn visible_count(&self) -> usize {
        let culled_level = self.config.culled_level();
        self.count_where(|e| e.current_lod < culled_level)
    }

    pub fn culled_count(&self) -> usize {
        let culled_level = self.config.culled_level();
        self.count_where(|e| e.current_lod >= culled_level)
    }

    pub fn entity(&self, id: EntityId) -> Option<LodEntity> {
        self.state.read().entities.get(&id).cloned()
    }

    pub fn entities_by_type(&self, entity_type: &str) -> Vec<LodEntity> {
        self.collect_where(|e| e.entity_type == entity_type)
    }

    pub fn entities_at_level(&self, level: usize) -> Vec<LodEntity> {
        self.collect_where(|e| e.current_lod == level)
    }

    pub fn visible_entities(&self) -> Vec<LodEntity> {
        let culled_level = self.config.culled_level();
        self.collect_where(|e| e.current_lod < culled_level)
    }

    pub fn culled_entities(&self) -> Vec<LodEntity> {
        let culled_level = self.config.culled_level();
        self.collect_where(|e| e.current_lod >= culled_level)
    }

    /// Entity count per level, including empty levels and the culled level.
    ///
    /// Always sums to [`entity_count`](Self::entity_count).
    pub fn distribution(&self) -> BTreeMap<usize, usize> {
        let mut histogram: BTreeMap<usize, usize> =
            (0..=self.config.culled_level()).map(|level| (level, 0)).collect();
        for entity in self.state.read().entities.values() {
            *histogram.entry(entity.current_lod).or_insert(0) += 1;
        }
        histogram
    }

    /// Human-readable tuning hints for diagnostics.
    pub fn optimization_suggestions(&self) -> Vec<String> {
        let state = self.state.read();
        let total = state.entities.len();
        if total == 0 {
            return Vec::new();
        }

        let culled_level = self.config.culled_level();
        let culled = state
            .entities
            .values()
            .filter(|e| e.current_lod >= culled_level)
            .count();
        let full_detail = state
            .entities
            .values()
            .filter(|e| e.current_lod == 0)
            .count();
        let visible = total - culled;

        let mut suggestions = Vec::new();
        if culled * 2 > total {
            let last = self.config.thresholds()[self.config.level_count() - 1];
            suggestions.push(format!(
                "{} of {} entities are culled; untrack distant entities or raise the cull distance ({:.0})",
                culled, total, last
            ));
        }
        if visible > MANY_VISIBLE {
            suggestions.push(format!(
                "{} entities are visible; tighten LOD thresholds to cut draw work",
                visible
            ));
        }
        if full_detail > MANY_FULL_DETAIL {
            suggestions.push(format!(
                "{} entities render at full detail; lower the level 0 distance ({:.0})",
                full_detail,
                self.config.thresholds()[0]
            ));
        }
        if state.update_interval >= self.config.max_interval() {
            suggestions.push(format!(
                "LOD update interval is at its ceiling ({}ms); frames are over budget",
                state.update_interval.as_millis()
            ));
        }
        suggestions
    }

    fn count_where(&self, pred: impl Fn(&LodEntity) -> bool) -> usize {
        self.state.read().entities.values().filter(|e| pred(*e)).count()
    }

    fn collect_where(&self, pred: impl Fn(&LodEntity) -> bool) -> Vec<LodEntity> {
        let mut entities: Vec<LodEntity> = self
            .state
            .read()
            .entities
            .values()
            .filter(|e| pred(*e))
            .cloned()
            .collect();
        entities.sort_by_key(|e| e.id);
        entities
    }
}

impl fmt::Debug for LodManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("LodManager")
            .field("entities", &state.entities.len())
            .field("camera", &state.camera)
            .field("update_interval", &state.update_interval)
            .field("stats", &state.stats)
            .finish()
    }
}
