//! LOD manager scenarios driven through the public API.

use std::sync::Arc;
use std::time::Duration;

use frameforge::clock::ManualClock;
use frameforge::compute::{synthetic_particles, PARTICLE_STRIDE};
use frameforge::lod::{EntityId, LodConfig, LodEntity, LodManager, TickOutcome, Vec3};
use frameforge::world::positions_from_payload;
use proptest::prelude::*;

fn manager_with_clock(config: LodConfig) -> (LodManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (LodManager::with_clock(config, clock.clone()), clock)
}

#[test]
fn test_three_threshold_scenario() {
    let config = LodConfig::from_thresholds(vec![50.0, 100.0, 200.0]).unwrap();
    let (lod, _) = manager_with_clock(config);

    lod.set_camera_position(Vec3::new(10.0, 0.0, 10.0));
    lod.track(LodEntity::new(EntityId(1), "npc", Vec3::new(10.0, 0.0, 85.0)));
    lod.track(LodEntity::new(EntityId(2), "npc", Vec3::new(260.0, 0.0, 10.0)));
    lod.tick();

    assert_eq!(lod.entity(EntityId(1)).unwrap().current_lod, 1);
    assert_eq!(lod.entity(EntityId(2)).unwrap().current_lod, 3);
    assert_eq!(lod.visible_count(), 1);
    assert_eq!(lod.culled_count(), 1);
    assert!(lod.config().hint(3).is_none());
}

#[test]
fn test_boundary_distance_is_inclusive() {
    let config = LodConfig::from_thresholds(vec![50.0, 100.0, 200.0]).unwrap();
    let (lod, _) = manager_with_clock(config);

    lod.track(LodEntity::new(EntityId(1), "npc", Vec3::new(0.0, 100.0, 0.0)));
    lod.track(LodEntity::new(EntityId(2), "npc", Vec3::new(0.0, 200.0, 0.0)));
    lod.tick();

    assert_eq!(lod.entity(EntityId(1)).unwrap().current_lod, 1);
    assert_eq!(lod.entity(EntityId(2)).unwrap().current_lod, 2);
}

#[tokio::test]
async fn test_camera_sweep_emits_change_events() {
    let (lod, clock) = manager_with_clock(LodConfig::default());
    let mut events = lod.subscribe();

    for i in 0..10u64 {
        lod.track(LodEntity::new(EntityId(i), "tree", Vec3::new(i as f32 * 30.0, 0.0, 0.0)));
    }
    lod.tick();

    // Move the camera to the far end of the row
    lod.set_camera_position(Vec3::new(270.0, 0.0, 0.0));
    clock.advance(lod.update_interval());
    let TickOutcome::Updated { changes } = lod.tick() else {
        panic!("tick should run after the interval elapsed");
    };

    let mut received = 0;
    while let Ok(event) = events.try_recv() {
        assert_ne!(event.old_level, event.new_level);
        assert_eq!(
            lod.entity(event.entity_id).unwrap().current_lod,
            event.new_level
        );
        received += 1;
    }
    assert!(changes > 0);
    assert_eq!(received, changes);
}

#[test]
fn test_payload_positions_drive_tracking() {
    let payload = synthetic_particles(500, 21);
    let positions = positions_from_payload(&payload, PARTICLE_STRIDE, "particle").unwrap();
    let (lod, _) = manager_with_clock(LodConfig::from_thresholds(vec![10.0, 25.0, 40.0]).unwrap());

    let report = lod.sync_positions(&positions);
    assert_eq!(report.tracked, 500);
    assert_eq!(report.updated, 0);

    lod.tick();
    let stats = lod.stats();
    assert_eq!(stats.total_entities, 500);
    assert_eq!(stats.visible + stats.culled, 500);
    assert_eq!(lod.entities_by_type("particle").len(), 500);

    let again = lod.sync_positions(&positions);
    assert_eq!(again.updated, 500);
    assert_eq!(again.tracked, 0);
}

#[test]
fn test_interval_tuning_clamps_at_both_ends() {
    let config = LodConfig::default()
        .with_intervals(
            Duration::from_millis(100),
            Duration::from_millis(20),
            Duration::from_millis(300),
        )
        .unwrap();
    let (lod, _) = manager_with_clock(config);

    for _ in 0..20 {
        lod.optimize_for_performance(Duration::from_millis(30));
    }
    assert_eq!(lod.update_interval(), Duration::from_millis(300));

    for _ in 0..40 {
        lod.optimize_for_performance(Duration::from_millis(2));
    }
    assert_eq!(lod.update_interval(), Duration::from_millis(20));
}

#[derive(Debug, Clone)]
enum Op {
    Track(u64, f32),
    Untrack(u64),
    Move(u64, f32),
    Camera(f32),
    Tick,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20, 0.0f32..600.0).prop_map(|(id, x)| Op::Track(id, x)),
        (0u64..20).prop_map(Op::Untrack),
        (0u64..20, 0.0f32..600.0).prop_map(|(id, x)| Op::Move(id, x)),
        (0.0f32..600.0).prop_map(Op::Camera),
        Just(Op::Tick),
    ]
}

proptest! {
    #[test]
    fn prop_distribution_sums_to_entity_count(ops in prop::collection::vec(op(), 1..60)) {
        let (lod, clock) = manager_with_clock(LodConfig::default());

        for op in ops {
            match op {
                Op::Track(id, x) => {
                    lod.track(LodEntity::new(EntityId(id), "npc", Vec3::new(x, 0.0, 0.0)));
                }
                Op::Untrack(id) => {
                    lod.untrack(EntityId(id));
                }
                Op::Move(id, x) => {
                    lod.update_position(EntityId(id), Vec3::new(x, 0.0, 0.0));
                }
                Op::Camera(x) => lod.set_camera_position(Vec3::new(x, 0.0, 0.0)),
                Op::Tick => {
                    clock.advance(Duration::from_millis(100));
                    lod.tick();
                }
            }

            let distribution = lod.distribution();
            prop_assert_eq!(distribution.values().sum::<usize>(), lod.entity_count());
            prop_assert_eq!(lod.visible_count() + lod.culled_count(), lod.entity_count());
        }
    }
}
