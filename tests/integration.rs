//! Integration tests for VORTEX ARENA

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::mpsc;
use vortex_arena::arena::wander_intents;
use vortex_arena::collision::index_segments;
use vortex_arena::hazard::{find_fair_anchor, rank_candidates, HazardConfig, HazardGeometry};
use vortex_arena::query::WorldView;
use vortex_arena::safe_zone::{SafeZoneConfig, ShrinkEvent, ShrinkPlan};
use vortex_arena::snapshot::{FrameLog, StatusFrame};
use vortex_arena::{
    Agent, Arena, Bounds, Cell, CollisionEvent, CollisionResolver, Config, Direction, HazardField, HazardState,
    ItemKind, KernelEvent, NullSink, SafeZoneScheduler, SpatialIndex, ZoneType,
};

#[test]
fn test_full_match_cycle() {
    let mut config = Config::default();
    config.hazard.trigger_start_tick = 20;
    let mut arena = Arena::new(config);
    for i in 0..6 {
        arena.spawn_agent(format!("agent-{}", i));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let mut last_area = arena.safe_zone().current_bounds().area();
    for _ in 0..300 {
        let intents = wander_intents(&arena, &mut rng);
        let report = arena.step(&intents);

        // At most one fatal event per agent across both passes
        let mut fatal = std::collections::HashSet::new();
        for event in report.first_pass.iter().chain(&report.second_pass) {
            if event.is_fatal() {
                assert!(fatal.insert(event.agent()));
            }
        }

        let area = arena.safe_zone().current_bounds().area();
        assert!(area <= last_area);
        last_area = area;

        for agent in arena.agents().iter().filter(|a| a.is_active()) {
            assert!(agent.is_valid());
            assert!(arena.safe_zone().is_position_safe(agent.head()));
        }
    }
    assert_eq!(arena.tick(), 300);
}

#[test]
fn test_reproducibility() {
    let play = |seed: u64| {
        let mut config = Config::default();
        config.arena.seed = seed;
        config.hazard.trigger_start_tick = 10;
        let mut arena = Arena::new(config);
        for i in 0..5 {
            arena.spawn_agent(format!("agent-{}", i));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut frames = Vec::new();
        for _ in 0..150 {
            frames.push(StatusFrame::capture(&arena));
            let intents = wander_intents(&arena, &mut rng);
            arena.step(&intents);
        }
        let scores: Vec<i32> = arena.agents().iter().map(|a| a.score).collect();
        (frames, scores)
    };

    assert_eq!(play(99999), play(99999));
}

#[test]
fn test_spatial_index_has_no_false_negatives() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut index = SpatialIndex::new(3);
    let mut live = Vec::new();
    for _ in 0..300 {
        let cell = Cell::new(rng.gen_range(-5..45), rng.gen_range(-5..35));
        live.push((index.insert(cell, ItemKind::Food), cell));
    }
    // Move some, remove some
    for (id, cell) in live.iter_mut().take(100) {
        *cell = Cell::new(rng.gen_range(0..40), rng.gen_range(0..30));
        index.update(*id, *cell);
    }
    let removed: Vec<_> = live.drain(200..).collect();
    for (id, _) in &removed {
        index.remove(*id);
        index.remove(*id);
    }

    for _ in 0..50 {
        let center = Cell::new(rng.gen_range(0..40), rng.gen_range(0..30));
        let radius = rng.gen_range(0..=3);
        let found: Vec<_> = index.query_near(center, radius, None).into_iter().map(|i| i.id).collect();
        for (id, cell) in &live {
            let (dx, dy) = ((cell.x - center.x) as f64, (cell.y - center.y) as f64);
            if (dx * dx + dy * dy).sqrt() <= radius as f64 {
                assert!(found.contains(id));
            }
        }
        for (id, _) in &removed {
            assert!(!found.contains(id));
        }
    }
}

#[test]
fn test_head_to_head_shield_matrix() {
    let resolver = CollisionResolver::new(20, 20);
    for (shield_a, shield_b, expected) in [(false, false, 2), (true, false, 1), (false, true, 1), (true, true, 0)] {
        let mut a = Agent::new(1, "a", Cell::new(8, 8), Direction::Right, 3, 0);
        let mut b = Agent::new(2, "b", Cell::new(8, 8), Direction::Left, 3, 0);
        if shield_a {
            a.grant_free_shield(3);
        }
        if shield_b {
            b.grant_free_shield(3);
        }
        let agents = vec![a, b];
        let mut index = SpatialIndex::new(2);
        index_segments(&mut index, &agents);
        let live: Vec<&Agent> = agents.iter().collect();

        let events = resolver.detect_collisions(&live, &agents, &index, None);
        assert_eq!(events.len(), expected);
        for event in &events {
            let victim = &agents[(event.agent() - 1) as usize];
            assert!(!victim.is_shield_active());
            assert!(matches!(event, CollisionEvent::AgentHead { .. }));
        }
    }
}

#[test]
fn test_fair_placement_property() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let agents: Vec<Agent> = (0..5)
        .map(|i| {
            let head = Cell::new(rng.gen_range(2..38), rng.gen_range(2..28));
            Agent::new(i, format!("a{}", i), head, Direction::Up, 1, 0)
        })
        .collect();
    let index = SpatialIndex::new(2);
    let view = WorldView::new(&agents, &index);

    let chosen = find_fair_anchor(&view, 40, 30, 2, 0.2).unwrap();
    let mut ranked = rank_candidates(&view, 40, 30, 2);
    ranked.sort_by(|a, b| b.distance_sum.cmp(&a.distance_sum));
    let keep = ((ranked.len() as f64 * 0.2).floor() as usize).max(1);
    let threshold = ranked[keep - 1].distance_sum;

    assert!(chosen.distance_sum >= threshold);
    assert!(ranked[..keep]
        .iter()
        .all(|c| c.distance_variance >= chosen.distance_variance - 1e-9));
}

#[test]
fn test_lethal_classification_ignores_radii() {
    let geometry = HazardGeometry::new(Cell::new(5, 5), 2, 4, 7);
    assert_eq!(geometry.classify(Cell::new(5, 5)), ZoneType::Lethal);
    assert_eq!(geometry.classify(Cell::new(6, 6)), ZoneType::Lethal);
    assert_eq!(geometry.classify(Cell::new(4, 5)), ZoneType::InnerRing);
}

#[test]
fn test_shrink_scenario() {
    let event = ShrinkEvent {
        start_tick: 81,
        duration: 20,
        target_width: 34,
        target_height: 26,
    };
    let plan = ShrinkPlan::new(Bounds::full(40, 30), &event);
    assert_eq!(plan.bounds_at(20), Bounds::new(3, 2, 36, 27));

    let mut previous = plan.bounds_at(0).area();
    for elapsed in 0..=20 {
        let area = plan.bounds_at(elapsed).area();
        assert!(area <= previous);
        previous = area;
    }
}

#[test]
fn test_bounds_notifications_only_on_change() {
    let (tx, rx) = mpsc::channel();
    let mut zone = SafeZoneScheduler::new(&SafeZoneConfig::default(), Box::new(tx));
    let mut changes = 0;
    for tick in 0..260 {
        if zone.update(tick).is_some() {
            changes += 1;
        }
    }
    let notified: Vec<_> = rx
        .try_iter()
        .filter_map(|e| match e {
            KernelEvent::SafeZoneBoundsChanged { previous, current } => Some((previous, current)),
            _ => None,
        })
        .collect();
    assert_eq!(notified.len(), changes);
    assert!(notified.iter().all(|(p, c)| p != c && p.encloses(c)));
    assert_eq!(zone.current_bounds().width(), 16);
    assert_eq!(zone.current_bounds().height(), 12);
}

#[test]
fn test_status_round_trip_through_bytes() {
    let mut config = Config::default();
    config.arena.obstacle_count = 0;
    let mut arena = Arena::new(config);
    arena.add_agent(Agent::new(0, "a", Cell::new(30, 5), Direction::Left, 3, 0));
    arena.hazard_mut().place_at(Cell::new(10, 10));

    let mut log = FrameLog::new();
    for _ in 0..110 {
        let frame = StatusFrame::from_bytes(&StatusFrame::capture(&arena).to_bytes().unwrap()).unwrap();
        for x in 0..40 {
            for y in 0..30 {
                let cell = Cell::new(x, y);
                assert_eq!(frame.is_position_safe(cell), arena.safe_zone().is_position_safe(cell));
                assert_eq!(frame.classify(cell), arena.hazard().classify(cell));
            }
        }
        log.record(frame);
        arena.step(&HashMap::new());
    }
    assert!(log.frames.iter().any(|f| f.hazard.state() == HazardState::Active));
    assert!(log.frames.iter().any(|f| f.safe_zone.shrinking));
}

#[test]
fn test_hazard_lifecycle_events() {
    let (tx, rx) = mpsc::channel();
    let config = HazardConfig {
        trigger_start_tick: 0,
        initial_trigger_probability: 1.0,
        ..Default::default()
    };
    let mut field = HazardField::new(&config, 40, 30, Box::new(tx));
    let agents = vec![
        Agent::new(0, "a", Cell::new(3, 3), Direction::Right, 3, 0),
        Agent::new(1, "b", Cell::new(36, 26), Direction::Left, 3, 0),
    ];
    let index = SpatialIndex::new(2);
    let view = WorldView::new(&agents, &index);
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for tick in 0..60 {
        field.update(tick, &view, &mut rng);
    }
    let kinds: Vec<&'static str> = rx
        .try_iter()
        .map(|e| match e {
            KernelEvent::HazardWarning(_) => "warning",
            KernelEvent::HazardActivated { .. } => "active",
            KernelEvent::HazardDeactivated { .. } => "cooldown",
            KernelEvent::HazardCooldownEnded => "inactive",
            _ => "other",
        })
        .collect();
    assert_eq!(&kinds[..4], &["warning", "active", "cooldown", "inactive"]);
}

#[test]
fn test_config_file_roundtrip() {
    let mut config = Config::default();
    config.arena.seed = 1234;
    config.safe_zone.warning_ticks = 7;

    let path = std::env::temp_dir().join("vortex_arena_test_config.yaml");
    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.arena.seed, 1234);
    assert_eq!(loaded.safe_zone.warning_ticks, 7);
    assert_eq!(loaded.safe_zone.schedule(), config.safe_zone.schedule());

    let disabled = HazardField::new(&HazardConfig { enabled: false, ..Default::default() }, 40, 30, Box::new(NullSink));
    assert_eq!(disabled.state(), HazardState::Inactive);
}
