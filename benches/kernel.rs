//! Performance benchmarks for VORTEX ARENA

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use vortex_arena::arena::wander_intents;
use vortex_arena::collision::index_segments;
use vortex_arena::hazard::find_fair_anchor;
use vortex_arena::query::WorldView;
use vortex_arena::safe_zone::{ShrinkEvent, ShrinkPlan};
use vortex_arena::{Agent, Arena, Bounds, Cell, CollisionResolver, Config, Direction, ItemKind, SpatialIndex};

fn scattered_agents(count: u32, rng: &mut ChaCha8Rng) -> Vec<Agent> {
    (0..count)
        .map(|i| {
            let head = Cell::new(rng.gen_range(5..35), rng.gen_range(5..25));
            Agent::new(i, format!("agent-{}", i), head, Direction::Right, 5, 0)
        })
        .collect()
}

fn benchmark_spatial_query(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut index = SpatialIndex::new(2);
    for _ in 0..2000 {
        index.insert(Cell::new(rng.gen_range(0..40), rng.gen_range(0..30)), ItemKind::Food);
    }

    let mut group = c.benchmark_group("spatial_query");
    for radius in [0, 2, 5].iter() {
        group.bench_with_input(BenchmarkId::new("radius", radius), radius, |b, &r| {
            b.iter(|| index.query_near(black_box(Cell::new(20, 15)), r, None));
        });
    }
    group.finish();

    let ids: Vec<_> = (0..500)
        .map(|_| index.insert(Cell::new(rng.gen_range(0..40), rng.gen_range(0..30)), ItemKind::Segment))
        .collect();
    c.bench_function("spatial_update", |b| {
        let mut step = 0;
        b.iter(|| {
            step += 1;
            for (i, id) in ids.iter().enumerate() {
                index.update(*id, Cell::new((i as i32 + step) % 40, (i as i32 * 7 + step) % 30));
            }
        });
    });
}

fn benchmark_collision_pass(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut group = c.benchmark_group("collision_pass");

    for count in [4u32, 16, 32].iter() {
        let agents = scattered_agents(*count, &mut rng);
        let mut index = SpatialIndex::new(2);
        index_segments(&mut index, &agents);
        let resolver = CollisionResolver::new(40, 30);
        let live: Vec<&Agent> = agents.iter().collect();

        group.bench_with_input(BenchmarkId::new("agents", count), count, |b, _| {
            b.iter(|| resolver.detect_collisions(black_box(&live), &agents, &index, None));
        });
    }
    group.finish();
}

fn benchmark_fair_placement(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let agents = scattered_agents(8, &mut rng);
    let mut index = SpatialIndex::new(2);
    index_segments(&mut index, &agents);
    let view = WorldView::new(&agents, &index);

    c.bench_function("fair_placement_40x30", |b| {
        b.iter(|| find_fair_anchor(black_box(&view), 40, 30, 2, 0.2));
    });
}

fn benchmark_shrink_frames(c: &mut Criterion) {
    let event = ShrinkEvent {
        start_tick: 81,
        duration: 20,
        target_width: 34,
        target_height: 26,
    };
    let plan = ShrinkPlan::new(Bounds::full(40, 30), &event);

    c.bench_function("shrink_frames", |b| {
        b.iter(|| (0..=20).map(|e| plan.bounds_at(black_box(e)).area()).sum::<i64>());
    });
}

fn benchmark_arena_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_step");

    for count in [4usize, 12].iter() {
        let mut config = Config::default();
        config.hazard.trigger_start_tick = 0;
        let mut arena = Arena::new(config);
        for i in 0..*count {
            arena.spawn_agent(format!("agent-{}", i));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        group.bench_with_input(BenchmarkId::new("agents", count), count, |b, _| {
            b.iter(|| {
                if arena.live_count() == 0 {
                    arena.restart();
                    for i in 0..*count {
                        arena.spawn_agent(format!("agent-{}", i));
                    }
                }
                let intents = wander_intents(&arena, &mut rng);
                arena.step(&intents)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_spatial_query,
    benchmark_collision_pass,
    benchmark_fair_placement,
    benchmark_shrink_frames,
    benchmark_arena_step,
);
criterion_main!(benches);
