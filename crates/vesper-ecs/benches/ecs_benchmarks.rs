//! Component manager benchmarks.
//!
//! Measures the hot paths of dense storage: bulk creation, random removal
//! (swap-remove plus re-index), hashed lookup and dense iteration.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vesper_ecs::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Transform {
    translation: [f32; 3],
    scale: [f32; 3],
    dirty: bool,
}
impl Component for Transform {}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn populated(count: usize) -> (ComponentManager<Transform>, Vec<Entity>) {
    let mut manager = ComponentManager::with_capacity(count);
    let entities: Vec<Entity> = (0..count).map(|_| Entity::create()).collect();
    for &e in &entities {
        manager.create(e);
    }
    (manager, entities)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_create");
    for &count in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated(count)));
        });
    }
    group.finish();
}

fn bench_remove_every_other(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_remove_every_other");
    for &count in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || populated(count),
                |(mut manager, entities)| {
                    for e in entities.iter().step_by(2) {
                        manager.remove(*e);
                    }
                    black_box(manager.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_lookup_and_iterate(c: &mut Criterion) {
    let (mut manager, entities) = populated(10_000);

    c.bench_function("manager_lookup_10k", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for e in &entities {
                if manager.get(*e).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });

    c.bench_function("manager_iter_mut_10k", |b| {
        b.iter(|| {
            for (_, t) in manager.iter_mut() {
                t.translation[0] += 1.0;
                t.dirty = true;
            }
        });
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_remove_every_other,
    bench_lookup_and_iterate
);
criterion_main!(benches);
