//! Benchmarks for the per-frame CPU pipeline.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orbfield::frame::{line_position, wander_offset};
use orbfield::prelude::*;
use orbfield::shapes::generate_shapes;

const DT: f32 = 1.0 / 60.0;

/// A simulation warmed up for `warmup` ticks under `input`.
fn warmed(count: usize, input: &FrameInput, warmup: usize) -> (Simulation, f32) {
    let mut sim = Simulation::builder()
        .with_particle_count(count)
        .with_seed(7)
        .build()
        .unwrap();
    let mut t = 0.0;
    for _ in 0..warmup {
        sim.tick(input, t);
        t += DT;
    }
    (sim, t)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let scenarios = [
        ("line", FrameInput::default()),
        (
            "ring_with_events",
            FrameInput {
                onboarding_step: 2,
                form_progress: 0.4,
                spike_events: vec![
                    SpikeEvent::new("a", "mail", "Email", 0.0),
                    SpikeEvent::new("b", "calendar", "Calendar", 0.0),
                ],
                ..FrameInput::default()
            },
        ),
        (
            "shape_morph",
            FrameInput {
                onboarding_step: 4,
                assistant_name: "Nova".into(),
                ..FrameInput::default()
            },
        ),
        (
            "completion",
            FrameInput {
                onboarding_step: 6,
                is_complete: true,
                ..FrameInput::default()
            },
        ),
    ];

    for (name, input) in &scenarios {
        let (mut sim, mut t) = warmed(2000, input, 300);
        group.bench_function(*name, |b| {
            b.iter(|| {
                t += DT;
                black_box(sim.tick(black_box(input), t).len())
            })
        });
    }

    group.finish();
}

fn bench_tick_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_scaling");
    let input = FrameInput {
        onboarding_step: 3,
        ..FrameInput::default()
    };

    for count in [500, 2000, 8000] {
        let (mut sim, mut t) = warmed(count, &input, 120);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                t += DT;
                black_box(sim.tick(&input, t).len())
            })
        });
    }

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = FieldConfig::default();
    let step = config.steps.resolve(2).0.clone();

    let sim = Simulation::builder().with_seed(3).build().unwrap();
    let personalities = sim.population().personalities();
    let count = personalities.len();

    group.bench_function("line_position", |b| {
        b.iter(|| {
            for (i, p) in personalities.iter().enumerate() {
                black_box(line_position(i, count, p, black_box(1.25), &config.line));
            }
        })
    });

    group.bench_function("wander_offset", |b| {
        b.iter(|| {
            for p in personalities {
                black_box(wander_offset(p, black_box(2.5), &step));
            }
        })
    });

    group.bench_function("generate_shapes", |b| {
        b.iter(|| black_box(generate_shapes(black_box(300), config.shape_scale)))
    });

    group.finish();
}

criterion_group!(benches, bench_tick, bench_tick_scaling, bench_layout);
criterion_main!(benches);
