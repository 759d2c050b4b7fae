use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec2;
use rand::Rng;
use substep::prelude::*;

fn chain_world(num_particles: usize) -> World {
    let mut world = World::new();
    world
        .add_box_collider(DVec2::new(0.0, -5.0), DVec2::X, DVec2::new(50.0, 1.0))
        .unwrap();
    let mut rng = rand::thread_rng();
    let mut prev = world.add_pinned_particle(DVec2::new(0.0, 5.0), 0.1).unwrap();
    for k in 1..num_particles {
        let p = world
            .add_particle(
                DVec2::new(k as f64 * 0.2, 5.0 + rng.gen_range(-0.05..0.05)),
                1.0,
                0.1,
            )
            .unwrap();
        world.add_rod(prev, p, 0.2, None).unwrap();
        prev = p;
    }
    world
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("substep");
    let config = SimulationConfig::default();
    for num_particles in [16, 64, 256, 1024] {
        let initial_world = chain_world(num_particles);
        group.bench_with_input(
            BenchmarkId::new("chain of rods", num_particles),
            &num_particles,
            |b, _| {
                b.iter(|| {
                    let mut world = initial_world.clone();
                    let mut stepper = Stepper::new();
                    stepper.step(&mut world, black_box(&config));
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
