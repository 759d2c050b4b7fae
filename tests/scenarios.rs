//! End-to-end scenarios with literal values, one test function per
//! scenario, named after what it checks rather than a letter.

use glam::DVec2;
use substep::prelude::*;

mod common;

fn ground(world: &mut World, center_y: f64) {
    world
        .add_box_collider(DVec2::new(0.0, center_y), DVec2::X, DVec2::new(20.0, 0.5))
        .unwrap();
}

#[test]
fn rigid_box_falls_and_rests_on_ground() {
    common::init_tracing();
    let mut world = World::new();
    ground(&mut world, -2.0);
    let body = world
        .add_rigid_body(
            DVec2::new(0.0, 0.5),
            0.0,
            2.0,
            1.0,
            &[CircleGeom {
                local_offset: DVec2::ZERO,
                radius: 0.5,
            }],
        )
        .unwrap();

    let config = SimulationConfig {
        dt: 1.0 / 240.0,
        substeps: 1,
        ..SimulationConfig::default()
    };
    let mut stepper = Stepper::new();
    for _ in 0..(5 * 240) {
        stepper.step(&mut world, &config);
    }

    let state = world.body_state(body);
    assert!(
        (-1.2..=-0.8).contains(&state.center.y),
        "center.y={}",
        state.center.y
    );
    assert!(state.velocity.length() < 0.1, "speed={}", state.velocity.length());
}

#[test]
fn l_shape_angle_constraint_holds_target_under_gravity() {
    common::init_tracing();
    let mut world = World::new();
    ground(&mut world, -2.0);
    let p0 = world.add_particle(DVec2::new(-1.0, 5.0), 1.0, 0.05).unwrap();
    let p1 = world.add_particle(DVec2::new(0.0, 5.0), 1.0, 0.05).unwrap();
    let p2 = world.add_particle(DVec2::new(0.0, 6.0), 1.0, 0.05).unwrap();
    world.add_rod(p0, p1, 1.0, None).unwrap();
    world.add_rod(p1, p2, 1.0, None).unwrap();
    // Measured as the signed angle from (p2 - p1) to (p0 - p1), which is
    // already +pi/2 for this L-shaped initial configuration.
    world
        .add_angle(p2, p1, p0, std::f64::consts::FRAC_PI_2, None)
        .unwrap();

    let config = SimulationConfig {
        dt: 1.0 / 60.0,
        xpbd_iterations: 40,
        ..SimulationConfig::default()
    };
    let mut stepper = Stepper::new();
    for _ in 0..300 {
        stepper.step(&mut world, &config);
    }

    let u = world.particle_position(p2) - world.particle_position(p1);
    let v = world.particle_position(p0) - world.particle_position(p1);
    let angle = substep::math::signed_angle(u, v);
    assert!(
        (angle - std::f64::consts::FRAC_PI_2).abs() < 0.1,
        "angle={angle}"
    );
}

#[test]
fn revolute_joint_pulls_two_falling_boxes_anchors_together() {
    common::init_tracing();
    let mut world = World::new();
    ground(&mut world, -5.0);
    let geoms = [CircleGeom {
        local_offset: DVec2::ZERO,
        radius: 0.5,
    }];
    let a = world
        .add_rigid_body(DVec2::new(-0.6, 2.0), 0.0, 1.0, 1.0, &geoms)
        .unwrap();
    let b = world
        .add_rigid_body(DVec2::new(0.6, 2.0), 0.0, 1.0, 1.0, &geoms)
        .unwrap();
    world
        .add_revolute_joint(
            a,
            b,
            DVec2::new(0.5, 0.0),
            DVec2::new(-0.5, 0.0),
            None,
            None,
        )
        .unwrap();

    let config = SimulationConfig::default();
    let mut stepper = Stepper::new();
    for _ in 0..(3 * 240) {
        stepper.step(&mut world, &config);
    }

    let state_a = world.body_state(a);
    let state_b = world.body_state(b);
    let anchor_a = state_a.center + substep::math::rotate(DVec2::new(0.5, 0.0), state_a.angle);
    let anchor_b = state_b.center + substep::math::rotate(DVec2::new(-0.5, 0.0), state_b.angle);
    let separation = (anchor_b - anchor_a).length();
    assert!(separation < 0.01, "separation={separation}");
}

#[test]
fn warm_started_resting_box_stays_slow_once_settled() {
    common::init_tracing();
    let mut world = World::new();
    ground(&mut world, -2.0);
    let body = world
        .add_rigid_body(
            DVec2::new(0.0, 0.5),
            0.0,
            2.0,
            1.0,
            &[CircleGeom {
                local_offset: DVec2::ZERO,
                radius: 0.5,
            }],
        )
        .unwrap();

    let config = SimulationConfig::default();
    let mut stepper = Stepper::new();
    // The box falls from y=0.5 to its resting height around y=-1.0, which
    // takes about 0.55s under gravity; only measure once it has had time
    // to land and the contact solver has warm-started to a steady state.
    let mut max_speed_after_settling: f64 = 0.0;
    for step in 0..(5 * 240) {
        stepper.step(&mut world, &config);
        if step as f64 / 240.0 >= 2.0 {
            let speed = world.body_state(body).velocity.length();
            max_speed_after_settling = max_speed_after_settling.max(speed);
        }
    }
    assert!(
        max_speed_after_settling < 0.1,
        "max_speed_after_settling={max_speed_after_settling}"
    );
}

fn rocket_template() -> World {
    let mut world = World::new();
    world
        .add_rigid_body(
            DVec2::new(0.0, 10.0),
            0.0,
            1.0,
            1.0,
            &[CircleGeom {
                local_offset: DVec2::ZERO,
                radius: 0.3,
            }],
        )
        .unwrap();
    world
}

#[test]
fn batched_reset_with_same_seed_reproduces_trajectory() {
    common::init_tracing();
    let template = rocket_template();
    let config = SimulationConfig::default();
    let body = BodyId(0);

    let run = |batch: &mut BatchedWorld| {
        batch.randomize(42, 0, |_, world, rng| {
            let dx = rng.uniform(-0.2, 0.2);
            world.nudge_body(BodyId(0), DVec2::new(dx, 0.0));
        });
        for _ in 0..50 {
            batch.batched_step(&config);
        }
        (0..batch.n_worlds())
            .map(|i| batch.world(i).body_state(body).center)
            .collect::<Vec<_>>()
    };

    let mut batch = BatchedWorld::from_template(&template, Colliders::default(), 4);
    let first = run(&mut batch);
    batch.reset_from_template(&template);
    let second = run(&mut batch);

    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn batched_worlds_stay_isolated_except_the_perturbed_one() {
    common::init_tracing();
    let template = rocket_template();
    let config = SimulationConfig::default();
    let body = BodyId(0);
    let mut batch = BatchedWorld::from_template(&template, Colliders::default(), 5);

    for i in 1..batch.n_worlds() {
        assert_eq!(
            batch.world(0).body_state(body).center,
            batch.world(i).body_state(body).center
        );
    }

    batch.world_mut(2).nudge_body(body, DVec2::new(0.1, 0.0));

    for _ in 0..100 {
        batch.batched_step(&config);
    }

    for i in [0usize, 1, 3, 4] {
        let diff = (batch.world(0).body_state(body).center - batch.world(i).body_state(body).center).length();
        assert!(diff < 1e-4, "world {i} diverged without perturbation: {diff}");
    }
}
