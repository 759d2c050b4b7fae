//! Velocity stabilization, particle friction, and global damping (§4.7).
//!
//! Runs once at the end of each substep, after both constraint solvers,
//! and is the one place the engine explicitly dissipates energy rather
//! than conserving it — the velocity-stabilization clamp exists
//! specifically to bound the kinetic energy XPBD's position corrections
//! can inject while resolving deep penetration (§7).

use crate::world::World;

/// Friction contact tolerance: a particle within this distance of a
/// collider's surface is considered "in contact" for §4.7 friction.
const FRICTION_TOLERANCE: f64 = 0.01;

/// Recompute each dynamic particle's velocity from its position delta
/// over the substep, blended with the integrated velocity by `beta`, then
/// clamp to `max_velocity` if set (`0.0` disables the clamp).
pub fn stabilize_velocities(world: &mut World, dt: f64, beta: f64, max_velocity: f64) {
    for i in 0..world.particle_pos.len() {
        if world.particle_inv_mass[i] == 0.0 {
            continue;
        }
        let v_corrected = (world.particle_pos[i] - world.particle_prev_pos[i]) / dt;
        let mut v = beta * v_corrected + (1.0 - beta) * world.particle_vel[i];

        if max_velocity > 0.0 {
            let speed = v.length();
            if speed > max_velocity {
                v *= 0.5 * max_velocity / speed;
            }
        }
        world.particle_vel[i] = v;
    }
}

/// Coulomb friction applied directly to velocity for particles resting
/// against a collider (`phi <= tolerance`), decomposed into normal and
/// tangential components with respect to the nearest collider's normal.
pub fn apply_particle_friction(world: &mut World, mu: f64) {
    for i in 0..world.particle_pos.len() {
        if world.particle_inv_mass[i] == 0.0 {
            continue;
        }
        let radius = world.particle_radius[i];
        let Some((_, _, sdf)) = world.colliders.closest(world.particle_pos[i]) else {
            continue;
        };
        if sdf.phi - radius > FRICTION_TOLERANCE {
            continue;
        }
        let n = sdf.normal;
        let v = world.particle_vel[i];
        let v_n = v.dot(n);
        let v_t_vec = v - v_n * n;
        let v_t = v_t_vec.length();
        let max_reduction = mu * v_n.abs();
        let new_v_t = if max_reduction >= v_t {
            0.0
        } else {
            v_t - max_reduction
        };
        let tangential = if v_t > 1e-12 {
            (v_t_vec / v_t) * new_v_t
        } else {
            glam::DVec2::ZERO
        };
        world.particle_vel[i] = v_n * n + tangential;
    }
}

/// Exponential-style linear/angular damping: `v *= max(0, 1 - c*dt)`.
pub fn apply_damping(world: &mut World, linear: f64, angular: f64, dt: f64) {
    let linear_factor = (1.0 - linear * dt).max(0.0);
    let angular_factor = (1.0 - angular * dt).max(0.0);

    for i in 0..world.particle_pos.len() {
        if world.particle_inv_mass[i] > 0.0 {
            world.particle_vel[i] *= linear_factor;
        }
    }
    for i in 0..world.body_center.len() {
        if world.body_inv_mass[i] > 0.0 {
            world.body_vel[i] *= linear_factor;
            world.body_omega[i] *= angular_factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;
    use glam::DVec2;

    #[test]
    fn stabilization_blends_position_delta_into_velocity() {
        let mut w = World::new();
        let id = w.add_particle(DVec2::ZERO, 1.0, 0.1).unwrap();
        w.particle_prev_pos[id.0] = DVec2::ZERO;
        w.particle_pos[id.0] = DVec2::new(0.1, 0.0);
        w.particle_vel[id.0] = DVec2::ZERO;
        stabilize_velocities(&mut w, 0.1, 1.0, 0.0);
        assert!((w.particle_vel[id.0].x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn max_velocity_clamps_to_half() {
        let mut w = World::new();
        let id = w.add_particle(DVec2::ZERO, 1.0, 0.1).unwrap();
        w.particle_prev_pos[id.0] = DVec2::ZERO;
        w.particle_pos[id.0] = DVec2::new(10.0, 0.0);
        stabilize_velocities(&mut w, 0.1, 1.0, 5.0);
        assert!((w.particle_vel[id.0].length() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn damping_reduces_speed_over_time() {
        let mut w = World::new();
        let id = w.add_particle(DVec2::ZERO, 1.0, 0.1).unwrap();
        w.particle_vel[id.0] = DVec2::new(1.0, 0.0);
        apply_damping(&mut w, 1.0, 0.0, 0.1);
        assert!(w.particle_vel[id.0].x < 1.0);
    }

    #[test]
    fn friction_zeroes_small_tangential_speed() {
        let mut w = World::new();
        w.add_box_collider(DVec2::new(0.0, -1.0), DVec2::X, DVec2::new(10.0, 1.0))
            .unwrap();
        let id = w.add_particle(DVec2::new(0.0, 0.005), 1.0, 0.0).unwrap();
        w.particle_vel[id.0] = DVec2::new(0.01, -1.0);
        apply_particle_friction(&mut w, 1.0);
        assert!(w.particle_vel[id.0].x.abs() < 1e-9);
    }
}
