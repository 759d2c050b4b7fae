//! Extended Position-Based Dynamics solver for particle constraints
//! (rods, angles, motor-angles, particle-vs-collider contacts), §4.4.
//!
//! The defining XPBD update, applied identically to every constraint type
//! below, is:
//!
//! ```text
//! dlambda = -(C + (alpha/dt^2) * lambda) / (sum_i w_i |grad_C_i|^2 + alpha/dt^2)
//! p_i    += w_i * dlambda * grad_C_i
//! lambda += dlambda
//! ```
//!
//! `lambda` is reset to zero **once per substep**, never once per
//! iteration — doing the latter silently turns every compliant constraint
//! rigid, since XPBD's effective stiffness depends on `lambda`
//! accumulating across the whole substep's iterations.

use glam::DVec2;
use tracing::trace;

use crate::math::{cross, perp};
use crate::world::World;

const EPS: f64 = 1e-9;

/// Zero every particle constraint's accumulated multiplier. Must run once
/// per substep, before the XPBD iteration loop (§4.4 invariant).
pub fn reset_lambdas(world: &mut World) {
    for rod in &mut world.rods {
        rod.lambda = 0.0;
    }
    for angle in &mut world.angles {
        angle.lambda = 0.0;
    }
    for motor in &mut world.motors {
        motor.lambda = 0.0;
    }
}

/// One XPBD sweep over every rod constraint.
pub fn solve_rods(world: &mut World, dt: f64, default_compliance: f64) {
    for idx in 0..world.rods.len() {
        let rod = world.rods[idx];
        let i = rod.i;
        let j = rod.j;
        let w_i = world.particle_inv_mass[i];
        let w_j = world.particle_inv_mass[j];
        if w_i == 0.0 && w_j == 0.0 {
            continue;
        }
        let delta = world.particle_pos[i] - world.particle_pos[j];
        let len = delta.length();
        if len < EPS {
            continue;
        }
        let n = delta / len;
        let c = len - rod.rest_length;
        let compliance = rod.compliance.unwrap_or(default_compliance);
        let alpha_tilde = compliance / (dt * dt);
        let w_sum = w_i + w_j;
        let denom = w_sum + alpha_tilde;
        if denom < EPS {
            continue;
        }
        let dlambda = -(c + alpha_tilde * rod.lambda) / denom;
        if w_i > 0.0 {
            world.particle_pos[i] += w_i * dlambda * n;
        }
        if w_j > 0.0 {
            world.particle_pos[j] -= w_j * dlambda * n;
        }
        world.rods[idx].lambda += dlambda;
    }
}

/// The analytical gradient of `atan2(cross(u, v), dot(u, v))` with respect
/// to `u` and `v`, required by §4.4: a naive "perpendicular to unit edge"
/// approximation omits the coupling term and fails the finite-difference
/// gradient check away from a right angle (see DESIGN.md).
pub fn angle_gradients(u: DVec2, v: DVec2) -> (DVec2, DVec2) {
    let c = u.dot(v);
    let s = cross(u, v);
    let d = u.length_squared() * v.length_squared() + 1e-12;
    let grad_u = -(c * perp(v) + s * v) / d;
    let grad_v = (c * perp(u) - s * u) / d;
    (grad_u, grad_v)
}

#[allow(clippy::too_many_arguments)]
fn solve_angle_like(
    i: usize,
    j: usize,
    k: usize,
    target: f64,
    compliance: f64,
    lambda: &mut f64,
    world: &mut World,
    dt: f64,
) {
    let w_i = world.particle_inv_mass[i];
    let w_j = world.particle_inv_mass[j];
    let w_k = world.particle_inv_mass[k];
    if w_i == 0.0 && w_j == 0.0 && w_k == 0.0 {
        return;
    }
    let u = world.particle_pos[i] - world.particle_pos[j];
    let v = world.particle_pos[k] - world.particle_pos[j];
    if u.length_squared() < EPS || v.length_squared() < EPS {
        return;
    }
    let theta = f64::atan2(cross(u, v), u.dot(v));
    let c = crate::math::wrap_angle(theta - target);

    let (grad_i, grad_k) = angle_gradients(u, v);
    let grad_j = -(grad_i + grad_k);

    let w_sum = w_i * grad_i.length_squared()
        + w_j * grad_j.length_squared()
        + w_k * grad_k.length_squared();
    let alpha_tilde = compliance / (dt * dt);
    let denom = w_sum + alpha_tilde;
    if denom < EPS {
        return;
    }
    let dlambda = -(c + alpha_tilde * *lambda) / denom;

    if w_i > 0.0 {
        world.particle_pos[i] += w_i * dlambda * grad_i;
    }
    if w_j > 0.0 {
        world.particle_pos[j] += w_j * dlambda * grad_j;
    }
    if w_k > 0.0 {
        world.particle_pos[k] += w_k * dlambda * grad_k;
    }
    *lambda += dlambda;
}

/// One XPBD sweep over every angle constraint.
pub fn solve_angles(world: &mut World, dt: f64, default_compliance: f64) {
    for idx in 0..world.angles.len() {
        let angle = world.angles[idx];
        let compliance = angle.compliance.unwrap_or(default_compliance);
        let mut lambda = angle.lambda;
        solve_angle_like(
            angle.i, angle.j, angle.k, angle.target, compliance, &mut lambda, world, dt,
        );
        world.angles[idx].lambda = lambda;
    }
}

/// One XPBD sweep over every motor-angle constraint.
pub fn solve_motors(world: &mut World, dt: f64, default_compliance: f64) {
    for idx in 0..world.motors.len() {
        let motor = world.motors[idx];
        let compliance = motor.compliance.unwrap_or(default_compliance);
        let mut lambda = motor.lambda;
        solve_angle_like(
            motor.i, motor.j, motor.k, motor.target, compliance, &mut lambda, world, dt,
        );
        world.motors[idx].lambda = lambda;
    }
}

/// One XPBD sweep resolving penetration of every dynamic particle against
/// every static collider. Contact multipliers are local to the sweep
/// (they are not part of [`reset_lambdas`]/accumulated across iterations,
/// per §4.4) and are clamped to push, never pull.
pub fn solve_particle_contacts(world: &mut World, default_compliance: f64, dt: f64) {
    let mut contacts = 0u32;
    for idx in 0..world.particle_pos.len() {
        let w = world.particle_inv_mass[idx];
        if w == 0.0 {
            continue;
        }
        let radius = world.particle_radius[idx];
        let point = world.particle_pos[idx];
        let Some((_, _, sdf)) = world.colliders.closest(point) else {
            continue;
        };
        let c = sdf.phi - radius;
        if c >= 0.0 {
            continue;
        }
        let alpha_tilde = default_compliance / (dt * dt);
        let denom = w + alpha_tilde;
        if denom < EPS {
            continue;
        }
        // One-shot correction; lambda starts at zero for each contact and
        // is clamped non-negative so the constraint only pushes.
        let dlambda = (-c / denom).max(0.0);
        world.particle_pos[idx] += w * dlambda * sdf.normal;
        contacts += 1;
    }
    if contacts > 0 {
        trace!(contacts, "resolved particle-vs-collider penetrations");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rod_solver_converges_to_rest_length() {
        let mut w = World::new();
        let a = w.add_particle(DVec2::new(-0.3, 0.0), 1.0, 0.0).unwrap();
        let b = w.add_particle(DVec2::new(0.3, 0.0), 1.0, 0.0).unwrap();
        w.add_rod(a, b, 1.0, None).unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..20 {
            reset_lambdas(&mut w);
            solve_rods(&mut w, dt, 0.0);
        }
        let dist = (w.particle_pos[a.0] - w.particle_pos[b.0]).length();
        assert_abs_diff_eq!(dist, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn pinned_rod_endpoint_does_not_move() {
        let mut w = World::new();
        let a = w.add_pinned_particle(DVec2::ZERO, 0.0).unwrap();
        let b = w.add_particle(DVec2::new(0.3, 0.0), 1.0, 0.0).unwrap();
        w.add_rod(a, b, 1.0, None).unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..20 {
            reset_lambdas(&mut w);
            solve_rods(&mut w, dt, 0.0);
        }
        assert_eq!(w.particle_pos[a.0], DVec2::ZERO);
    }

    #[test]
    fn angle_gradient_matches_finite_difference() {
        fn theta(u: DVec2, v: DVec2) -> f64 {
            f64::atan2(cross(u, v), u.dot(v))
        }
        let samples = [
            (DVec2::new(1.0, 0.3), DVec2::new(0.2, 1.1)),
            (DVec2::new(-0.7, 1.4), DVec2::new(2.0, -0.4)),
            (DVec2::new(0.15, 0.2), DVec2::new(1.9, 2.3)),
        ];
        let h = 1e-6;
        for (u, v) in samples {
            let (grad_u, grad_v) = angle_gradients(u, v);
            for (axis, analytical) in [(DVec2::X, grad_u.x), (DVec2::Y, grad_u.y)] {
                let fd = (theta(u + h * axis, v) - theta(u - h * axis, v)) / (2.0 * h);
                assert!(
                    (fd - analytical).abs() < 1e-4,
                    "u-gradient mismatch: fd={fd}, analytical={analytical}"
                );
            }
            for (axis, analytical) in [(DVec2::X, grad_v.x), (DVec2::Y, grad_v.y)] {
                let fd = (theta(u, v + h * axis) - theta(u, v - h * axis)) / (2.0 * h);
                assert!(
                    (fd - analytical).abs() < 1e-4,
                    "v-gradient mismatch: fd={fd}, analytical={analytical}"
                );
            }
        }
    }

    #[test]
    fn particle_contact_pushes_out_of_circle() {
        let mut w = World::new();
        w.add_circle_collider(DVec2::ZERO, 1.0).unwrap();
        let p = w.add_particle(DVec2::new(0.2, 0.0), 1.0, 0.05).unwrap();
        solve_particle_contacts(&mut w, 0.0, 1.0 / 60.0);
        let sdf = w.colliders.closest(w.particle_pos[p.0]).unwrap().2;
        assert!(sdf.phi - 0.05 >= -1e-9);
    }

    #[test]
    fn particle_contact_never_pulls() {
        let mut w = World::new();
        w.add_circle_collider(DVec2::ZERO, 1.0).unwrap();
        let p = w.add_particle(DVec2::new(2.0, 0.0), 1.0, 0.05).unwrap();
        let before = w.particle_pos[p.0];
        solve_particle_contacts(&mut w, 1e-8, 1.0 / 60.0);
        assert_eq!(w.particle_pos[p.0], before);
    }
}
