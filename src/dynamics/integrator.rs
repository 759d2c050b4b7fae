//! Gravity application and symplectic-Euler integration (§4.3).

use glam::DVec2;
use tracing::trace;

use crate::world::World;

/// For each particle with `invMass > 0`, accumulate `m * g` into its force
/// buffer. Pinned particles (`invMass == 0`) are untouched.
pub fn apply_gravity_particles(world: &mut World, gravity: DVec2) {
    for (force, inv_mass) in world
        .particle_force
        .iter_mut()
        .zip(world.particle_inv_mass.iter())
    {
        if *inv_mass > 0.0 {
            *force += gravity / *inv_mass;
        }
    }
}

/// Symplectic Euler: `v += dt * F * invMass; p += dt * v`, then clear `F`.
pub fn integrate_particles(world: &mut World, dt: f64) {
    for i in 0..world.particle_pos.len() {
        let inv_mass = world.particle_inv_mass[i];
        if inv_mass > 0.0 {
            world.particle_vel[i] += dt * world.particle_force[i] * inv_mass;
            world.particle_pos[i] += dt * world.particle_vel[i];
        }
        world.particle_force[i] = DVec2::ZERO;
    }
}

/// Record the pre-integration positions, used by velocity stabilization
/// (§4.7) at the end of the substep.
pub fn save_previous_positions(world: &mut World) {
    world.particle_prev_pos.copy_from_slice(&world.particle_pos);
}

/// `v += dt * g` for every dynamic rigid body. Uses the caller-supplied
/// `dt`, never a hard-coded substep length (§9 open question 3: the source
/// repository's `1/240` hard-code is a bug, not a feature).
pub fn apply_gravity_rigid_bodies(world: &mut World, gravity: DVec2, dt: f64) {
    for (vel, inv_mass) in world.body_vel.iter_mut().zip(world.body_inv_mass.iter()) {
        if *inv_mass > 0.0 {
            *vel += dt * gravity;
        }
    }
}

/// `p += dt * v`, `theta += dt * omega` for every dynamic rigid body.
pub fn integrate_rigid_bodies(world: &mut World, dt: f64) {
    for i in 0..world.body_center.len() {
        if world.body_inv_mass[i] > 0.0 {
            world.body_center[i] += dt * world.body_vel[i];
            world.body_angle[i] += dt * world.body_omega[i];
        }
    }
}

/// Dissipate spurious rotation in rod-connected particle pairs without
/// touching translation (§4.3): each rod's two endpoints contribute an
/// angular-momentum term about their shared center of mass, which is
/// damped by `max(0, 1 - c_ang * dt)` and redistributed as tangential
/// velocity changes at both endpoints.
pub fn apply_angular_damping_particles(world: &mut World, c_ang: f64, dt: f64) {
    let damping_factor = (1.0 - c_ang * dt).max(0.0);
    if damping_factor >= 1.0 {
        return;
    }
    for rod_idx in 0..world.rods.len() {
        let (i, j) = (world.rods[rod_idx].i, world.rods[rod_idx].j);
        let (w_i, w_j) = (world.particle_inv_mass[i], world.particle_inv_mass[j]);
        if w_i == 0.0 && w_j == 0.0 {
            continue;
        }
        let m_i = if w_i > 0.0 { 1.0 / w_i } else { 0.0 };
        let m_j = if w_j > 0.0 { 1.0 / w_j } else { 0.0 };
        let total_mass = m_i + m_j;
        if total_mass <= 0.0 {
            continue;
        }
        let com = (m_i * world.particle_pos[i] + m_j * world.particle_pos[j]) / total_mass;
        let r_i = world.particle_pos[i] - com;
        let r_j = world.particle_pos[j] - com;
        let r_i_sq = r_i.length_squared();
        let r_j_sq = r_j.length_squared();
        let moment_of_inertia = m_i * r_i_sq + m_j * r_j_sq;
        if moment_of_inertia < 1e-12 {
            continue;
        }

        // Angular momentum of the pair about their center of mass.
        let l = m_i * crate::math::cross(r_i, world.particle_vel[i])
            + m_j * crate::math::cross(r_j, world.particle_vel[j]);
        let omega = l / moment_of_inertia;
        let delta_omega = omega * (damping_factor - 1.0);

        if w_i > 0.0 {
            world.particle_vel[i] += delta_omega * crate::math::perp(r_i);
        }
        if w_j > 0.0 {
            world.particle_vel[j] += delta_omega * crate::math::perp(r_j);
        }
    }
    trace!(damping_factor, "applied angular damping to rod-connected particles");
}
