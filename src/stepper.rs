//! Orchestrates one simulated step (§4.8, §2 "Control flow of one step").
//!
//! `Stepper` is the only thing that calls into both solvers; it owns the
//! per-substep scratch buffers for rigid-body contacts and joint
//! constraints (reallocated fresh each substep, per DESIGN.md "Shared
//! mutable scratch across solver calls") and the warm-start cache, which
//! survives across substeps and steps until the caller resets it.

use tracing::{debug, instrument, trace};

use crate::config::SimulationConfig;
use crate::dynamics::{
    integrator,
    solver::{contact, joints, xpbd},
};
use crate::world::World;

/// Owns the warm-start cache and drives one world through `step`/
/// `batched_step`. Never fails: degenerate configurations are guarded and
/// short-circuited deep in the solvers (§7).
#[derive(Debug, Default)]
pub struct Stepper {
    warm_start: contact::WarmStartCache,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all warm-start history, e.g. after [`World::clear`].
    pub fn reset_warm_start(&mut self) {
        self.warm_start.clear();
    }

    /// Advance `world` by one step: `config.substeps` substeps of
    /// `config.dt` each.
    #[instrument(level = "debug", skip_all)]
    pub fn step(&mut self, world: &mut World, config: &SimulationConfig) {
        // A non-positive dt divides by zero throughout the solvers (XPBD
        // compliance terms, Baumgarte bias, velocity stabilization); treat
        // it the same as substeps = 0, a no-op, per the "never NaN-propagate"
        // guarantee (§7) rather than let it through as a well-posed input.
        if config.dt <= 0.0 {
            return;
        }
        for substep in 0..config.substeps {
            trace!(substep, "substep begin");
            self.substep(world, config);
            trace!(substep, "substep end");
        }
        debug!(
            substeps = config.substeps,
            particles = world.particle_count(),
            bodies = world.body_count(),
            "step complete"
        );
    }

    fn substep(&mut self, world: &mut World, config: &SimulationConfig) {
        // (i) gravity
        integrator::apply_gravity_particles(world, config.gravity);
        integrator::apply_gravity_rigid_bodies(world, config.gravity, config.dt);

        // (ii) save previous positions
        integrator::save_previous_positions(world);

        // (iii) integrate
        integrator::integrate_particles(world, config.dt);
        integrator::integrate_rigid_bodies(world, config.dt);

        // (iv) reset XPBD multipliers
        xpbd::reset_lambdas(world);

        // (v) XPBD sweeps: rods -> angles -> contacts -> motors (§4.4 fixed order)
        for _ in 0..config.xpbd_iterations {
            xpbd::solve_rods(world, config.dt, config.rod_compliance);
            xpbd::solve_angles(world, config.dt, config.angle_compliance);
            xpbd::solve_particle_contacts(world, config.contact_compliance, config.dt);
            xpbd::solve_motors(world, config.dt, config.motor_compliance);
        }

        // (vi) build rigid-body contacts and joint constraints
        let mut contacts =
            contact::generate_contacts(world, config.dt, config.restitution, config.friction_mu);
        let mut joint_constraints = joints::prepare_joints(world);

        // (vii) warm start
        contact::warm_start(world, &mut contacts, &self.warm_start);

        // (viii) velocity iterations
        for _ in 0..config.xpbd_iterations {
            contact::solve_contacts(world, &mut contacts);
            joints::solve_joints(world, &mut joint_constraints, config.dt);
        }

        // (viii.b) restitution, applied once the contacts have converged
        contact::apply_restitution(world, &mut contacts);

        // (ix) joint position stabilization
        joints::stabilize_joints(world, &joint_constraints);

        // (x) cache impulses
        contact::store_impulses(&contacts, &mut self.warm_start);

        // (xi) post-process: velocity stabilization, friction, damping
        crate::post_process::stabilize_velocities(
            world,
            config.dt,
            config.velocity_stabilization_beta,
            config.max_velocity,
        );
        crate::post_process::apply_particle_friction(world, config.friction_mu);
        integrator::apply_angular_damping_particles(world, config.angular_damping, config.dt);
        crate::post_process::apply_damping(world, config.global_damping, config.angular_damping, config.dt);
    }
}
