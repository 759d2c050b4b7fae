//! World state: the sole owner of every particle, rigid body, constraint,
//! and collider in a scene (§3, §4.1).
//!
//! All data lives in parallel arrays (Structure-of-Arrays) rather than a
//! `Vec` of per-entity structs, matching the teacher's own SoA-first
//! framing of `World state` in §2 and the requirement that the batched
//! engine (`crate::batched`) be able to slice these arrays directly.
//! Builders validate their inputs and return [`BuildError`] instead of
//! panicking or silently corrupting the arrays (§7, §10.2).

use glam::DVec2;

use crate::collider::{BoxCollider, CapsuleCollider, CircleCollider, ColliderKind, Colliders};
use crate::error::{check_finite_scalar, check_finite_vec2, BuildError};

/// Index of a particle, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleId(pub usize);

/// Index of a rigid body, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// Index of a rod constraint, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RodId(pub usize);

/// Index of an angle constraint, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AngleId(pub usize);

/// Index of a motor-angle constraint, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MotorId(pub usize);

/// Index of a revolute joint, stable until [`World::clear`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JointId(pub usize);

/// A distance (rod) constraint between two particles (§3).
#[derive(Clone, Copy, Debug)]
pub struct Rod {
    pub i: usize,
    pub j: usize,
    pub rest_length: f64,
    pub compliance: Option<f64>,
    pub(crate) lambda: f64,
}

/// An angle constraint among three particles, `j` the vertex (§3).
#[derive(Clone, Copy, Debug)]
pub struct Angle {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub target: f64,
    pub compliance: Option<f64>,
    pub(crate) lambda: f64,
}

/// A motor-angle constraint: an [`Angle`] whose `target` is expected to be
/// mutated every step by the controller driving the actuator (§3).
#[derive(Clone, Copy, Debug)]
pub struct Motor {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub target: f64,
    pub compliance: Option<f64>,
    pub(crate) lambda: f64,
}

/// One circular collision geom belonging to a rigid body, in the body's
/// local space (§3).
#[derive(Clone, Copy, Debug)]
pub struct CircleGeom {
    pub local_offset: DVec2,
    pub radius: f64,
}

/// Optional angle-limit range for a [`RevoluteJoint`], in radians.
#[derive(Clone, Copy, Debug)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

/// Optional angular motor for a [`RevoluteJoint`].
#[derive(Clone, Copy, Debug)]
pub struct JointMotor {
    pub target_speed: f64,
    pub max_torque: f64,
}

/// A 2D revolute joint pinning an anchor point of body `a` to one of body
/// `b`, optionally limiting and/or driving their relative angle (§3).
#[derive(Clone, Copy, Debug)]
pub struct RevoluteJoint {
    pub body_a: usize,
    pub body_b: usize,
    pub local_anchor_a: DVec2,
    pub local_anchor_b: DVec2,
    pub reference_angle: f64,
    pub limits: Option<JointLimits>,
    pub motor: Option<JointMotor>,
}

/// Owns every simulated entity in a scene: particles, rigid bodies,
/// particle constraints, joints, and static colliders (§3).
///
/// `World` never removes entities mid-scene; `clear` resets everything at
/// once, and every index returned by a builder stays valid until the next
/// `clear`.
#[derive(Clone, Debug, Default)]
pub struct World {
    // Particle SoA. All six arrays share one length (invariant, §3).
    pub(crate) particle_pos: Vec<DVec2>,
    pub(crate) particle_vel: Vec<DVec2>,
    pub(crate) particle_inv_mass: Vec<f64>,
    pub(crate) particle_radius: Vec<f64>,
    pub(crate) particle_force: Vec<DVec2>,
    pub(crate) particle_prev_pos: Vec<DVec2>,

    pub(crate) rods: Vec<Rod>,
    pub(crate) angles: Vec<Angle>,
    pub(crate) motors: Vec<Motor>,

    // Rigid body SoA.
    pub(crate) body_center: Vec<DVec2>,
    pub(crate) body_angle: Vec<f64>,
    pub(crate) body_vel: Vec<DVec2>,
    pub(crate) body_omega: Vec<f64>,
    pub(crate) body_inv_mass: Vec<f64>,
    pub(crate) body_inv_inertia: Vec<f64>,
    pub(crate) body_geom_start: Vec<usize>,
    pub(crate) body_geom_count: Vec<usize>,

    pub(crate) geoms: Vec<CircleGeom>,

    pub(crate) joints: Vec<RevoluteJoint>,

    pub(crate) colliders: Colliders,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every array to empty. Any index previously returned becomes
    /// invalid; the warm-start cache owned by the stepper must be reset
    /// separately (it is not reachable from `World`).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ---- particles -----------------------------------------------------

    /// Add a dynamic particle. `mass` must be strictly positive; use
    /// [`World::add_pinned_particle`] for immovable points.
    pub fn add_particle(
        &mut self,
        position: DVec2,
        mass: f64,
        radius: f64,
    ) -> Result<ParticleId, BuildError> {
        check_finite_vec2("position", position)?;
        check_finite_scalar("radius", radius)?;
        // `mass <= 0.0` would silently accept NaN; negate the positive
        // check instead so NaN is rejected too.
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(mass > 0.0) {
            return Err(BuildError::NonPositiveMass(mass));
        }
        Ok(self.push_particle(position, 1.0 / mass, radius))
    }

    /// Add an immovable particle (`invMass = 0`).
    pub fn add_pinned_particle(
        &mut self,
        position: DVec2,
        radius: f64,
    ) -> Result<ParticleId, BuildError> {
        check_finite_vec2("position", position)?;
        check_finite_scalar("radius", radius)?;
        Ok(self.push_particle(position, 0.0, radius))
    }

    fn push_particle(&mut self, position: DVec2, inv_mass: f64, radius: f64) -> ParticleId {
        let id = self.particle_pos.len();
        self.particle_pos.push(position);
        self.particle_vel.push(DVec2::ZERO);
        self.particle_inv_mass.push(inv_mass);
        self.particle_radius.push(radius);
        self.particle_force.push(DVec2::ZERO);
        self.particle_prev_pos.push(position);
        ParticleId(id)
    }

    pub fn particle_count(&self) -> usize {
        self.particle_pos.len()
    }

    fn check_particle(&self, id: usize) -> Result<(), BuildError> {
        if id < self.particle_pos.len() {
            Ok(())
        } else {
            Err(BuildError::InvalidParticleIndex(id))
        }
    }

    // ---- particle constraints -------------------------------------------

    /// Add a rod (distance) constraint between particles `i` and `j`.
    pub fn add_rod(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        rest_length: f64,
        compliance: Option<f64>,
    ) -> Result<RodId, BuildError> {
        self.check_particle(i.0)?;
        self.check_particle(j.0)?;
        check_finite_scalar("rest_length", rest_length)?;
        let id = self.rods.len();
        self.rods.push(Rod {
            i: i.0,
            j: j.0,
            rest_length,
            compliance,
            lambda: 0.0,
        });
        Ok(RodId(id))
    }

    /// Add an angle constraint among particles `i`, `j` (vertex), `k`.
    pub fn add_angle(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        k: ParticleId,
        target: f64,
        compliance: Option<f64>,
    ) -> Result<AngleId, BuildError> {
        self.check_particle(i.0)?;
        self.check_particle(j.0)?;
        self.check_particle(k.0)?;
        check_finite_scalar("target", target)?;
        let id = self.angles.len();
        self.angles.push(Angle {
            i: i.0,
            j: j.0,
            k: k.0,
            target,
            compliance,
            lambda: 0.0,
        });
        Ok(AngleId(id))
    }

    /// Add a motor-angle constraint (a soft angle constraint whose target
    /// is meant to be updated every step via [`World::set_motor_target`]).
    pub fn add_motor(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        k: ParticleId,
        initial_target: f64,
        compliance: Option<f64>,
    ) -> Result<MotorId, BuildError> {
        self.check_particle(i.0)?;
        self.check_particle(j.0)?;
        self.check_particle(k.0)?;
        check_finite_scalar("initial_target", initial_target)?;
        let id = self.motors.len();
        self.motors.push(Motor {
            i: i.0,
            j: j.0,
            k: k.0,
            target: initial_target,
            compliance,
            lambda: 0.0,
        });
        Ok(MotorId(id))
    }

    /// Update the target angle of a motor constraint, e.g. from a
    /// controller's action output.
    pub fn set_motor_target(&mut self, motor: MotorId, target: f64) {
        self.motors[motor.0].target = target;
    }

    /// Add a rod that stabilizes a target angle at particle `j` via the
    /// law-of-cosines diagonal distance (§4.1, §9 open question 2):
    /// `d^2 = L1^2 + L2^2 - 2*L1*L2*cos(theta)`.
    ///
    /// This is the preferred way to actuate an angle in rigid articulated
    /// structures: plain [`Angle`] constraints are empirically unstable
    /// when combined with rods and ground contact, even at high iteration
    /// counts (DESIGN.md, open question 2).
    pub fn add_angle_as_rod(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        k: ParticleId,
        target: f64,
        compliance: Option<f64>,
    ) -> Result<RodId, BuildError> {
        self.check_particle(i.0)?;
        self.check_particle(j.0)?;
        self.check_particle(k.0)?;
        check_finite_scalar("target", target)?;
        let l1 = (self.particle_pos[i.0] - self.particle_pos[j.0]).length();
        let l2 = (self.particle_pos[k.0] - self.particle_pos[j.0]).length();
        let d_sq = l1 * l1 + l2 * l2 - 2.0 * l1 * l2 * target.cos();
        let rest_length = d_sq.max(0.0).sqrt();
        self.add_rod(i, k, rest_length, compliance)
    }

    // ---- rigid bodies ----------------------------------------------------

    /// Add a dynamic rigid body made of one or more circle geoms in its
    /// local frame. `mass` and `moment_of_inertia` must be strictly
    /// positive.
    pub fn add_rigid_body(
        &mut self,
        center: DVec2,
        angle: f64,
        mass: f64,
        moment_of_inertia: f64,
        geoms: &[CircleGeom],
    ) -> Result<BodyId, BuildError> {
        check_finite_vec2("center", center)?;
        check_finite_scalar("angle", angle)?;
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(mass > 0.0) {
            return Err(BuildError::NonPositiveMass(mass));
        }
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(moment_of_inertia > 0.0) {
            return Err(BuildError::NonPositiveMass(moment_of_inertia));
        }
        if geoms.is_empty() {
            return Err(BuildError::EmptyGeomSet);
        }
        for g in geoms {
            check_finite_vec2("geom.local_offset", g.local_offset)?;
            check_finite_scalar("geom.radius", g.radius)?;
        }
        Ok(self.push_body(center, angle, 1.0 / mass, 1.0 / moment_of_inertia, geoms))
    }

    /// Add a static (immovable) rigid body, e.g. as an anchor for a joint.
    pub fn add_static_body(
        &mut self,
        center: DVec2,
        angle: f64,
        geoms: &[CircleGeom],
    ) -> Result<BodyId, BuildError> {
        check_finite_vec2("center", center)?;
        check_finite_scalar("angle", angle)?;
        if geoms.is_empty() {
            return Err(BuildError::EmptyGeomSet);
        }
        Ok(self.push_body(center, angle, 0.0, 0.0, geoms))
    }

    fn push_body(
        &mut self,
        center: DVec2,
        angle: f64,
        inv_mass: f64,
        inv_inertia: f64,
        geoms: &[CircleGeom],
    ) -> BodyId {
        let id = self.body_center.len();
        let start = self.geoms.len();
        self.geoms.extend_from_slice(geoms);
        self.body_center.push(center);
        self.body_angle.push(angle);
        self.body_vel.push(DVec2::ZERO);
        self.body_omega.push(0.0);
        self.body_inv_mass.push(inv_mass);
        self.body_inv_inertia.push(inv_inertia);
        self.body_geom_start.push(start);
        self.body_geom_count.push(geoms.len());
        BodyId(id)
    }

    pub fn body_count(&self) -> usize {
        self.body_center.len()
    }

    fn check_body(&self, id: usize) -> Result<(), BuildError> {
        if id < self.body_center.len() {
            Ok(())
        } else {
            Err(BuildError::InvalidBodyIndex(id))
        }
    }

    /// Add a revolute joint pinning anchor points of two bodies together.
    /// `reference_angle` is the bodies' angle difference at creation time
    /// that the joint treats as "zero joint angle" (§3).
    #[allow(clippy::too_many_arguments)]
    pub fn add_revolute_joint(
        &mut self,
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: DVec2,
        local_anchor_b: DVec2,
        limits: Option<JointLimits>,
        motor: Option<JointMotor>,
    ) -> Result<JointId, BuildError> {
        self.check_body(body_a.0)?;
        self.check_body(body_b.0)?;
        check_finite_vec2("local_anchor_a", local_anchor_a)?;
        check_finite_vec2("local_anchor_b", local_anchor_b)?;
        let reference_angle = self.body_angle[body_b.0] - self.body_angle[body_a.0];
        let id = self.joints.len();
        self.joints.push(RevoluteJoint {
            body_a: body_a.0,
            body_b: body_b.0,
            local_anchor_a,
            local_anchor_b,
            reference_angle,
            limits,
            motor,
        });
        Ok(JointId(id))
    }

    // ---- colliders ---------------------------------------------------------

    pub fn add_circle_collider(&mut self, center: DVec2, radius: f64) -> Result<usize, BuildError> {
        check_finite_vec2("center", center)?;
        check_finite_scalar("radius", radius)?;
        let id = self.colliders.circles.len();
        self.colliders.circles.push(CircleCollider { center, radius });
        Ok(id)
    }

    pub fn add_capsule_collider(
        &mut self,
        center: DVec2,
        axis: DVec2,
        half_length: f64,
        radius: f64,
    ) -> Result<usize, BuildError> {
        check_finite_vec2("center", center)?;
        check_finite_vec2("axis", axis)?;
        check_finite_scalar("half_length", half_length)?;
        check_finite_scalar("radius", radius)?;
        let id = self.colliders.capsules.len();
        self.colliders.capsules.push(CapsuleCollider {
            center,
            axis,
            half_length,
            radius,
        });
        Ok(id)
    }

    pub fn add_box_collider(
        &mut self,
        center: DVec2,
        local_x: DVec2,
        half_extents: DVec2,
    ) -> Result<usize, BuildError> {
        check_finite_vec2("center", center)?;
        check_finite_vec2("local_x", local_x)?;
        check_finite_vec2("half_extents", half_extents)?;
        let id = self.colliders.boxes.len();
        self.colliders.boxes.push(BoxCollider {
            center,
            local_x,
            half_extents,
        });
        Ok(id)
    }

    pub fn colliders(&self) -> &Colliders {
        &self.colliders
    }

    /// Replace this world's static colliders wholesale, e.g. to point
    /// several [`World`]s at one shared pool (`crate::batched`).
    pub fn set_colliders(&mut self, colliders: Colliders) {
        self.colliders = colliders;
    }

    // ---- read-only accessors (§6.3) ----------------------------------------

    pub fn particle_position(&self, id: ParticleId) -> DVec2 {
        self.particle_pos[id.0]
    }

    pub fn particle_velocity(&self, id: ParticleId) -> DVec2 {
        self.particle_vel[id.0]
    }

    pub fn particle_positions(&self) -> &[DVec2] {
        &self.particle_pos
    }

    pub fn particle_velocities(&self) -> &[DVec2] {
        &self.particle_vel
    }

    pub fn body_state(&self, id: BodyId) -> RigidBodyState {
        RigidBodyState {
            center: self.body_center[id.0],
            angle: self.body_angle[id.0],
            velocity: self.body_vel[id.0],
            angular_velocity: self.body_omega[id.0],
        }
    }

    /// Set a particle's velocity directly, e.g. to give it a known initial
    /// velocity at scene-construction time.
    pub fn set_particle_velocity(&mut self, id: ParticleId, velocity: DVec2) {
        self.particle_vel[id.0] = velocity;
    }

    /// Displace a particle's position directly, bypassing integration.
    /// Used to seed per-world randomized initial conditions in the batched
    /// engine (§4.9 "Randomization for per-world initial conditions").
    pub fn nudge_particle(&mut self, id: ParticleId, delta: DVec2) {
        self.particle_pos[id.0] += delta;
        self.particle_prev_pos[id.0] += delta;
    }

    /// Displace a rigid body's center directly, bypassing integration.
    /// Used to seed per-world randomized initial conditions in the batched
    /// engine (§4.9 "Randomization for per-world initial conditions").
    pub fn nudge_body(&mut self, id: BodyId, delta: DVec2) {
        self.body_center[id.0] += delta;
    }

    pub fn geom_world_positions(&self, id: BodyId) -> Vec<DVec2> {
        let start = self.body_geom_start[id.0];
        let count = self.body_geom_count[id.0];
        let center = self.body_center[id.0];
        let angle = self.body_angle[id.0];
        self.geoms[start..start + count]
            .iter()
            .map(|g| crate::collider::geom_world_center(center, angle, g.local_offset))
            .collect()
    }
}

/// Snapshot of a rigid body's kinematic state, returned by read-only
/// accessors (§6.3).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyState {
    pub center: DVec2,
    pub angle: f64,
    pub velocity: DVec2,
    pub angular_velocity: f64,
}

/// Collider identity used to key the warm-start cache (§3, §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColliderRef {
    pub kind: ColliderKind,
    pub index: usize,
}
