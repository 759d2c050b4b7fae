//! Sequential-impulse solver for 2D revolute joints (§4.6).

use glam::{DMat2, DVec2};

use crate::math::{perp, rotate, wrap_angle};
use crate::world::{RevoluteJoint, World};

/// Maximum per-step linear position correction (§4.6).
const MAX_LINEAR_CORRECTION: f64 = 0.2;
/// Angular slop before position-level limit correction kicks in (§4.6).
const ANGULAR_SLOP: f64 = 2.0_f64.to_radians();

/// Solver-time state derived from a [`RevoluteJoint`] definition each
/// substep (§3 "Joint constraint (solver-time)").
#[derive(Clone, Copy, Debug)]
pub struct JointConstraint {
    pub joint_index: usize,
    pub body_a: usize,
    pub body_b: usize,
    pub r_a: DVec2,
    pub r_b: DVec2,
    /// Inverse of the 2x2 point-constraint effective-mass matrix. Zero
    /// when the matrix is singular, which correctly yields zero impulse.
    pub inv_k: DMat2,
    pub impulse: DVec2,
    pub angle_effective_mass: f64,
    pub motor_impulse: f64,
    pub limit_impulse: f64,
}

fn point_mass_matrix(world: &World, a: usize, b: usize, r_a: DVec2, r_b: DVec2) -> DMat2 {
    let wa = world.body_inv_mass[a];
    let wb = world.body_inv_mass[b];
    let ia = world.body_inv_inertia[a];
    let ib = world.body_inv_inertia[b];

    let k11 = wa + wb + ia * r_a.y * r_a.y + ib * r_b.y * r_b.y;
    let k12 = -ia * r_a.x * r_a.y - ib * r_b.x * r_b.y;
    let k22 = wa + wb + ia * r_a.x * r_a.x + ib * r_b.x * r_b.x;

    DMat2::from_cols(DVec2::new(k11, k12), DVec2::new(k12, k22))
}

fn safe_inverse(m: DMat2) -> DMat2 {
    let det = m.determinant();
    if det.abs() < 1e-12 {
        DMat2::ZERO
    } else {
        m.inverse()
    }
}

/// Build one [`JointConstraint`] per joint definition, precomputing the
/// anchor offsets and effective-mass matrices (§4.6).
pub fn prepare_joints(world: &World) -> Vec<JointConstraint> {
    world
        .joints
        .iter()
        .enumerate()
        .map(|(idx, joint)| prepare_one(world, idx, joint))
        .collect()
}

fn prepare_one(world: &World, idx: usize, joint: &RevoluteJoint) -> JointConstraint {
    let a = joint.body_a;
    let b = joint.body_b;
    let r_a = rotate(joint.local_anchor_a, world.body_angle[a]);
    let r_b = rotate(joint.local_anchor_b, world.body_angle[b]);
    let k = point_mass_matrix(world, a, b, r_a, r_b);
    let inv_k = safe_inverse(k);

    let inv_inertia_sum = world.body_inv_inertia[a] + world.body_inv_inertia[b];
    let angle_effective_mass = if inv_inertia_sum > 1e-12 {
        1.0 / inv_inertia_sum
    } else {
        0.0
    };

    JointConstraint {
        joint_index: idx,
        body_a: a,
        body_b: b,
        r_a,
        r_b,
        inv_k,
        impulse: DVec2::ZERO,
        angle_effective_mass,
        motor_impulse: 0.0,
        limit_impulse: 0.0,
    }
}

fn joint_angle(world: &World, joint: &RevoluteJoint) -> f64 {
    wrap_angle(world.body_angle[joint.body_b] - world.body_angle[joint.body_a] - joint.reference_angle)
}

fn apply_angular_impulse(world: &mut World, body: usize, impulse: f64) {
    world.body_omega[body] += world.body_inv_inertia[body] * impulse;
}

fn apply_point_impulse(world: &mut World, c: &JointConstraint, impulse: DVec2) {
    let wa = world.body_inv_mass[c.body_a];
    let wb = world.body_inv_mass[c.body_b];
    let ia = world.body_inv_inertia[c.body_a];
    let ib = world.body_inv_inertia[c.body_b];

    world.body_vel[c.body_a] -= wa * impulse;
    world.body_omega[c.body_a] -= ia * crate::math::cross(c.r_a, impulse);
    world.body_vel[c.body_b] += wb * impulse;
    world.body_omega[c.body_b] += ib * crate::math::cross(c.r_b, impulse);
}

/// One velocity-level solve of motor, angle limits, and the point
/// constraint for every joint, in that order (§4.6).
pub fn solve_joints(world: &mut World, constraints: &mut [JointConstraint], dt: f64) {
    for c in constraints.iter_mut() {
        let joint = world.joints[c.joint_index];

        // Motor.
        if let Some(motor) = joint.motor {
            if c.angle_effective_mass > 0.0 {
                let rel_omega = world.body_omega[c.body_b] - world.body_omega[c.body_a];
                let c_dot = rel_omega - motor.target_speed;
                let d_impulse = -c.angle_effective_mass * c_dot;
                let max_impulse = motor.max_torque * dt;
                let new_impulse = (c.motor_impulse + d_impulse).clamp(-max_impulse, max_impulse);
                let applied = new_impulse - c.motor_impulse;
                c.motor_impulse = new_impulse;
                apply_angular_impulse(world, c.body_a, -applied);
                apply_angular_impulse(world, c.body_b, applied);
            }
        }

        // Angle limits: one-sided impulses so limits only push into range.
        if let Some(limits) = joint.limits {
            if c.angle_effective_mass > 0.0 {
                let angle = joint_angle(world, &joint);
                let rel_omega = world.body_omega[c.body_b] - world.body_omega[c.body_a];
                if angle <= limits.lower {
                    let c_dot = rel_omega;
                    let d_impulse = -c.angle_effective_mass * c_dot;
                    let new_impulse = (c.limit_impulse + d_impulse).max(0.0);
                    let applied = new_impulse - c.limit_impulse;
                    c.limit_impulse = new_impulse;
                    apply_angular_impulse(world, c.body_a, -applied);
                    apply_angular_impulse(world, c.body_b, applied);
                } else if angle >= limits.upper {
                    let c_dot = rel_omega;
                    let d_impulse = -c.angle_effective_mass * c_dot;
                    let new_impulse = (c.limit_impulse + d_impulse).min(0.0);
                    let applied = new_impulse - c.limit_impulse;
                    c.limit_impulse = new_impulse;
                    apply_angular_impulse(world, c.body_a, -applied);
                    apply_angular_impulse(world, c.body_b, applied);
                } else {
                    c.limit_impulse = 0.0;
                }
            }
        }

        // Point constraint.
        let v_rel = (world.body_vel[c.body_b] + world.body_omega[c.body_b] * perp(c.r_b))
            - (world.body_vel[c.body_a] + world.body_omega[c.body_a] * perp(c.r_a));
        let impulse = c.inv_k * (-v_rel);
        c.impulse += impulse;
        apply_point_impulse(world, c, impulse);
    }
}

/// Single position-level stabilization pass after the velocity
/// iterations: resolves residual anchor separation and angle-limit
/// violations directly on position/orientation (§4.6).
pub fn stabilize_joints(world: &mut World, constraints: &[JointConstraint]) {
    for c in constraints {
        let joint = world.joints[c.joint_index];
        let r_a = rotate(joint.local_anchor_a, world.body_angle[c.body_a]);
        let r_b = rotate(joint.local_anchor_b, world.body_angle[c.body_b]);
        let anchor_a = world.body_center[c.body_a] + r_a;
        let anchor_b = world.body_center[c.body_b] + r_b;
        let separation = anchor_b - anchor_a;

        let k = point_mass_matrix(world, c.body_a, c.body_b, r_a, r_b);
        let inv_k = safe_inverse(k);
        let mut correction = inv_k * (-separation);
        let len = correction.length();
        if len > MAX_LINEAR_CORRECTION {
            correction *= MAX_LINEAR_CORRECTION / len;
        }

        let wa = world.body_inv_mass[c.body_a];
        let wb = world.body_inv_mass[c.body_b];
        let ia = world.body_inv_inertia[c.body_a];
        let ib = world.body_inv_inertia[c.body_b];

        world.body_center[c.body_a] -= wa * correction;
        world.body_angle[c.body_a] -= ia * crate::math::cross(r_a, correction);
        world.body_center[c.body_b] += wb * correction;
        world.body_angle[c.body_b] += ib * crate::math::cross(r_b, correction);

        if let Some(limits) = joint.limits {
            if c.angle_effective_mass > 0.0 {
                let angle = joint_angle(world, &joint);
                let violation = if angle < limits.lower - ANGULAR_SLOP {
                    angle - (limits.lower - ANGULAR_SLOP)
                } else if angle > limits.upper + ANGULAR_SLOP {
                    angle - (limits.upper + ANGULAR_SLOP)
                } else {
                    0.0
                };
                if violation != 0.0 {
                    let correction = -c.angle_effective_mass * violation;
                    world.body_angle[c.body_a] -= ia * correction;
                    world.body_angle[c.body_b] += ib * correction;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{CircleGeom, JointLimits, World};
    use approx::assert_abs_diff_eq;

    fn two_body_joint() -> (World, usize) {
        let mut w = World::new();
        let geoms = [CircleGeom {
            local_offset: DVec2::ZERO,
            radius: 0.5,
        }];
        let a = w
            .add_rigid_body(DVec2::new(-0.6, 2.0), 0.0, 1.0, 1.0, &geoms)
            .unwrap();
        let b = w
            .add_rigid_body(DVec2::new(0.6, 2.0), 0.0, 1.0, 1.0, &geoms)
            .unwrap();
        let joint_id = w
            .add_revolute_joint(
                a,
                b,
                DVec2::new(0.5, 0.0),
                DVec2::new(-0.5, 0.0),
                None,
                None,
            )
            .unwrap();
        (w, joint_id.0)
    }

    #[test]
    fn singular_mass_matrix_gives_zero_inverse() {
        let m = DMat2::ZERO;
        assert_eq!(safe_inverse(m), DMat2::ZERO);
    }

    #[test]
    fn joint_velocity_solve_pulls_anchors_together() {
        let (mut w, _joint) = two_body_joint();
        w.body_vel[0] = DVec2::new(0.0, -1.0);
        w.body_vel[1] = DVec2::new(0.0, 1.0);
        let mut constraints = prepare_joints(&w);
        for _ in 0..8 {
            solve_joints(&mut w, &mut constraints, 1.0 / 60.0);
        }
        let r_a = rotate(w.joints[0].local_anchor_a, w.body_angle[0]);
        let r_b = rotate(w.joints[0].local_anchor_b, w.body_angle[1]);
        let v_anchor_a = w.body_vel[0] + w.body_omega[0] * perp(r_a);
        let v_anchor_b = w.body_vel[1] + w.body_omega[1] * perp(r_b);
        assert_abs_diff_eq!(v_anchor_a.x, v_anchor_b.x, epsilon = 1e-6);
        assert_abs_diff_eq!(v_anchor_a.y, v_anchor_b.y, epsilon = 1e-6);
    }

    #[test]
    fn angle_limit_only_pushes_back_into_range() {
        let mut w = World::new();
        let geoms = [CircleGeom {
            local_offset: DVec2::ZERO,
            radius: 0.5,
        }];
        let a = w
            .add_static_body(DVec2::ZERO, 0.0, &geoms)
            .unwrap();
        let b = w
            .add_rigid_body(DVec2::new(1.0, 0.0), 0.0, 1.0, 1.0, &geoms)
            .unwrap();
        w.add_revolute_joint(
            a,
            b,
            DVec2::ZERO,
            DVec2::new(-1.0, 0.0),
            Some(JointLimits {
                lower: -0.1,
                upper: 0.1,
            }),
            None,
        )
        .unwrap();
        // Already rotated past the upper limit and still spinning outward;
        // the limit must brake it without needing a position integration
        // step in between (the constraint reacts to the current angle).
        w.body_angle[b.0] = 0.5;
        w.body_omega[b.0] = 5.0;
        let mut constraints = prepare_joints(&w);
        for _ in 0..4 {
            solve_joints(&mut w, &mut constraints, 1.0 / 60.0);
        }
        assert!(w.body_omega[b.0] <= 0.01);
    }
}
