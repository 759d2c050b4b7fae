//! Sequential-impulse contact solver for rigid bodies against static
//! colliders (§4.5), with Coulomb friction, Baumgarte stabilization, and
//! warm-starting from the previous substep.

use std::collections::HashMap;

use glam::DVec2;
use tracing::trace;

use crate::collider::geom_world_center;
use crate::math::perp;
use crate::world::{ColliderRef, World};

/// Baumgarte stabilization factor (§4.5).
pub const BAUMGARTE_BETA: f64 = 0.2;
/// Linear slop: penetration tolerated before the bias kicks in (§4.5).
pub const LINEAR_SLOP: f64 = 0.01;
/// Minimum approach speed along the normal for restitution to apply;
/// below this, bounce is indistinguishable from resting jitter (§4.5).
pub const RESTITUTION_THRESHOLD: f64 = 1.0;

/// Compound key identifying a rigid-body-vs-collider contact across
/// substeps, for warm-starting (§3, §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactId {
    pub body: usize,
    pub collider: ColliderRef,
    pub geom: usize,
}

/// A contact constraint built fresh each substep from collision detection
/// (§3).
#[derive(Clone, Copy, Debug)]
pub struct ContactConstraint {
    pub id: ContactId,
    pub body: usize,
    pub point: DVec2,
    pub offset: DVec2,
    pub normal: DVec2,
    pub tangent: DVec2,
    pub normal_mass: f64,
    pub tangent_mass: f64,
    pub velocity_bias: f64,
    pub restitution: f64,
    /// Pre-solve relative velocity along the normal, captured before any
    /// impulse is applied this substep; restitution's target speed.
    pub normal_speed: f64,
    pub friction: f64,
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
}

/// Persists accumulated impulses across substeps, keyed by [`ContactId`],
/// so the next substep's contacts can be seeded with a good initial
/// guess (§3 "Warm-start cache", §9 open question 4). Owned exclusively
/// by the stepper.
#[derive(Clone, Debug, Default)]
pub struct WarmStartCache {
    impulses: HashMap<ContactId, (f64, f64)>,
}

impl WarmStartCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.impulses.clear();
    }

    fn get(&self, id: ContactId) -> (f64, f64) {
        // A cache miss is "new contact", initial lambda = 0; not an error (§7).
        self.impulses.get(&id).copied().unwrap_or((0.0, 0.0))
    }

    fn store(&mut self, id: ContactId, normal_impulse: f64, tangent_impulse: f64) {
        self.impulses.insert(id, (normal_impulse, tangent_impulse));
    }
}

/// Enumerate every dynamic rigid body geom against every static collider
/// and build a [`ContactConstraint`] for each overlapping pair.
pub fn generate_contacts(
    world: &World,
    dt: f64,
    restitution: f64,
    friction: f64,
) -> Vec<ContactConstraint> {
    let mut contacts = Vec::new();
    for body in 0..world.body_center.len() {
        if world.body_inv_mass[body] == 0.0 {
            continue;
        }
        let center = world.body_center[body];
        let angle = world.body_angle[body];
        let inv_mass = world.body_inv_mass[body];
        let inv_inertia = world.body_inv_inertia[body];
        let start = world.body_geom_start[body];
        let count = world.body_geom_count[body];

        for geom_idx in start..start + count {
            let geom = world.geoms[geom_idx];
            let geom_center = geom_world_center(center, angle, geom.local_offset);

            let Some((kind, collider_idx, sdf)) = world.colliders.closest(geom_center) else {
                continue;
            };
            let phi_total = sdf.phi - geom.radius;
            if phi_total >= 0.0 {
                continue;
            }

            let n = sdf.normal;
            let contact_point = geom_center - n * geom.radius;
            let r = contact_point - center;
            let t = perp(n);

            let r_cross_n = crate::math::cross(r, n);
            let r_cross_t = crate::math::cross(r, t);

            let normal_denom = inv_mass + inv_inertia * r_cross_n * r_cross_n;
            let tangent_denom = inv_mass + inv_inertia * r_cross_t * r_cross_t;
            if normal_denom < 1e-12 {
                continue;
            }

            let velocity_bias = BAUMGARTE_BETA / dt * (-phi_total - LINEAR_SLOP).max(0.0);
            let normal_speed = velocity_at_contact(world, body, r).dot(n);

            contacts.push(ContactConstraint {
                id: ContactId {
                    body,
                    collider: ColliderRef {
                        kind,
                        index: collider_idx,
                    },
                    geom: geom_idx - start,
                },
                body,
                point: contact_point,
                offset: r,
                normal: n,
                tangent: t,
                normal_mass: 1.0 / normal_denom,
                tangent_mass: if tangent_denom > 1e-12 {
                    1.0 / tangent_denom
                } else {
                    0.0
                },
                velocity_bias,
                restitution,
                normal_speed,
                friction,
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
            });
        }
    }
    if !contacts.is_empty() {
        trace!(count = contacts.len(), "generated rigid-body contacts");
    }
    contacts
}

fn velocity_at_contact(world: &World, body: usize, r: DVec2) -> DVec2 {
    world.body_vel[body] + world.body_omega[body] * perp(r)
}

fn apply_impulse(world: &mut World, body: usize, r: DVec2, impulse: DVec2) {
    let inv_mass = world.body_inv_mass[body];
    let inv_inertia = world.body_inv_inertia[body];
    world.body_vel[body] += inv_mass * impulse;
    world.body_omega[body] += inv_inertia * crate::math::cross(r, impulse);
}

/// Seed each contact's accumulated impulses from the warm-start cache and
/// apply them immediately, matching the previous substep's solution
/// before any velocity iterations run (§4.5).
pub fn warm_start(world: &mut World, contacts: &mut [ContactConstraint], cache: &WarmStartCache) {
    for c in contacts.iter_mut() {
        let (normal_impulse, tangent_impulse) = cache.get(c.id);
        c.normal_impulse = normal_impulse;
        c.tangent_impulse = tangent_impulse;
        let impulse = normal_impulse * c.normal + tangent_impulse * c.tangent;
        apply_impulse(world, c.body, c.offset, impulse);
    }
}

/// One sequential-impulse velocity iteration over every contact: friction
/// first, then the normal constraint (§4.5).
pub fn solve_contacts(world: &mut World, contacts: &mut [ContactConstraint]) {
    for c in contacts.iter_mut() {
        // Friction.
        if c.tangent_mass > 0.0 {
            let v = velocity_at_contact(world, c.body, c.offset);
            let v_t = v.dot(c.tangent);
            let max_friction = c.friction * c.normal_impulse;
            let d_tangent = -c.tangent_mass * v_t;
            let new_tangent_impulse =
                (c.tangent_impulse + d_tangent).clamp(-max_friction, max_friction);
            let applied = new_tangent_impulse - c.tangent_impulse;
            c.tangent_impulse = new_tangent_impulse;
            apply_impulse(world, c.body, c.offset, applied * c.tangent);
        }

        // Normal.
        let v = velocity_at_contact(world, c.body, c.offset);
        let v_n = v.dot(c.normal);
        let d_normal = -c.normal_mass * (v_n - c.velocity_bias);
        let new_normal_impulse = (c.normal_impulse + d_normal).max(0.0);
        let applied = new_normal_impulse - c.normal_impulse;
        c.normal_impulse = new_normal_impulse;
        apply_impulse(world, c.body, c.offset, applied * c.normal);
    }
}

/// Applies restitution once the velocity iterations have converged,
/// bouncing each contact whose pre-solve approach speed exceeded
/// [`RESTITUTION_THRESHOLD`] back out at `restitution` times that speed
/// (§4.5). A no-op for resting contacts and for `restitution == 0.0`.
pub fn apply_restitution(world: &mut World, contacts: &mut [ContactConstraint]) {
    for c in contacts.iter_mut() {
        if c.restitution == 0.0 || c.normal_speed > -RESTITUTION_THRESHOLD {
            continue;
        }
        let v = velocity_at_contact(world, c.body, c.offset);
        let v_n = v.dot(c.normal);
        let d_normal = -c.normal_mass * (v_n + c.restitution * c.normal_speed);
        let new_normal_impulse = (c.normal_impulse + d_normal).max(0.0);
        let applied = new_normal_impulse - c.normal_impulse;
        c.normal_impulse = new_normal_impulse;
        apply_impulse(world, c.body, c.offset, applied * c.normal);
    }
}

/// Persist each contact's final accumulated impulses back into the
/// warm-start cache, overwriting any stale entry (§4.5, §9 open question 4).
pub fn store_impulses(contacts: &[ContactConstraint], cache: &mut WarmStartCache) {
    for c in contacts {
        cache.store(c.id, c.normal_impulse, c.tangent_impulse);
    }
}
