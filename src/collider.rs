//! Static collider shapes and their signed-distance fields.
//!
//! Colliders are immutable once added to a [`crate::world::World`] (see
//! `add_circle_collider` / `add_capsule_collider` / `add_box_collider`).
//! Each shape lives in its own homogeneous array rather than behind a
//! trait object, so the batched engine (`crate::batched`) can iterate each
//! collider kind as a flat SoA buffer; see "Polymorphism over collider
//! kinds" in DESIGN.md.

use glam::DVec2;

use crate::math::{perp, rotate};

/// A signed distance together with the outward unit normal at the
/// nearest boundary point. `phi >= 0` outside the shape, `phi < 0` inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sdf {
    pub phi: f64,
    pub normal: DVec2,
}

/// An immovable circle collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleCollider {
    pub center: DVec2,
    pub radius: f64,
}

impl CircleCollider {
    /// Signed distance of `point` to this circle.
    ///
    /// At the exact center the gradient of the distance field is undefined;
    /// by convention (§4.2) this returns `(-radius, +X)`.
    pub fn sdf(&self, point: DVec2) -> Sdf {
        let offset = point - self.center;
        let dist = offset.length();
        if dist < 1e-12 {
            return Sdf {
                phi: -self.radius,
                normal: DVec2::X,
            };
        }
        Sdf {
            phi: dist - self.radius,
            normal: offset / dist,
        }
    }
}

/// An immovable capsule collider: a line segment of length `2 * half_length`
/// along `axis`, centered at `center`, inflated by `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleCollider {
    pub center: DVec2,
    /// Unit axis direction of the capsule's spine.
    pub axis: DVec2,
    pub half_length: f64,
    pub radius: f64,
}

impl CapsuleCollider {
    pub fn sdf(&self, point: DVec2) -> Sdf {
        // Degenerate axis (coincident endpoints): fall back to treating
        // the capsule as a circle, using an arbitrary but stable tangent.
        let axis = if self.axis.length_squared() < 1e-12 {
            DVec2::X
        } else {
            self.axis.normalize()
        };
        let to_point = point - self.center;
        let along = to_point.dot(axis).clamp(-self.half_length, self.half_length);
        let nearest_on_spine = self.center + axis * along;
        let offset = point - nearest_on_spine;
        let dist = offset.length();
        let normal = if dist < 1e-12 {
            perp(axis)
        } else {
            offset / dist
        };
        Sdf {
            phi: dist - self.radius,
            normal,
        }
    }
}

/// An immovable oriented box collider, defined by a center, a unit
/// local-X axis, and half-extents along the local X/Y axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxCollider {
    pub center: DVec2,
    /// Unit vector giving the box's local +X axis in world space.
    pub local_x: DVec2,
    pub half_extents: DVec2,
}

impl BoxCollider {
    pub fn sdf(&self, point: DVec2) -> Sdf {
        let local_x = if self.local_x.length_squared() < 1e-12 {
            DVec2::X
        } else {
            self.local_x.normalize()
        };
        let local_y = perp(local_x);
        let offset = point - self.center;
        let local = DVec2::new(offset.dot(local_x), offset.dot(local_y));

        let d = local.abs() - self.half_extents;
        let outside = d.max(DVec2::ZERO);
        let outside_dist = outside.length();

        if outside_dist > 1e-12 {
            // Strictly outside: standard box SDF, normal from the gradient
            // of the clamped offset.
            let normal_local = DVec2::new(
                if local.x >= 0.0 { outside.x } else { -outside.x },
                if local.y >= 0.0 { outside.y } else { -outside.y },
            ) / outside_dist;
            let normal = normal_local.x * local_x + normal_local.y * local_y;
            return Sdf {
                phi: outside_dist,
                normal,
            };
        }

        // Inside (or exactly on the boundary): distance is negative,
        // magnitude is the distance to the nearest face; normal points
        // along that face's axis.
        let dx = self.half_extents.x - local.x.abs();
        let dy = self.half_extents.y - local.y.abs();

        // Tie-break at the box center toward the axis of the smaller
        // remaining half-extent, per §4.2.
        let use_x = if (dx - dy).abs() < 1e-12 {
            self.half_extents.x <= self.half_extents.y
        } else {
            dx < dy
        };

        let (phi, normal_local) = if use_x {
            let sign = if local.x >= 0.0 { 1.0 } else { -1.0 };
            (-dx, DVec2::new(sign, 0.0))
        } else {
            let sign = if local.y >= 0.0 { 1.0 } else { -1.0 };
            (-dy, DVec2::new(0.0, sign))
        };
        let normal = normal_local.x * local_x + normal_local.y * local_y;
        Sdf { phi, normal }
    }
}

/// Tagged collider kind, used in [`crate::dynamics::solver::contact::ContactId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    Circle,
    Capsule,
    Box,
}

/// The three homogeneous static-collider arrays owned by a [`crate::world::World`].
#[derive(Clone, Debug, Default)]
pub struct Colliders {
    pub circles: Vec<CircleCollider>,
    pub capsules: Vec<CapsuleCollider>,
    pub boxes: Vec<BoxCollider>,
}

impl Colliders {
    /// Evaluate the SDF of every collider against `point`, returning the
    /// closest one along with its kind and index.
    pub fn closest(&self, point: DVec2) -> Option<(ColliderKind, usize, Sdf)> {
        let mut best: Option<(ColliderKind, usize, Sdf)> = None;
        let mut consider = |kind: ColliderKind, idx: usize, sdf: Sdf| {
            if best.map(|(_, _, b)| sdf.phi < b.phi).unwrap_or(true) {
                best = Some((kind, idx, sdf));
            }
        };
        for (i, c) in self.circles.iter().enumerate() {
            consider(ColliderKind::Circle, i, c.sdf(point));
        }
        for (i, c) in self.capsules.iter().enumerate() {
            consider(ColliderKind::Capsule, i, c.sdf(point));
        }
        for (i, c) in self.boxes.iter().enumerate() {
            consider(ColliderKind::Box, i, c.sdf(point));
        }
        best
    }

    /// Evaluate the SDF of a specific `(kind, index)` collider.
    pub fn sdf_of(&self, kind: ColliderKind, index: usize, point: DVec2) -> Sdf {
        match kind {
            ColliderKind::Circle => self.circles[index].sdf(point),
            ColliderKind::Capsule => self.capsules[index].sdf(point),
            ColliderKind::Box => self.boxes[index].sdf(point),
        }
    }

    pub fn len(&self) -> usize {
        self.circles.len() + self.capsules.len() + self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute the world-space center of a circle geom attached to a rigid
/// body at `body_center`/`body_angle`.
#[inline]
pub fn geom_world_center(body_center: DVec2, body_angle: f64, local_offset: DVec2) -> DVec2 {
    body_center + rotate(local_offset, body_angle)
}
