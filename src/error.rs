//! Structured errors returned by the world-building API (§7, §10.2).
//!
//! Only the builder surface of [`crate::world::World`] can fail. Once a
//! world is built, the solvers never return an error: degenerate runtime
//! configurations are guarded and short-circuited in place instead.

use thiserror::Error;

/// An error raised while building a [`crate::world::World`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BuildError {
    #[error("particle index {0} is out of bounds")]
    InvalidParticleIndex(usize),

    #[error("rigid body index {0} is out of bounds")]
    InvalidBodyIndex(usize),

    #[error("collider index {index} of kind {kind:?} is out of bounds")]
    InvalidColliderIndex {
        kind: crate::collider::ColliderKind,
        index: usize,
    },

    #[error("mass must be positive, got {0}")]
    NonPositiveMass(f64),

    #[error("value for field `{field}` is not finite: {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("a rigid body must have at least one geom")]
    EmptyGeomSet,
}

/// Check that every component of `v` is finite, tagging the error with `field`.
pub(crate) fn check_finite_scalar(field: &'static str, value: f64) -> Result<(), BuildError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BuildError::NotFinite { field, value })
    }
}

pub(crate) fn check_finite_vec2(
    field: &'static str,
    value: glam::DVec2,
) -> Result<(), BuildError> {
    check_finite_scalar(field, value.x)?;
    check_finite_scalar(field, value.y)
}
