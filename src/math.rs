//! Vector and angle primitives shared by every solver.
//!
//! The engine works entirely in `f64` (`DVec2`) so that the determinism
//! contract (bit-identical trajectories at `1e-6` absolute tolerance over
//! thousands of steps) has headroom; see the crate's dependency notes in
//! `DESIGN.md` for why `glam` was chosen over a hand-rolled vector type.

use glam::DVec2;

/// 2D scalar cross product `u.x * v.y - u.y * v.x`.
#[inline]
pub fn cross(u: DVec2, v: DVec2) -> f64 {
    u.x * v.y - u.y * v.x
}

/// Rotate a vector 90 degrees counter-clockwise: `perp((x, y)) = (-y, x)`.
#[inline]
pub fn perp(v: DVec2) -> DVec2 {
    DVec2::new(-v.y, v.x)
}

/// Wrap an angle to `(-pi, pi]`.
#[inline]
pub fn wrap_angle(mut theta: f64) -> f64 {
    const TAU: f64 = std::f64::consts::TAU;
    theta %= TAU;
    if theta <= -std::f64::consts::PI {
        theta += TAU;
    } else if theta > std::f64::consts::PI {
        theta -= TAU;
    }
    theta
}

/// Signed angle from `u` to `v`, in `(-pi, pi]`.
#[inline]
pub fn signed_angle(u: DVec2, v: DVec2) -> f64 {
    f64::atan2(cross(u, v), u.dot(v))
}

/// Rotate a local-space offset by an angle (radians) to get a world-space offset.
#[inline]
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (s, c) = angle.sin_cos();
    DVec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}
