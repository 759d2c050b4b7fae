//! Manages and solves particle constraints, rigid-body contacts, and
//! joints.
//!
//! # Implementation
//!
//! The engine runs two complementary solvers side by side within each
//! substep:
//!
//! - [`xpbd`] solves particle constraints (rods, angles, motor-angles,
//!   and particle-vs-collider contacts) using Extended Position-Based
//!   Dynamics. Corrections are applied directly to position, with an
//!   accumulated Lagrange multiplier per constraint recovering a
//!   time-step-independent stiffness (see [`xpbd::reset_lambdas`]).
//! - [`contact`] and [`joints`] solve rigid bodies using classic
//!   sequential impulses at the velocity level, with Baumgarte
//!   stabilization for contacts and a dedicated position-correction pass
//!   for joints. Contacts are warm-started from the previous substep via
//!   [`contact::WarmStartCache`].
//!
//! [`crate::stepper::Stepper`] is the only caller of this module; it owns
//! the per-substep scratch buffers (contact and joint constraint lists)
//! and the warm-start cache, and is responsible for running the fixed
//! constraint-sweep order described in each submodule's docs.

pub mod contact;
pub mod joints;
pub mod xpbd;
