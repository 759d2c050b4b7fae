//! Integration and constraint solving: everything that advances a
//! [`crate::world::World`] forward by one substep.

pub mod integrator;
pub mod solver;
