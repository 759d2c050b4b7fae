//! A deterministic, fixed-timestep 2D physics engine built as simulation
//! substrate for evolutionary reinforcement-learning workloads: identical
//! inputs must produce bit-identical trajectories, run after run, world
//! after world, whether stepped alone or as one of a large batch.
//!
//! The engine combines two solvers:
//!
//! - Soft-body particle assemblies (rods, angle constraints, motor-driven
//!   angle constraints) solved with Extended Position-Based Dynamics
//!   ([`dynamics::solver::xpbd`]).
//! - Rigid bodies made of circle geoms, solved with sequential impulses
//!   against static collider surfaces ([`dynamics::solver::contact`]) and
//!   connected with revolute joints ([`dynamics::solver::joints`]).
//!
//! [`stepper::Stepper`] drives both solvers through one substep in a fixed
//! order every time; [`batched::BatchedWorld`] runs many [`world::World`]s
//! through that same order in lockstep, in parallel, against one shared
//! pool of static colliders.
//!
//! See [`config::SimulationConfig`] for the tunables and [`prelude`] for
//! the common entry points.

pub mod batched;
pub mod collider;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod post_process;
pub mod stepper;
pub mod world;

/// The common entry points for building and stepping a world.
pub mod prelude {
    pub use crate::batched::BatchedWorld;
    pub use crate::collider::{
        BoxCollider, CapsuleCollider, CircleCollider, ColliderKind, Colliders, Sdf,
    };
    pub use crate::config::SimulationConfig;
    pub use crate::error::BuildError;
    pub use crate::stepper::Stepper;
    pub use crate::world::{
        BodyId, CircleGeom, JointId, JointLimits, JointMotor, MotorId, ParticleId, RevoluteJoint,
        RigidBodyState, RodId, World,
    };
}
