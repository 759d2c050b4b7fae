//! Tunable parameters consumed by [`crate::stepper::Stepper::step`] (§6).

use glam::DVec2;

/// Per-constraint compliance override. `None` falls back to the config's
/// global default for that constraint type.
pub type ComplianceOverride = Option<f64>;

/// Simulation-wide tunable parameters. Plain data; no behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Substep duration in seconds.
    pub dt: f64,
    /// Number of substeps per call to `step`.
    pub substeps: u32,
    /// Constraint sweeps per substep.
    pub xpbd_iterations: u32,
    /// Gravity acceleration, m/s^2.
    #[cfg_attr(feature = "serde", serde(with = "dvec2_serde"))]
    pub gravity: DVec2,
    /// Particle-contact XPBD compliance.
    pub contact_compliance: f64,
    /// Particle-rod XPBD compliance.
    pub rod_compliance: f64,
    /// Particle-angle XPBD compliance.
    pub angle_compliance: f64,
    /// Motor-angle XPBD compliance.
    pub motor_compliance: f64,
    /// Coulomb friction coefficient for particles and rigid bodies.
    pub friction_mu: f64,
    /// Rigid-body normal restitution.
    pub restitution: f64,
    /// Blend factor for velocity stabilization (§4.7).
    pub velocity_stabilization_beta: f64,
    /// Global linear damping coefficient, per second.
    pub global_damping: f64,
    /// Global angular damping coefficient, per second.
    pub angular_damping: f64,
    /// Optional particle speed cap; `0.0` disables it.
    pub max_velocity: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 240.0,
            substeps: 1,
            xpbd_iterations: 12,
            gravity: DVec2::new(0.0, -9.81),
            contact_compliance: 1e-8,
            rod_compliance: 0.0,
            angle_compliance: 0.0,
            motor_compliance: 1e-6,
            friction_mu: 0.6,
            restitution: 0.0,
            velocity_stabilization_beta: 1.0,
            global_damping: 0.01,
            angular_damping: 0.1,
            max_velocity: 10.0,
        }
    }
}

impl SimulationConfig {
    /// The rod compliance to use for a single rod, honoring a per-rod override.
    pub fn rod_compliance_for(&self, override_: ComplianceOverride) -> f64 {
        override_.unwrap_or(self.rod_compliance)
    }

    /// The angle compliance to use for a single angle constraint.
    pub fn angle_compliance_for(&self, override_: ComplianceOverride) -> f64 {
        override_.unwrap_or(self.angle_compliance)
    }

    /// The motor compliance to use for a single motor constraint.
    pub fn motor_compliance_for(&self, override_: ComplianceOverride) -> f64 {
        override_.unwrap_or(self.motor_compliance)
    }
}

#[cfg(feature = "serde")]
mod dvec2_serde {
    use glam::DVec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &DVec2, s: S) -> Result<S::Ok, S::Error> {
        (v.x, v.y).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DVec2, D::Error> {
        let (x, y) = <(f64, f64)>::deserialize(d)?;
        Ok(DVec2::new(x, y))
    }
}
