//! Simulated joint plant.
//!
//! `SimRobot` stands in for real hardware: it resolves joint names to
//! lock-free [`SimJoint`] handles and integrates simple rigid-joint dynamics
//! once per cycle:
//!
//! ```text
//! inertia · a = τ_cmd − damping · v − coulomb · sign(v)
//! ```
//!
//! with static friction holding the joint while `|τ_cmd| <= coulomb` at rest.
//! The measured effort reported back is the command applied in that step.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dynid_common::config::SimulationConfig;
use dynid_common::joint::{JointResolver, JointState};
use tracing::debug;

/// Velocity below which the joint is considered at rest [units/s].
const REST_VELOCITY: f64 = 1e-6;

/// `f64` stored as bits in an `AtomicU64`.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    #[inline]
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct JointCell {
    position: AtomicF64,
    velocity: AtomicF64,
    measured_effort: AtomicF64,
    commanded_effort: AtomicF64,
}

/// Handle to one simulated joint.
///
/// Clones refer to the same joint. Reads and writes are single atomic
/// loads/stores, so handles can be shared between the plant and the
/// controller without locking.
#[derive(Debug, Clone, Default)]
pub struct SimJoint {
    cell: Arc<JointCell>,
}

impl SimJoint {
    /// Effort most recently commanded by the controller.
    pub fn commanded_effort(&self) -> f64 {
        self.cell.commanded_effort.load()
    }

    /// Override the position (test and scenario setup).
    pub fn set_position(&self, position: f64) {
        self.cell.position.store(position);
    }

    /// Override the velocity (test and scenario setup).
    pub fn set_velocity(&self, velocity: f64) {
        self.cell.velocity.store(velocity);
    }

    /// Override the measured effort (test and scenario setup).
    pub fn set_measured_effort(&self, effort: f64) {
        self.cell.measured_effort.store(effort);
    }
}

impl JointState for SimJoint {
    #[inline]
    fn position(&self) -> f64 {
        self.cell.position.load()
    }

    #[inline]
    fn velocity(&self) -> f64 {
        self.cell.velocity.load()
    }

    #[inline]
    fn measured_effort(&self) -> f64 {
        self.cell.measured_effort.load()
    }

    #[inline]
    fn set_commanded_effort(&mut self, effort: f64) {
        self.cell.commanded_effort.store(effort);
    }
}

/// A set of named simulated joints sharing one parameter set.
pub struct SimRobot {
    joints: Vec<(String, SimJoint)>,
    params: SimulationConfig,
}

impl SimRobot {
    /// Create joints at rest at position zero.
    pub fn new<S: AsRef<str>>(names: &[S], params: SimulationConfig) -> Self {
        let joints = names
            .iter()
            .map(|n| (n.as_ref().to_string(), SimJoint::default()))
            .collect();
        Self { joints, params }
    }

    /// Handle to the joint called `name`.
    pub fn joint(&self, name: &str) -> Option<SimJoint> {
        self.joints
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, j)| j.clone())
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Advance every joint by `dt` using the effort currently commanded.
    pub fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        for (_, joint) in &self.joints {
            let cell = &joint.cell;
            let tau = cell.commanded_effort.load();
            let v = cell.velocity.load();

            let v_next = if v.abs() < REST_VELOCITY && tau.abs() <= self.params.coulomb_friction {
                0.0
            } else {
                let friction = if v.abs() < REST_VELOCITY {
                    self.params.coulomb_friction * tau.signum()
                } else {
                    self.params.coulomb_friction * v.signum()
                };
                let acc = (tau - self.params.damping * v - friction) / self.params.inertia;
                v + acc * dt
            };

            cell.velocity.store(v_next);
            cell.position.store(cell.position.load() + v_next * dt);
            cell.measured_effort.store(tau);
        }
    }
}

impl JointResolver for SimRobot {
    type Joint = SimJoint;

    fn resolve(&self, name: &str) -> Option<SimJoint> {
        let joint = self.joint(name);
        if joint.is_none() {
            debug!("simulation has no joint `{name}`");
        }
        joint
    }
}

static_assertions::assert_impl_all!(SimJoint: Send, Sync);
