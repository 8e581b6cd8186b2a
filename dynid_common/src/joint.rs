//! Joint collaborator traits.
//!
//! The excitation controller never talks to hardware directly. It reads and
//! actuates joints through [`JointState`] handles obtained from a
//! [`JointResolver`] at initialization time.
//!
//! # Timing Contracts
//!
//! | Operation | RT Constraint |
//! |-----------|---------------|
//! | `JointResolver::resolve()` | None (init only) |
//! | `JointState` accessors | **HARD**: non-blocking, no allocation |

/// Handle to one controllable joint.
///
/// Positions and velocities are in joint-specific units; efforts in the
/// joint's torque/force units.
pub trait JointState {
    /// Current measured position.
    fn position(&self) -> f64;

    /// Current measured velocity.
    fn velocity(&self) -> f64;

    /// Current measured (applied) effort.
    fn measured_effort(&self) -> f64;

    /// Command an effort, effective until the next write.
    fn set_commanded_effort(&mut self, effort: f64);
}

/// Resolves joint names to [`JointState`] handles.
pub trait JointResolver {
    /// Handle type produced by this resolver.
    type Joint: JointState;

    /// Look up a joint by name. `None` if no such joint exists.
    fn resolve(&self, name: &str) -> Option<Self::Joint>;
}
