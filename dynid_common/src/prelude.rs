//! Prelude module for common re-exports.
//!
//! ```rust
//! use dynid_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControllerConfig, DynIdConfig, LogLevel, SharedConfig,
    SimulationConfig,
};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_JOINT_NAME_LEN};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::joint::{JointResolver, JointState};

// ─── Messages ───────────────────────────────────────────────────────
pub use crate::messages::{DataChunk, JointName, Sample, StartCommand};
