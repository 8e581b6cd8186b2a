//! Workspace-wide constants and defaults.

/// Maximum length of a joint name carried in a [`StartCommand`].
///
/// Joint names travel inline in a fixed-capacity string so that commands can
/// be dropped on the RT thread without touching the allocator.
///
/// [`StartCommand`]: crate::messages::StartCommand
pub const MAX_JOINT_NAME_LEN: usize = 64;

/// Default control cycle time in microseconds (1 kHz).
pub const DEFAULT_CYCLE_TIME_US: u32 = 1000;

/// Default upper bound on samples per published chunk.
pub const DEFAULT_MAX_CHUNKSIZE: usize = 10_000;

/// Default start command inbox depth.
pub const DEFAULT_COMMAND_QUEUE_DEPTH: usize = 1;

/// Default number of pooled outbound chunks.
pub const DEFAULT_DATA_POOL_SIZE: usize = 8;

/// Default simulated joint inertia [kg·m²].
pub const DEFAULT_SIM_INERTIA: f64 = 0.05;

/// Default simulated viscous damping [N·m·s/rad].
pub const DEFAULT_SIM_DAMPING: f64 = 0.2;

/// Default simulated Coulomb friction [N·m].
pub const DEFAULT_SIM_COULOMB_FRICTION: f64 = 0.3;
