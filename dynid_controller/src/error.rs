//! Error types for initialization and command handling.
//!
//! Configuration errors are fatal to initialization. Command errors are
//! recoverable: the command is ignored and the controller stays idle. The
//! per-tick update has no error path.

use dynid_common::messages::JointName;
use thiserror::Error;

/// Initialization failure. The previously installed registry, if any, is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// No joints were configured.
    #[error("empty joint list")]
    EmptyJointList,

    /// The resolver does not know this joint.
    #[error("no joint called `{0}`")]
    UnknownJoint(String),

    /// The same joint name appears twice.
    #[error("joint `{0}` listed more than once")]
    DuplicateJoint(String),
}

/// Rejected start command. The controller is idle afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Chunk size is zero or negative.
    #[error("invalid chunksize {0}")]
    InvalidChunkSize(i64),

    /// Chunk size exceeds the storage reserved at startup.
    #[error("chunksize {requested} exceeds limit {limit}")]
    ChunkSizeTooLarge {
        /// Requested chunk size.
        requested: i64,
        /// Configured `max_chunksize`.
        limit: usize,
    },

    /// Joint name is not in the registry, or too long to be one.
    #[error("invalid joint name `{0}`")]
    UnknownJoint(JointName),
}
