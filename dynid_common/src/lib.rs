//! Dynamics Identification Common Library
//!
//! Shared types for the dynamics identification workspace: the wire
//! messages exchanged with the excitation controller, the collaborator
//! traits it drives joints through, and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide defaults and limits
//! - [`joint`] - Joint state / resolver collaborator traits
//! - [`messages`] - `StartCommand` and `DataChunk` payloads
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dynid_common::prelude::*;
//!
//! let cmd = StartCommand::new("elbow_flex", 500, -1.0, 1.0, 2.5);
//! assert_eq!(cmd.joint_name(), "elbow_flex");
//! ```

pub mod config;
pub mod consts;
pub mod joint;
pub mod messages;
pub mod prelude;
