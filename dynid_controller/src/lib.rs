//! # Dynamics Identification Excitation Controller
//!
//! Real-time single-joint excitation for system identification. One joint
//! at a time is driven with a bang-bang torque between two position bounds
//! while position, velocity, commanded and applied torque are sampled every
//! tick and published in fixed-size chunks for offline parameter fitting.
//!
//! ## Layers
//!
//! 1. **ExcitationController**: registry, session, sample buffer, tick
//! 2. **StartInbox / ChunkSink**: lock-free command ingress and chunk egress
//! 3. **CycleRunner**: deterministic pacing, RT setup, cycle statistics
//! 4. **SimRobot**: simulated joints standing in for hardware
//!
//! ## Zero-Allocation RT Loop
//!
//! Sample storage and outbound chunk pools are allocated at startup. The
//! tick reads and writes in-memory state and non-blocking joint handles
//! only.

pub mod buffer;
pub mod clock;
pub mod controller;
pub mod cycle;
pub mod error;
pub mod excitation;
pub mod inbox;
pub mod registry;
pub mod sim;
pub mod sink;
