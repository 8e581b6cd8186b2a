//! Excitation controller: chunked sampling and publishing inside the tick.
//!
//! One joint at a time is driven with a bang-bang torque between two
//! position bounds. Every tick records a sample into the current slot of a
//! reusable buffer; once the buffer wraps, the completed chunk is handed to
//! the sink *before* slot 0 is overwritten, so publishing is one tick late
//! and needs no second buffer.
//!
//! ## State
//!
//! | Field | Reset by |
//! |-------|----------|
//! | registry | successful `init` (full rebuild) |
//! | session | every start command (cleared first, set on success) |
//! | tick, held torque, time reference | successful start command |
//!
//! ## RT contract
//!
//! [`update`](ExcitationController::update) never fails, blocks or
//! allocates. Validation and buffer sizing happen in
//! [`handle_start`](ExcitationController::handle_start), against storage
//! reserved at construction.

use std::num::NonZeroUsize;
use std::time::Duration;

use dynid_common::joint::{JointResolver, JointState};
use dynid_common::messages::{Sample, StartCommand};
use tracing::{error, info};

use crate::buffer::SampleBuffer;
use crate::clock::Clock;
use crate::error::{CommandError, InitError};
use crate::excitation::TorqueDecision;
use crate::registry::JointRegistry;
use crate::sink::ChunkSink;

// ─── Session ────────────────────────────────────────────────────────

/// Parameters of the active excitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    /// Registry index of the excited joint.
    pub joint_index: usize,
    /// Samples per published chunk.
    pub chunksize: NonZeroUsize,
    pub lower_position: f64,
    pub upper_position: f64,
    pub torque_magnitude: f64,
}

/// Counters, updated without allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Start commands that started a session.
    pub accepted_commands: u64,
    /// Start commands that were rejected.
    pub rejected_commands: u64,
    /// Chunks handed to the sink.
    pub published_chunks: u64,
    /// Ticks spent with no active session.
    pub idle_ticks: u64,
}

// ─── Controller ─────────────────────────────────────────────────────

/// Single-joint bang-bang excitation controller.
///
/// `J` is the joint handle type, `S` the chunk sink, `C` the clock.
pub struct ExcitationController<J, S, C> {
    registry: JointRegistry<J>,
    session: Option<Session>,
    buffer: SampleBuffer,
    max_chunksize: usize,
    tick: u64,
    t0: Duration,
    command_torque: f64,
    sink: S,
    clock: C,
    stats: ControllerStats,
}

impl<J, S, C> ExcitationController<J, S, C>
where
    J: JointState,
    S: ChunkSink,
    C: Clock,
{
    /// Create an uninitialized controller.
    ///
    /// Sample storage for `max_chunksize` samples is reserved here; start
    /// commands asking for more are rejected.
    pub fn new(sink: S, clock: C, max_chunksize: usize) -> Self {
        let t0 = clock.now();
        Self {
            registry: JointRegistry::default(),
            session: None,
            buffer: SampleBuffer::with_capacity(max_chunksize),
            max_chunksize,
            tick: 0,
            t0,
            command_torque: 0.0,
            sink,
            clock,
            stats: ControllerStats::default(),
        }
    }

    /// Build the joint registry from `names`.
    ///
    /// On success the new registry replaces the old one and the controller
    /// is idle. On failure nothing changes.
    pub fn init<R, N>(&mut self, names: &[N], resolver: &R) -> Result<(), InitError>
    where
        R: JointResolver<Joint = J>,
        N: AsRef<str>,
    {
        let registry = match JointRegistry::build(names, resolver) {
            Ok(registry) => registry,
            Err(e) => {
                error!("init failed: {e}");
                return Err(e);
            }
        };

        self.registry = registry;
        self.session = None;
        info!(joints = self.registry.len(), "ready to excite");
        Ok(())
    }

    /// True once a registry is installed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Handle a start command.
    ///
    /// The controller goes idle first, so a rejected command stops any
    /// running excitation instead of leaving it in place.
    ///
    /// # Errors
    /// - [`CommandError::InvalidChunkSize`] if `chunksize <= 0`
    /// - [`CommandError::ChunkSizeTooLarge`] if `chunksize` exceeds the
    ///   `max_chunksize` given to [`ExcitationController::new`]
    /// - [`CommandError::UnknownJoint`] if the name is not registered or
    ///   was truncated on the way in
    pub fn handle_start(&mut self, command: &StartCommand) -> Result<(), CommandError> {
        self.session = None;

        match self.validate(command) {
            Ok(session) => {
                self.buffer.prepare(session.chunksize.get());
                self.session = Some(session);
                self.tick = 0;
                self.command_torque = 0.0;
                self.t0 = self.clock.now();
                self.stats.accepted_commands += 1;
                info!(
                    joint = command.joint_name(),
                    chunksize = session.chunksize.get(),
                    lower = session.lower_position,
                    upper = session.upper_position,
                    torque = session.torque_magnitude,
                    "excitation started"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.rejected_commands += 1;
                error!("start command rejected: {e}");
                Err(e)
            }
        }
    }

    fn validate(&self, command: &StartCommand) -> Result<Session, CommandError> {
        if command.chunksize <= 0 {
            return Err(CommandError::InvalidChunkSize(command.chunksize));
        }
        let chunksize = usize::try_from(command.chunksize)
            .ok()
            .filter(|&n| n <= self.max_chunksize)
            .and_then(NonZeroUsize::new)
            .ok_or(CommandError::ChunkSizeTooLarge {
                requested: command.chunksize,
                limit: self.max_chunksize,
            })?;

        let joint_index = match self.registry.index_of(command.joint_name()) {
            Some(index) if !command.joint_name.is_truncated() => index,
            _ => return Err(CommandError::UnknownJoint(command.joint_name.clone())),
        };

        Ok(Session {
            joint_index,
            chunksize,
            lower_position: command.lower_position,
            upper_position: command.upper_position,
            torque_magnitude: command.torque_magnitude,
        })
    }

    /// Run one control tick.
    pub fn update(&mut self) {
        let elapsed = self.clock.now().saturating_sub(self.t0);

        let Some(session) = self.session else {
            self.registry.zero_all();
            self.stats.idle_ticks += 1;
            return;
        };

        let chunksize = session.chunksize.get() as u64;
        let slot = (self.tick % chunksize) as usize;
        if slot == 0 && self.tick > 0 {
            self.sink.publish(self.buffer.chunk());
            self.stats.published_chunks += 1;
        }

        let Some(joint) = self.registry.get(session.joint_index) else {
            // Unreachable: `init` clears the session whenever the registry changes.
            self.registry.zero_all();
            return;
        };
        let position = joint.position();
        let velocity = joint.velocity();
        let applied_torque = joint.measured_effort();

        self.command_torque = TorqueDecision::from_position(
            position,
            session.lower_position,
            session.upper_position,
        )
        .torque(session.torque_magnitude, self.command_torque);

        self.buffer.write(
            slot,
            Sample {
                tick: self.tick,
                milliseconds: elapsed.as_nanos() as f64 * 1e-6,
                command_torque: self.command_torque,
                position,
                velocity,
                applied_torque,
            },
        );

        self.registry
            .actuate_only(session.joint_index, self.command_torque);

        self.tick += 1;
    }

    /// Stop exciting and command zero effort on every joint.
    ///
    /// Used on shutdown; not reachable from the command inbox.
    pub fn go_idle(&mut self) {
        self.session = None;
        self.registry.zero_all();
    }

    /// Index of the excited joint, `None` when idle.
    #[inline]
    pub fn active_joint(&self) -> Option<usize> {
        self.session.map(|s| s.joint_index)
    }

    #[inline]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn registry(&self) -> &JointRegistry<J> {
        &self.registry
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
