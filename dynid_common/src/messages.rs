//! Inbound start command and outbound data chunk payloads.
//!
//! Both types derive serde so any transport (JSON lines, a message bus,
//! shared memory with a serializer in front) can carry them unchanged.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::MAX_JOINT_NAME_LEN;

// ─── Joint Name ─────────────────────────────────────────────────────

/// Fixed-capacity joint name carried inline in a command.
///
/// A name longer than [`MAX_JOINT_NAME_LEN`] bytes is kept as its longest
/// prefix that fits, on a char boundary, and marked truncated. A truncated
/// name never matches a registered joint, so the command still reaches the
/// controller and is rejected there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointName {
    name: heapless::String<MAX_JOINT_NAME_LEN>,
    truncated: bool,
}

impl JointName {
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(MAX_JOINT_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut stored = heapless::String::new();
        // Cannot fail: `end <= MAX_JOINT_NAME_LEN`.
        let _ = stored.push_str(&name[..end]);
        Self {
            name: stored,
            truncated: end < name.len(),
        }
    }

    /// The stored name (the kept prefix when truncated).
    #[inline]
    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }

    /// True if the original name did not fit.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl From<&str> for JointName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Truncated names render with a trailing `...`, which keeps them over the
/// limit when serialized and decoded again.
impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())?;
        if self.truncated {
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl Serialize for JointName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct JointNameVisitor;

impl Visitor<'_> for JointNameVisitor {
    type Value = JointName;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a joint name string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JointName, E> {
        Ok(JointName::new(v))
    }
}

impl<'de> Deserialize<'de> for JointName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(JointNameVisitor)
    }
}

// ─── Start Command ──────────────────────────────────────────────────

/// Request to start exciting one joint.
///
/// Every field decodes from any value of its wire type, so a malformed
/// command (non-positive `chunksize`, over-long joint name) reaches the
/// controller and is rejected there instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartCommand {
    /// Joint to excite.
    pub joint_name: JointName,
    /// Samples per published chunk.
    pub chunksize: i64,
    /// Position at or below which the torque pushes upward.
    pub lower_position: f64,
    /// Position at or above which the torque pushes downward.
    pub upper_position: f64,
    /// Magnitude of the bang-bang torque.
    pub torque_magnitude: f64,
}

impl StartCommand {
    pub fn new(
        joint_name: &str,
        chunksize: i64,
        lower_position: f64,
        upper_position: f64,
        torque_magnitude: f64,
    ) -> Self {
        Self {
            joint_name: JointName::new(joint_name),
            chunksize,
            lower_position,
            upper_position,
            torque_magnitude,
        }
    }

    /// Joint name as a string slice.
    #[inline]
    pub fn joint_name(&self) -> &str {
        self.joint_name.as_str()
    }
}

// ─── Data Chunk ─────────────────────────────────────────────────────

/// One timestamped sample of the excited joint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Tick index within the session.
    pub tick: u64,
    /// Elapsed time since session start [ms].
    pub milliseconds: f64,
    /// Commanded torque.
    pub command_torque: f64,
    /// Measured position.
    pub position: f64,
    /// Measured velocity.
    pub velocity: f64,
    /// Measured (applied) torque.
    pub applied_torque: f64,
}

/// A chunk of samples as six parallel sequences of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataChunk {
    pub tick: Vec<u64>,
    pub milliseconds: Vec<f64>,
    pub command_torque: Vec<f64>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub applied_torque: Vec<f64>,
}

impl DataChunk {
    /// Empty chunk with room for `capacity` samples in every sequence.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tick: Vec::with_capacity(capacity),
            milliseconds: Vec::with_capacity(capacity),
            command_torque: Vec::with_capacity(capacity),
            position: Vec::with_capacity(capacity),
            velocity: Vec::with_capacity(capacity),
            applied_torque: Vec::with_capacity(capacity),
        }
    }

    /// Number of samples (length of every sequence).
    #[inline]
    pub fn len(&self) -> usize {
        self.tick.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tick.is_empty()
    }

    /// Smallest capacity across the six sequences.
    pub fn capacity(&self) -> usize {
        [
            self.tick.capacity(),
            self.milliseconds.capacity(),
            self.command_torque.capacity(),
            self.position.capacity(),
            self.velocity.capacity(),
            self.applied_torque.capacity(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }

    /// True if all six sequences have the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.tick.len();
        self.milliseconds.len() == n
            && self.command_torque.len() == n
            && self.position.len() == n
            && self.velocity.len() == n
            && self.applied_torque.len() == n
    }

    /// Set every sequence to `len` zeroed samples.
    ///
    /// Does not allocate while `len <= capacity()`.
    pub fn resize(&mut self, len: usize) {
        self.tick.clear();
        self.tick.resize(len, 0);
        for seq in self.float_sequences_mut() {
            seq.clear();
            seq.resize(len, 0.0);
        }
    }

    /// Zero every sample in place, keeping the length.
    pub fn zero(&mut self) {
        self.tick.fill(0);
        for seq in self.float_sequences_mut() {
            seq.fill(0.0);
        }
    }

    /// Overwrite the sample at `index`. Panics if out of range.
    #[inline]
    pub fn set(&mut self, index: usize, sample: Sample) {
        self.tick[index] = sample.tick;
        self.milliseconds[index] = sample.milliseconds;
        self.command_torque[index] = sample.command_torque;
        self.position[index] = sample.position;
        self.velocity[index] = sample.velocity;
        self.applied_torque[index] = sample.applied_torque;
    }

    /// Sample at `index`, if present.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        if index >= self.len() || !self.is_consistent() {
            return None;
        }
        Some(Sample {
            tick: self.tick[index],
            milliseconds: self.milliseconds[index],
            command_torque: self.command_torque[index],
            position: self.position[index],
            velocity: self.velocity[index],
            applied_torque: self.applied_torque[index],
        })
    }

    /// Iterate over samples in order.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    /// Copy `other` into `self`, reusing existing allocations.
    pub fn copy_from(&mut self, other: &DataChunk) {
        self.tick.clone_from(&other.tick);
        self.milliseconds.clone_from(&other.milliseconds);
        self.command_torque.clone_from(&other.command_torque);
        self.position.clone_from(&other.position);
        self.velocity.clone_from(&other.velocity);
        self.applied_torque.clone_from(&other.applied_torque);
    }

    fn float_sequences_mut(&mut self) -> [&mut Vec<f64>; 5] {
        [
            &mut self.milliseconds,
            &mut self.command_torque,
            &mut self.position,
            &mut self.velocity,
            &mut self.applied_torque,
        ]
    }
}

static_assertions::assert_impl_all!(JointName: Send, Sync);
static_assertions::assert_impl_all!(StartCommand: Send, Sync);
static_assertions::assert_impl_all!(DataChunk: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_from_json() {
        let json = r#"{
            "joint_name": "j1",
            "chunksize": 4,
            "lower_position": -1.0,
            "upper_position": 1.0,
            "torque_magnitude": 2.0
        }"#;
        let cmd: StartCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.joint_name(), "j1");
        assert_eq!(cmd.chunksize, 4);
        assert_eq!(cmd.torque_magnitude, 2.0);
    }

    #[test]
    fn start_command_accepts_non_positive_chunksize() {
        let cmd = StartCommand::new("j0", -3, 0.0, 1.0, 1.0);
        assert_eq!(cmd.chunksize, -3);
    }

    #[test]
    fn long_name_is_kept_truncated() {
        let name = "n".repeat(MAX_JOINT_NAME_LEN + 1);
        let cmd = StartCommand::new(&name, 1, 0.0, 1.0, 1.0);
        assert!(cmd.joint_name.is_truncated());
        assert_eq!(cmd.joint_name().len(), MAX_JOINT_NAME_LEN);

        let exact = JointName::new(&name[..MAX_JOINT_NAME_LEN]);
        assert!(!exact.is_truncated());
        assert_ne!(cmd.joint_name, exact);
    }

    #[test]
    fn long_name_decodes_from_json() {
        let json = format!(
            r#"{{"joint_name":"{}","chunksize":4,"lower_position":-1.0,"upper_position":1.0,"torque_magnitude":2.0}}"#,
            "x".repeat(MAX_JOINT_NAME_LEN + 1)
        );
        let cmd: StartCommand = serde_json::from_str(&json).unwrap();
        assert!(cmd.joint_name.is_truncated());
        assert_eq!(cmd.chunksize, 4);
    }

    #[test]
    fn truncated_name_stays_truncated_through_json() {
        let cmd = StartCommand::new(&"y".repeat(100), 4, -1.0, 1.0, 2.0);
        let json = serde_json::to_string(&cmd).unwrap();
        let back: StartCommand = serde_json::from_str(&json).unwrap();
        assert!(back.joint_name.is_truncated());
        assert_eq!(back, cmd);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 63 ASCII bytes followed by a 2-byte char straddling the limit.
        let name = format!("{}é", "a".repeat(MAX_JOINT_NAME_LEN - 1));
        let joint = JointName::new(&name);
        assert!(joint.is_truncated());
        assert_eq!(joint.as_str(), "a".repeat(MAX_JOINT_NAME_LEN - 1));
        assert_eq!(joint.to_string(), format!("{}...", joint.as_str()));
    }

    #[test]
    fn chunk_resize_within_capacity_keeps_storage() {
        let mut chunk = DataChunk::with_capacity(16);
        let ptr = chunk.position.as_ptr();
        chunk.resize(10);
        assert_eq!(chunk.len(), 10);
        assert!(chunk.is_consistent());
        chunk.resize(16);
        assert_eq!(chunk.position.as_ptr(), ptr);
        assert!(chunk.capacity() >= 16);
    }

    #[test]
    fn chunk_set_and_read_back() {
        let mut chunk = DataChunk::with_capacity(2);
        chunk.resize(2);
        let s = Sample {
            tick: 7,
            milliseconds: 7.5,
            command_torque: -2.0,
            position: 1.1,
            velocity: 0.3,
            applied_torque: -1.9,
        };
        chunk.set(1, s);
        assert_eq!(chunk.sample(1), Some(s));
        assert_eq!(chunk.sample(2), None);
        assert_eq!(chunk.samples().count(), 2);

        chunk.zero();
        assert_eq!(chunk.sample(1), Some(Sample::default()));
    }

    #[test]
    fn chunk_copy_from_reuses_allocation() {
        let mut src = DataChunk::with_capacity(4);
        src.resize(4);
        src.tick.copy_from_slice(&[4, 5, 6, 7]);

        let mut dst = DataChunk::with_capacity(8);
        let ptr = dst.tick.as_ptr();
        dst.copy_from(&src);
        assert_eq!(dst, src);
        assert_eq!(dst.tick.as_ptr(), ptr);
    }

    #[test]
    fn chunk_json_shape() {
        let mut chunk = DataChunk::with_capacity(1);
        chunk.resize(1);
        let value = serde_json::to_value(&chunk).unwrap();
        for key in [
            "tick",
            "milliseconds",
            "command_torque",
            "position",
            "velocity",
            "applied_torque",
        ] {
            assert_eq!(value[key].as_array().map(Vec::len), Some(1), "{key}");
        }
    }
}
