//! Joint registry: ordered joint handles plus a name→index map.
//!
//! Built in one piece by [`JointRegistry::build`]; a failed build never
//! yields a partial registry.

use std::collections::HashMap;

use dynid_common::joint::{JointResolver, JointState};
use tracing::info;

use crate::error::InitError;

/// Ordered list of controllable joints.
///
/// Invariant: `names[i]` maps to `i` in `index`, and `joints`, `names` have
/// equal length.
pub struct JointRegistry<J> {
    joints: Vec<J>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl<J> Default for JointRegistry<J> {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            names: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<J: JointState> JointRegistry<J> {
    /// Resolve every name, in order, into a new registry.
    ///
    /// # Errors
    /// - [`InitError::EmptyJointList`] if `names` is empty
    /// - [`InitError::DuplicateJoint`] if a name repeats
    /// - [`InitError::UnknownJoint`] if the resolver does not know a name
    pub fn build<R, S>(names: &[S], resolver: &R) -> Result<Self, InitError>
    where
        R: JointResolver<Joint = J>,
        S: AsRef<str>,
    {
        if names.is_empty() {
            return Err(InitError::EmptyJointList);
        }

        let mut registry = Self {
            joints: Vec::with_capacity(names.len()),
            names: Vec::with_capacity(names.len()),
            index: HashMap::with_capacity(names.len()),
        };

        for name in names {
            let name = name.as_ref();
            if registry.index.contains_key(name) {
                return Err(InitError::DuplicateJoint(name.to_string()));
            }
            let joint = resolver
                .resolve(name)
                .ok_or_else(|| InitError::UnknownJoint(name.to_string()))?;
            info!("adding joint `{name}`");
            registry.index.insert(name.to_string(), registry.joints.len());
            registry.names.push(name.to_string());
            registry.joints.push(joint);
        }

        Ok(registry)
    }

    /// Number of registered joints.
    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Index of `name`, if registered.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the joint at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Registered names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, index: usize) -> Option<&J> {
        self.joints.get(index)
    }

    /// Command zero effort on every joint.
    pub fn zero_all(&mut self) {
        for joint in &mut self.joints {
            joint.set_commanded_effort(0.0);
        }
    }

    /// Command `effort` on joint `active` and zero on every other joint.
    pub fn actuate_only(&mut self, active: usize, effort: f64) {
        for (i, joint) in self.joints.iter_mut().enumerate() {
            joint.set_commanded_effort(if i == active { effort } else { 0.0 });
        }
    }
}
