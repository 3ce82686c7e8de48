//! World-state collaborator.
//!
//! The scope only needs an opaque save/restore pair ([`WorldState`]).
//! [`SimWorld`] is a small in-process world (object poses, attachments,
//! robot base and torso) that plans and tests can drive.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Opaque save/restore of simulation state.
pub trait WorldState {
    type Snapshot;

    fn save_state(&mut self) -> Self::Snapshot;

    fn restore_state(&mut self, snapshot: Self::Snapshot);
}

/// Position plus orientation quaternion `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl Pose {
    pub fn new(position: [f64; 3], orientation: [f64; 4]) -> Self {
        Pose {
            position,
            orientation,
        }
    }

    /// A pose at `position` with identity orientation.
    pub fn at(position: [f64; 3]) -> Self {
        Pose::new(position, [0.0, 0.0, 0.0, 1.0])
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::at([0.0, 0.0, 0.0])
    }
}

/// Everything a [`SimWorld`] knows; also its snapshot type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    pub objects: BTreeMap<String, Pose>,
    /// Object name to the robot link it is attached to.
    pub attachments: BTreeMap<String, String>,
    pub robot_pose: Pose,
    pub torso_height: f64,
}

/// Shared handle to an in-process world.
///
/// Clones share the same state, so plan bodies can capture a handle while
/// a scope holds another for save/restore.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    inner: Arc<Mutex<WorldData>>,
}

impl SimWorld {
    pub fn new() -> Self {
        SimWorld::default()
    }

    /// A copy of the current state.
    pub fn data(&self) -> WorldData {
        self.inner.lock().clone()
    }

    pub fn add_object(&self, name: impl Into<String>, pose: Pose) {
        self.inner.lock().objects.insert(name.into(), pose);
    }

    pub fn object_pose(&self, name: &str) -> Option<Pose> {
        self.inner.lock().objects.get(name).copied()
    }

    /// Moves an existing object. Returns false for unknown objects.
    pub fn set_object_pose(&self, name: &str, pose: Pose) -> bool {
        match self.inner.lock().objects.get_mut(name) {
            Some(slot) => {
                *slot = pose;
                true
            }
            None => false,
        }
    }

    /// Attaches an existing object to a robot link. Returns false for
    /// unknown objects.
    pub fn attach(&self, object: &str, link: impl Into<String>) -> bool {
        let mut data = self.inner.lock();
        if !data.objects.contains_key(object) {
            return false;
        }
        data.attachments.insert(object.to_string(), link.into());
        true
    }

    /// Detaches an object, returning the link it was attached to.
    pub fn detach(&self, object: &str) -> Option<String> {
        self.inner.lock().attachments.remove(object)
    }

    pub fn attached_link(&self, object: &str) -> Option<String> {
        self.inner.lock().attachments.get(object).cloned()
    }

    pub fn robot_pose(&self) -> Pose {
        self.inner.lock().robot_pose
    }

    pub fn set_robot_pose(&self, pose: Pose) {
        self.inner.lock().robot_pose = pose;
    }

    pub fn torso_height(&self) -> f64 {
        self.inner.lock().torso_height
    }

    pub fn set_torso_height(&self, height: f64) {
        self.inner.lock().torso_height = height;
    }
}

impl WorldState for SimWorld {
    type Snapshot = WorldData;

    fn save_state(&mut self) -> WorldData {
        self.data()
    }

    fn restore_state(&mut self, snapshot: WorldData) {
        *self.inner.lock() = snapshot;
    }
}
