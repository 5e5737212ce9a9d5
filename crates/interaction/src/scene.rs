use serde::{Deserialize, Serialize};

use crate::math::{Pose, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Opaque transform-hierarchy node owned by the scene adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayer(pub u8);

impl CollisionLayer {
    pub const DEFAULT: Self = Self(0);
    /// Layer skipped by camera raycasts while an object is held.
    pub const IGNORE_RAYCAST: Self = Self(2);
}

impl Default for CollisionLayer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderState {
    pub is_trigger: bool,
    pub radius: f32,
}

impl Default for ColliderState {
    fn default() -> Self {
        Self {
            is_trigger: false,
            radius: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyState {
    pub is_kinematic: bool,
    pub use_gravity: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            is_kinematic: false,
            use_gravity: true,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl RigidBodyState {
    pub fn zero_velocities(&mut self) {
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }
}

/// Engine-side state of one interactable, mirrored in and out by the scene
/// adapter each frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneObject {
    pub pose: Pose,
    pub parent: Option<NodeId>,
    pub layer: CollisionLayer,
    pub collider: Option<ColliderState>,
    pub rigidbody: Option<RigidBodyState>,
}

impl SceneObject {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: Option<NodeId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_collider(mut self, collider: ColliderState) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_rigidbody(mut self, rigidbody: RigidBodyState) -> Self {
        self.rigidbody = Some(rigidbody);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub(crate) fn set_collider_trigger(&mut self, is_trigger: bool) {
        if let Some(collider) = self.collider.as_mut() {
            collider.is_trigger = is_trigger;
        }
    }
}
