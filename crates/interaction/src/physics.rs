use crate::scene::RigidBodyState;

/// Designer-authored physics flags, captured once and restored on every
/// release of a non-throwable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsSnapshot {
    pub is_kinematic: bool,
    pub use_gravity: bool,
}

impl PhysicsSnapshot {
    /// Throwables are forced dynamic so they fly immediately after release.
    pub fn capture(rigidbody: Option<&RigidBodyState>, throwable: bool) -> Option<Self> {
        let rigidbody = rigidbody?;
        if throwable {
            return Some(Self::dynamic());
        }
        Some(Self {
            is_kinematic: rigidbody.is_kinematic,
            use_gravity: rigidbody.use_gravity,
        })
    }

    pub fn dynamic() -> Self {
        Self {
            is_kinematic: false,
            use_gravity: true,
        }
    }

    pub fn held() -> Self {
        Self {
            is_kinematic: true,
            use_gravity: false,
        }
    }

    pub fn apply(self, rigidbody: Option<&mut RigidBodyState>) {
        if let Some(rigidbody) = rigidbody {
            rigidbody.is_kinematic = self.is_kinematic;
            rigidbody.use_gravity = self.use_gravity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_without_rigidbody_is_none() {
        assert_eq!(PhysicsSnapshot::capture(None, false), None);
        assert_eq!(PhysicsSnapshot::capture(None, true), None);
        PhysicsSnapshot::held().apply(None);
    }

    #[test]
    fn capture_keeps_designer_flags_for_plain_objects() {
        let body = RigidBodyState {
            is_kinematic: true,
            use_gravity: false,
            ..RigidBodyState::default()
        };
        assert_eq!(
            PhysicsSnapshot::capture(Some(&body), false),
            Some(PhysicsSnapshot {
                is_kinematic: true,
                use_gravity: false
            })
        );
    }

    #[test]
    fn capture_forces_dynamic_for_throwables() {
        let body = RigidBodyState {
            is_kinematic: true,
            use_gravity: false,
            ..RigidBodyState::default()
        };
        assert_eq!(
            PhysicsSnapshot::capture(Some(&body), true),
            Some(PhysicsSnapshot::dynamic())
        );
    }

    #[test]
    fn apply_writes_only_flags() {
        let mut body = RigidBodyState::default();
        body.linear_velocity.x = 3.0;
        PhysicsSnapshot::held().apply(Some(&mut body));
        assert!(body.is_kinematic);
        assert!(!body.use_gravity);
        assert_eq!(body.linear_velocity.x, 3.0);
    }
}
