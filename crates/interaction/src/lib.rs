mod authority;
mod avatar;
mod config;
mod coordinator;
pub mod defs;
pub mod detector;
mod events;
mod grabbable;
mod math;
mod physics;
pub mod safety;
mod scene;
mod throw;
mod trigger;
mod world;

pub use authority::{AuthorityGate, AuthorityTable, LocalAuthority, ParticipantId};
pub use avatar::{AvatarRig, Bone, CameraPose, HandAnchor};
pub use config::{
    AimMode, ConfigError, GrabConfig, InteractableConfig, SafetyConfig, ThrowConfig, ThrowModel,
    TriggerConfig,
};
pub use coordinator::{ExclusivityGroup, GrabCoordinator};
pub use defs::{
    compile_defs_dir, compile_defs_file, compile_defs_str, DefCompileError, DefErrorCode,
    InteractableDef, InteractableDefDatabase, InteractableDefId, SourceLocation,
};
pub use detector::Eligibility;
pub use events::{
    EventBus, InteractionEvent, InteractionEventCounts, InteractionEventKind, InteractionListener,
};
pub use grabbable::{GrabState, Interactable};
pub use math::{Pose, Quat, Vec3};
pub use physics::PhysicsSnapshot;
pub use safety::{SafetyMonitor, SafetyViolation};
pub use scene::{ColliderState, CollisionLayer, NodeId, ObjectId, RigidBodyState, SceneObject};
pub use throw::{GrabSession, ThrowState, VelocityTracker};
pub use trigger::TriggerZone;
pub use world::InteractionWorld;
