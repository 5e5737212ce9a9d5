use crate::avatar::HandAnchor;
use crate::config::InteractableConfig;
use crate::detector::Eligibility;
use crate::events::InteractionEventKind;
use crate::math::{Pose, Vec3};
use crate::physics::PhysicsSnapshot;
use crate::safety::SafetyMonitor;
use crate::scene::{CollisionLayer, NodeId, ObjectId, SceneObject};
use crate::throw::{GrabSession, ThrowState};
use crate::trigger::TriggerZone;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GrabState {
    #[default]
    Idle,
    InRange,
    Aimed,
    Grabbed,
}

impl GrabState {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InRange => "in_range",
            Self::Aimed => "aimed",
            Self::Grabbed => "grabbed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Interactable {
    id: ObjectId,
    config: InteractableConfig,
    object: SceneObject,
    state: GrabState,
    /// Range/aim state seen by the detector. Held through a grab so release
    /// resumes from it instead of from `Idle`.
    tracked: GrabState,
    enabled: bool,
    spawn_pose: Pose,
    physics_snapshot: Option<PhysicsSnapshot>,
    original_parent: Option<NodeId>,
    original_layer: Option<CollisionLayer>,
    hand_anchor: Option<NodeId>,
    session: Option<GrabSession>,
    throw_state: ThrowState,
    safety_monitor: SafetyMonitor,
    trigger_zone: TriggerZone,
}

impl Interactable {
    pub(crate) fn new(id: ObjectId, config: InteractableConfig, object: SceneObject) -> Self {
        let enabled = config.missing_collaborator().is_none();
        let physics_snapshot =
            PhysicsSnapshot::capture(object.rigidbody.as_ref(), config.throwable.is_some());
        Self {
            id,
            spawn_pose: object.pose,
            physics_snapshot,
            config,
            object,
            state: GrabState::Idle,
            tracked: GrabState::Idle,
            enabled,
            original_parent: None,
            original_layer: None,
            hand_anchor: None,
            session: None,
            throw_state: ThrowState::default(),
            safety_monitor: SafetyMonitor::default(),
            trigger_zone: TriggerZone::default(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn config(&self) -> &InteractableConfig {
        &self.config
    }

    pub fn object(&self) -> &SceneObject {
        &self.object
    }

    pub(crate) fn object_mut(&mut self) -> &mut SceneObject {
        &mut self.object
    }

    pub fn state(&self) -> GrabState {
        self.state
    }

    pub fn is_grabbed(&self) -> bool {
        self.state == GrabState::Grabbed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn spawn_pose(&self) -> Pose {
        self.spawn_pose
    }

    pub fn physics_snapshot(&self) -> Option<PhysicsSnapshot> {
        self.physics_snapshot
    }

    pub fn original_layer(&self) -> Option<CollisionLayer> {
        self.original_layer
    }

    pub fn hand_anchor(&self) -> Option<NodeId> {
        self.hand_anchor
    }

    pub fn session(&self) -> Option<&GrabSession> {
        self.session.as_ref()
    }

    pub fn is_thrown(&self) -> bool {
        self.throw_state.is_thrown()
    }

    pub(crate) fn throw_state_mut(&mut self) -> &mut ThrowState {
        &mut self.throw_state
    }

    pub(crate) fn safety_monitor_mut(&mut self) -> &mut SafetyMonitor {
        &mut self.safety_monitor
    }

    pub(crate) fn trigger_zone_mut(&mut self) -> &mut TriggerZone {
        &mut self.trigger_zone
    }

    pub(crate) fn attach(&mut self, anchor: HandAnchor, camera_forward: Vec3) {
        let Some(grab) = self.config.grab.as_ref() else {
            return;
        };
        self.original_parent = self.object.parent;
        self.object.parent = Some(anchor.node);
        self.object.pose = anchor.pose.child(grab.grab_offset);
        self.hand_anchor = Some(anchor.node);

        self.object.set_collider_trigger(true);
        self.original_layer = Some(self.object.layer);
        self.object.layer = grab.held_layer;

        if self.config.throwable.is_some() {
            self.throw_state.clear();
        }
        PhysicsSnapshot::held().apply(self.object.rigidbody.as_mut());
        if let Some(rigidbody) = self.object.rigidbody.as_mut() {
            rigidbody.zero_velocities();
        }

        let sample_capacity = self
            .config
            .throwable
            .as_ref()
            .map_or(1, |throwable| throwable.sample_capacity);
        let mut session = GrabSession::new(sample_capacity, camera_forward);
        session.tracker.record_position(self.object.pose.position, 0.0);
        self.session = Some(session);
        self.state = GrabState::Grabbed;
    }

    /// Reverses `attach`. `None` when the object was not held.
    pub(crate) fn detach(&mut self) -> Option<GrabSession> {
        if self.state != GrabState::Grabbed {
            return None;
        }
        self.object.parent = self.original_parent.take();
        self.object.set_collider_trigger(false);
        if let Some(layer) = self.original_layer.take() {
            self.object.layer = layer;
        }

        let restored = if self.config.throwable.is_some() {
            Some(PhysicsSnapshot::dynamic())
        } else {
            self.physics_snapshot
        };
        if let Some(snapshot) = restored {
            snapshot.apply(self.object.rigidbody.as_mut());
        }

        self.hand_anchor = None;
        self.state = self.tracked;
        Some(self.session.take().unwrap_or_else(|| GrabSession::new(1, Vec3::ZERO)))
    }

    /// Keeps a held object on its anchor and samples its motion.
    pub(crate) fn follow_anchor(&mut self, anchor_pose: Pose, camera_forward: Vec3, dt_seconds: f32) {
        let Some(grab) = self.config.grab.as_ref() else {
            return;
        };
        self.object.pose = anchor_pose.child(grab.grab_offset);
        if let Some(session) = self.session.as_mut() {
            session.camera_forward = camera_forward;
            session.tracker.record_position(self.object.pose.position, dt_seconds);
        }
    }

    pub(crate) fn launch(&mut self, velocity: Vec3) {
        if let Some(rigidbody) = self.object.rigidbody.as_mut() {
            PhysicsSnapshot::dynamic().apply(Some(&mut *rigidbody));
            rigidbody.linear_velocity = velocity;
        }
        self.throw_state.mark_thrown();
    }

    pub(crate) fn recover_to_spawn(&mut self) {
        self.object.pose = self.spawn_pose;
        if let Some(rigidbody) = self.object.rigidbody.as_mut() {
            rigidbody.zero_velocities();
            PhysicsSnapshot::dynamic().apply(Some(rigidbody));
        }
        self.object.set_collider_trigger(false);
        self.throw_state.clear();
    }

    /// Moves between Idle/InRange/Aimed and reports the crossing events in
    /// order: range before aim on the way in, aim before range on the way out.
    pub(crate) fn update_tracking(
        &mut self,
        eligibility: Option<Eligibility>,
    ) -> Vec<InteractionEventKind> {
        if self.state == GrabState::Grabbed {
            return Vec::new();
        }
        let distance_mode = self
            .config
            .grab
            .as_ref()
            .is_some_and(|grab| grab.is_distance_grab());
        let next = match eligibility {
            Some(e) if e.in_range && e.aimed && distance_mode => GrabState::Aimed,
            Some(e) if e.in_range => GrabState::InRange,
            _ => GrabState::Idle,
        };
        let previous = std::mem::replace(&mut self.tracked, next);
        self.state = next;

        let was_in_range = previous != GrabState::Idle;
        let was_aimed = previous == GrabState::Aimed;
        let is_in_range = next != GrabState::Idle;
        let is_aimed = next == GrabState::Aimed;

        let mut events = Vec::new();
        if !was_in_range && is_in_range {
            events.push(InteractionEventKind::EnterGrabRange);
        }
        if !was_aimed && is_aimed {
            events.push(InteractionEventKind::AimEnter);
        }
        if was_aimed && !is_aimed {
            events.push(InteractionEventKind::AimExit);
        }
        if was_in_range && !is_in_range {
            events.push(InteractionEventKind::ExitGrabRange);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GrabConfig, ThrowConfig};
    use crate::scene::{ColliderState, RigidBodyState};

    fn anchor() -> HandAnchor {
        HandAnchor {
            node: NodeId(50),
            pose: Pose::from_position(Vec3::new(0.0, 1.0, 0.5)),
            synthesized: false,
        }
    }

    fn crate_object(rigidbody: Option<RigidBodyState>) -> SceneObject {
        let mut object = SceneObject::new(Pose::from_position(Vec3::new(0.0, 0.0, 1.0)))
            .with_parent(Some(NodeId(7)))
            .with_layer(CollisionLayer(5))
            .with_collider(ColliderState::default());
        object.rigidbody = rigidbody;
        object
    }

    fn eligibility(in_range: bool, aimed: bool) -> Option<Eligibility> {
        Some(Eligibility {
            distance: 1.0,
            in_range,
            aimed,
        })
    }

    #[test]
    fn attach_and_detach_restore_parent_layer_and_collider() {
        let config = InteractableConfig {
            grab: Some(GrabConfig {
                grab_offset: Vec3::new(0.0, 0.0, 0.25),
                ..GrabConfig::default()
            }),
            ..InteractableConfig::default()
        };
        let mut interactable = Interactable::new(ObjectId(1), config, crate_object(None));

        interactable.attach(anchor(), Vec3::FORWARD);
        assert!(interactable.is_grabbed());
        assert_eq!(interactable.object().parent, Some(NodeId(50)));
        assert_eq!(interactable.object().layer, CollisionLayer::IGNORE_RAYCAST);
        assert_eq!(interactable.original_layer(), Some(CollisionLayer(5)));
        assert!(interactable.object().collider.expect("collider").is_trigger);
        assert_eq!(
            interactable.object().pose.position,
            Vec3::new(0.0, 1.0, 0.75)
        );

        assert!(interactable.detach().is_some());
        assert_eq!(interactable.state(), GrabState::Idle);
        assert_eq!(interactable.object().parent, Some(NodeId(7)));
        assert_eq!(interactable.object().layer, CollisionLayer(5));
        assert!(!interactable.object().collider.expect("collider").is_trigger);
        assert!(interactable.session().is_none());
        assert!(interactable.detach().is_none());
    }

    #[test]
    fn plain_rigidbody_flags_round_trip() {
        let body = RigidBodyState {
            is_kinematic: false,
            use_gravity: false,
            ..RigidBodyState::default()
        };
        let mut interactable =
            Interactable::new(ObjectId(1), InteractableConfig::grabbable(), crate_object(Some(body)));

        interactable.attach(anchor(), Vec3::FORWARD);
        let held = interactable.object().rigidbody.expect("body");
        assert!(held.is_kinematic);
        assert!(!held.use_gravity);

        interactable.object_mut().rigidbody.as_mut().expect("body").use_gravity = true;
        interactable.detach();
        let restored = interactable.object().rigidbody.expect("body");
        assert!(!restored.is_kinematic);
        assert!(!restored.use_gravity);
    }

    #[test]
    fn throwable_is_dynamic_after_release_even_if_authored_kinematic() {
        let body = RigidBodyState {
            is_kinematic: true,
            use_gravity: false,
            ..RigidBodyState::default()
        };
        let config = InteractableConfig {
            throwable: Some(ThrowConfig::default()),
            ..InteractableConfig::grabbable()
        };
        let mut interactable = Interactable::new(ObjectId(1), config, crate_object(Some(body)));
        assert_eq!(
            interactable.physics_snapshot(),
            Some(PhysicsSnapshot::dynamic())
        );

        interactable.attach(anchor(), Vec3::FORWARD);
        interactable.detach();
        let restored = interactable.object().rigidbody.expect("body");
        assert!(!restored.is_kinematic);
        assert!(restored.use_gravity);
    }

    #[test]
    fn missing_grab_disables_throwable() {
        let config = InteractableConfig {
            throwable: Some(ThrowConfig::default()),
            ..InteractableConfig::default()
        };
        let interactable = Interactable::new(ObjectId(1), config, crate_object(None));
        assert!(!interactable.is_enabled());
    }

    #[test]
    fn follow_anchor_samples_motion() {
        let mut interactable =
            Interactable::new(ObjectId(1), InteractableConfig::throwable(), crate_object(None));
        interactable.attach(anchor(), Vec3::FORWARD);
        interactable.follow_anchor(
            Pose::from_position(Vec3::new(0.1, 1.0, 0.5)),
            Vec3::FORWARD,
            0.02,
        );
        let session = interactable.session().expect("session");
        let sample = session.tracker.samples().next().expect("sample");
        assert!((sample.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn tracking_orders_range_and_aim_events() {
        let mut interactable =
            Interactable::new(ObjectId(1), InteractableConfig::grabbable(), crate_object(None));

        assert_eq!(
            interactable.update_tracking(eligibility(true, true)),
            vec![
                InteractionEventKind::EnterGrabRange,
                InteractionEventKind::AimEnter
            ]
        );
        assert!(interactable.update_tracking(eligibility(true, true)).is_empty());
        assert_eq!(
            interactable.update_tracking(eligibility(true, false)),
            vec![InteractionEventKind::AimExit]
        );
        assert_eq!(
            interactable.update_tracking(eligibility(true, true)),
            vec![InteractionEventKind::AimEnter]
        );
        assert_eq!(
            interactable.update_tracking(None),
            vec![
                InteractionEventKind::AimExit,
                InteractionEventKind::ExitGrabRange
            ]
        );
        assert_eq!(interactable.state(), GrabState::Idle);
    }

    #[test]
    fn release_resumes_from_pre_grab_tracking() {
        let mut interactable =
            Interactable::new(ObjectId(1), InteractableConfig::grabbable(), crate_object(None));
        assert_eq!(interactable.update_tracking(eligibility(true, true)).len(), 2);

        interactable.attach(anchor(), Vec3::FORWARD);
        assert!(interactable.update_tracking(eligibility(true, true)).is_empty());
        interactable.detach().expect("session");
        assert_eq!(interactable.state(), GrabState::Aimed);

        assert!(interactable.update_tracking(eligibility(true, true)).is_empty());
        assert_eq!(
            interactable.update_tracking(None),
            vec![
                InteractionEventKind::AimExit,
                InteractionEventKind::ExitGrabRange
            ]
        );
    }

    #[test]
    fn recover_resets_pose_velocity_and_collider() {
        let body = RigidBodyState {
            is_kinematic: true,
            use_gravity: false,
            linear_velocity: Vec3::new(0.0, -30.0, 0.0),
            angular_velocity: Vec3::new(1.0, 2.0, 3.0),
        };
        let mut interactable =
            Interactable::new(ObjectId(1), InteractableConfig::grabbable(), crate_object(Some(body)));
        interactable.object_mut().pose = Pose::from_position(Vec3::new(3.0, -50.0, 0.0));
        interactable.object_mut().set_collider_trigger(true);

        interactable.recover_to_spawn();
        let object = interactable.object();
        assert_eq!(object.pose, interactable.spawn_pose());
        let body = object.rigidbody.expect("body");
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
        assert!(!body.is_kinematic);
        assert!(body.use_gravity);
        assert!(!object.collider.expect("collider").is_trigger);
    }
}
