use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::authority::{AuthorityGate, LocalAuthority, ParticipantId};
use crate::avatar::AvatarRig;
use crate::config::{ConfigError, InteractableConfig};
use crate::coordinator::GrabCoordinator;
use crate::detector::{self, Eligibility};
use crate::events::{EventBus, InteractionEvent, InteractionEventKind, InteractionListener};
use crate::grabbable::Interactable;
use crate::math::Vec3;
use crate::safety;
use crate::scene::{ObjectId, SceneObject};
use crate::throw::manual_velocity;

/// Owns every interactable of one scene and drives them from explicit calls
/// made by the scene-loop adapter.
pub struct InteractionWorld {
    objects: BTreeMap<ObjectId, Interactable>,
    next_object_id: u64,
    coordinator: GrabCoordinator,
    avatar: Option<AvatarRig>,
    authority: Box<dyn AuthorityGate>,
    local_participant: ParticipantId,
    events: EventBus,
}

impl Default for InteractionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InteractionWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionWorld")
            .field("objects", &self.objects.len())
            .field("coordinator", &self.coordinator)
            .field("avatar_registered", &self.avatar.is_some())
            .field("local_participant", &self.local_participant)
            .field("events", &self.events)
            .finish()
    }
}

impl InteractionWorld {
    pub fn new() -> Self {
        Self::with_authority(LocalAuthority, ParticipantId::LOCAL)
    }

    pub fn with_authority(
        authority: impl AuthorityGate + 'static,
        local_participant: ParticipantId,
    ) -> Self {
        Self {
            objects: BTreeMap::new(),
            next_object_id: 1,
            coordinator: GrabCoordinator::default(),
            avatar: None,
            authority: Box::new(authority),
            local_participant,
            events: EventBus::default(),
        }
    }

    pub fn set_authority(&mut self, authority: impl AuthorityGate + 'static) {
        self.authority = Box::new(authority);
    }

    pub fn local_participant(&self) -> ParticipantId {
        self.local_participant
    }

    pub fn spawn(
        &mut self,
        config: InteractableConfig,
        object: SceneObject,
    ) -> Result<ObjectId, ConfigError> {
        config.validate()?;
        let id = ObjectId(self.next_object_id);
        self.next_object_id = self.next_object_id.saturating_add(1);

        if let Some(missing) = config.missing_collaborator() {
            warn!(object = id.0, reason = missing, "interactable_disabled");
        }
        let interactable = Interactable::new(id, config, object);
        debug!(
            object = id.0,
            enabled = interactable.is_enabled(),
            has_rigidbody = interactable.object().rigidbody.is_some(),
            "interactable_spawned"
        );
        self.objects.insert(id, interactable);
        Ok(id)
    }

    pub fn despawn(&mut self, id: ObjectId) -> bool {
        if self.objects.remove(&id).is_none() {
            return false;
        }
        self.coordinator.forget(id);
        true
    }

    pub fn register_avatar(&mut self, avatar: AvatarRig) {
        info!(
            bones = avatar.bones().len(),
            x = avatar.position().x,
            y = avatar.position().y,
            z = avatar.position().z,
            "avatar_registered"
        );
        self.avatar = Some(avatar);
    }

    pub fn unregister_avatar(&mut self) -> Option<AvatarRig> {
        self.avatar.take()
    }

    pub fn avatar(&self) -> Option<&AvatarRig> {
        self.avatar.as_ref()
    }

    pub fn avatar_mut(&mut self) -> Option<&mut AvatarRig> {
        self.avatar.as_mut()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Interactable> {
        self.objects.get(&id)
    }

    /// Engine-side state for the adapter to read back or write physics into.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id).map(Interactable::object_mut)
    }

    pub fn interactables(&self) -> impl Iterator<Item = &Interactable> {
        self.objects.values()
    }

    pub fn coordinator(&self) -> &GrabCoordinator {
        &self.coordinator
    }

    pub fn subscribe(&mut self, listener: impl InteractionListener + 'static) {
        self.events.subscribe(listener);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        self.events.drain()
    }

    fn has_authority(&self, id: ObjectId) -> bool {
        self.authority.has_authority(self.local_participant, id)
    }

    pub fn eligibility(&self, id: ObjectId) -> Option<Eligibility> {
        let interactable = self.objects.get(&id)?;
        let grab = interactable.config().grab.as_ref()?;
        let avatar = self.avatar.as_ref()?;
        let object = interactable.object();
        Some(detector::evaluate(
            grab,
            object.position(),
            object.collider.map(|collider| collider.radius),
            avatar,
        ))
    }

    fn grab_rejection(&self, id: ObjectId) -> Option<&'static str> {
        let Some(interactable) = self.objects.get(&id) else {
            return Some("unknown_object");
        };
        if !interactable.is_enabled() {
            return Some("disabled");
        }
        let Some(grab) = interactable.config().grab.as_ref() else {
            return Some("not_grabbable");
        };
        if interactable.is_grabbed() {
            return Some("already_grabbed");
        }
        if grab.is_touch_only() {
            return Some("touch_only");
        }
        if self.avatar.is_none() {
            return Some("no_avatar");
        }
        if !self.has_authority(id) {
            return Some("no_authority");
        }
        if let Some(reason) = self.exclusivity_rejection(interactable) {
            return Some(reason);
        }
        match self.eligibility(id) {
            Some(eligibility) if !eligibility.in_range => Some("out_of_range"),
            Some(eligibility) if !eligibility.aimed => Some("not_aimed"),
            Some(_) => None,
            None => Some("no_avatar"),
        }
    }

    fn exclusivity_rejection(&self, interactable: &Interactable) -> Option<&'static str> {
        let allow_multi = interactable
            .config()
            .grab
            .as_ref()
            .is_some_and(|grab| grab.allow_multi_grab);
        if allow_multi {
            return None;
        }
        let holder = self
            .coordinator
            .conflicting_holder(interactable.config().exclusivity_group, interactable.id())?;
        if !self.has_authority(holder) {
            return Some("holder_locked");
        }
        None
    }

    /// Whether `try_grab` would succeed right now.
    pub fn can_grab(&self, id: ObjectId) -> bool {
        self.grab_rejection(id).is_none()
    }

    /// Silent no-op (false) unless every grab precondition holds.
    pub fn try_grab(&mut self, id: ObjectId) -> bool {
        if let Some(reason) = self.grab_rejection(id) {
            debug!(object = id.0, reason, "grab_rejected");
            return false;
        }
        self.grab_unchecked(id)
    }

    /// Touch-only objects grab on avatar contact.
    pub fn report_contact(&mut self, id: ObjectId) -> bool {
        let rejection = match self.objects.get(&id) {
            None => Some("unknown_object"),
            Some(interactable) if !interactable.is_enabled() => Some("disabled"),
            Some(interactable) if interactable.is_grabbed() => Some("already_grabbed"),
            Some(interactable) => match interactable.config().grab.as_ref() {
                None => Some("not_grabbable"),
                Some(grab) if !grab.is_touch_only() => Some("not_touch_grab"),
                Some(_) if self.avatar.is_none() => Some("no_avatar"),
                Some(_) if !self.has_authority(id) => Some("no_authority"),
                Some(_) => self.exclusivity_rejection(interactable),
            },
        };
        if let Some(reason) = rejection {
            debug!(object = id.0, reason, "contact_grab_rejected");
            return false;
        }
        self.grab_unchecked(id)
    }

    fn grab_unchecked(&mut self, id: ObjectId) -> bool {
        let Some((group, allow_multi)) = self.objects.get(&id).and_then(|interactable| {
            let grab = interactable.config().grab.as_ref()?;
            Some((interactable.config().exclusivity_group, grab.allow_multi_grab))
        }) else {
            return false;
        };

        if !allow_multi {
            if let Some(holder) = self.coordinator.conflicting_holder(group, id) {
                debug!(object = id.0, holder = holder.0, "exclusive_release");
                self.release_internal(holder, true);
            }
        }

        let Some(avatar) = self.avatar.as_mut() else {
            return false;
        };
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        let Some(grab) = interactable.config().grab.as_ref() else {
            return false;
        };
        let anchor = avatar.resolve_hand_anchor(&grab.hand_anchor_name, grab.fallback_anchor_offset);
        interactable.attach(anchor, avatar.camera.forward);

        if !allow_multi {
            self.coordinator.claim(group, id);
        }
        info!(
            object = id.0,
            anchor = anchor.node.0,
            synthesized_anchor = anchor.synthesized,
            "grabbed"
        );
        self.events.emit(id, InteractionEventKind::Grabbed);
        true
    }

    /// Silent no-op (false) unless the object is held and the local
    /// participant has authority over it.
    pub fn release(&mut self, id: ObjectId) -> bool {
        let rejection = match self.objects.get(&id) {
            None => Some("unknown_object"),
            Some(interactable) if !interactable.is_grabbed() => Some("not_grabbed"),
            Some(_) if !self.has_authority(id) => Some("no_authority"),
            Some(_) => None,
        };
        if let Some(reason) = rejection {
            debug!(object = id.0, reason, "release_rejected");
            return false;
        }
        self.release_internal(id, true)
    }

    fn release_internal(&mut self, id: ObjectId, estimate_throw: bool) -> bool {
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        let Some(session) = interactable.detach() else {
            return false;
        };
        self.coordinator
            .vacate(interactable.config().exclusivity_group, id);
        info!(object = id.0, "released");
        self.events.emit(id, InteractionEventKind::Released);

        if !estimate_throw {
            return true;
        }
        let velocity = interactable
            .config()
            .throwable
            .as_ref()
            .and_then(|throwable| session.release_velocity(throwable));
        match velocity {
            Some(velocity) => {
                interactable.launch(velocity);
                info!(
                    object = id.0,
                    speed = velocity.length(),
                    "thrown"
                );
                self.events.emit(id, InteractionEventKind::Thrown);
            }
            None if interactable.config().throwable.is_some() => {
                debug!(object = id.0, "throw_skipped_no_motion");
            }
            None => {}
        }
        true
    }

    /// Releases if held, then launches along `direction` without sampling.
    pub fn throw_in_direction(&mut self, id: ObjectId, direction: Vec3, force: f32) -> bool {
        let rejection = match self.objects.get(&id) {
            None => Some("unknown_object"),
            Some(interactable) if !interactable.is_enabled() => Some("disabled"),
            Some(interactable) if interactable.config().throwable.is_none() => {
                Some("not_throwable")
            }
            Some(_) if !self.has_authority(id) => Some("no_authority"),
            Some(_) => None,
        };
        if let Some(reason) = rejection {
            debug!(object = id.0, reason, "throw_rejected");
            return false;
        }
        let Some(velocity) = manual_velocity(direction, force) else {
            debug!(object = id.0, reason = "degenerate_direction", "throw_rejected");
            return false;
        };

        self.release_internal(id, false);
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        interactable.launch(velocity);
        info!(object = id.0, speed = velocity.length(), "thrown_manual");
        self.events.emit(id, InteractionEventKind::Thrown);
        true
    }

    /// Fires `Impact` on the first hard collision after a throw.
    pub fn report_collision(&mut self, id: ObjectId, relative_speed: f32) -> bool {
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        if !interactable.is_enabled() {
            return false;
        }
        let Some(threshold) = interactable
            .config()
            .throwable
            .as_ref()
            .map(|throwable| throwable.impact_threshold)
        else {
            return false;
        };
        if !interactable
            .throw_state_mut()
            .register_collision(relative_speed, threshold)
        {
            return false;
        }
        debug!(object = id.0, relative_speed, "impact");
        self.events.emit(id, InteractionEventKind::Impact);
        true
    }

    pub fn report_trigger_enter(&mut self, id: ObjectId) -> bool {
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        if !interactable.is_enabled() {
            return false;
        }
        let Some(trigger) = interactable.config().trigger.clone() else {
            return false;
        };
        if !interactable.trigger_zone_mut().enter(&trigger) {
            debug!(object = id.0, "trigger_suppressed");
            return false;
        }
        info!(object = id.0, "triggered");
        self.events.emit(id, InteractionEventKind::Triggered);
        true
    }

    pub fn report_trigger_exit(&mut self, id: ObjectId) -> bool {
        let Some(interactable) = self.objects.get_mut(&id) else {
            return false;
        };
        if !interactable.is_enabled() || interactable.config().trigger.is_none() {
            return false;
        }
        if !interactable.trigger_zone_mut().exit() {
            return false;
        }
        self.events.emit(id, InteractionEventKind::TriggerExited);
        true
    }

    /// One frame: held objects follow their anchors, free objects update
    /// range/aim tracking and run the safety monitor.
    pub fn tick(&mut self, dt_seconds: f32) {
        let ids = self.objects.keys().copied().collect::<Vec<_>>();
        for id in ids {
            self.tick_object(id, dt_seconds);
        }
        self.events.finish_tick_rollover();
    }

    fn tick_object(&mut self, id: ObjectId, dt_seconds: f32) {
        let eligibility = self.eligibility(id);
        let authority = self.has_authority(id);
        let Some(interactable) = self.objects.get_mut(&id) else {
            return;
        };
        if !interactable.is_enabled() {
            return;
        }
        interactable.trigger_zone_mut().tick(dt_seconds);

        if interactable.is_grabbed() {
            let Some(avatar) = self.avatar.as_ref() else {
                return;
            };
            let Some(anchor_pose) = interactable
                .hand_anchor()
                .and_then(|node| avatar.anchor_pose(node))
            else {
                return;
            };
            interactable.follow_anchor(anchor_pose, avatar.camera.forward, dt_seconds);
            return;
        }

        let tracks_range = interactable
            .config()
            .grab
            .as_ref()
            .is_some_and(|grab| !grab.is_touch_only());
        if tracks_range {
            for kind in interactable.update_tracking(eligibility) {
                self.events.emit(id, kind);
            }
        }

        let Some(safety_config) = interactable.config().safety.clone() else {
            return;
        };
        if !interactable
            .safety_monitor_mut()
            .advance(&safety_config, dt_seconds)
        {
            return;
        }
        let Some(violation) = safety::check(
            &safety_config,
            interactable.object().position(),
            &interactable.spawn_pose(),
        ) else {
            return;
        };
        if !authority {
            debug!(object = id.0, reason = "no_authority", "safety_recovery_skipped");
            return;
        }
        interactable.recover_to_spawn();
        info!(object = id.0, violation = violation.as_token(), "safety_recovery");
        self.events.emit(id, InteractionEventKind::SafetyRecovery);
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
