use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scene::ObjectId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusivityGroup(pub u32);

/// Tracks the single held object of each exclusivity group.
#[derive(Debug, Default, Clone)]
pub struct GrabCoordinator {
    holder_by_group: HashMap<ExclusivityGroup, ObjectId>,
}

impl GrabCoordinator {
    pub fn holder(&self, group: ExclusivityGroup) -> Option<ObjectId> {
        self.holder_by_group.get(&group).copied()
    }

    /// Holder that must be released before `candidate` may claim `group`.
    pub fn conflicting_holder(
        &self,
        group: ExclusivityGroup,
        candidate: ObjectId,
    ) -> Option<ObjectId> {
        self.holder(group).filter(|holder| *holder != candidate)
    }

    pub fn claim(&mut self, group: ExclusivityGroup, object: ObjectId) {
        self.holder_by_group.insert(group, object);
    }

    /// Clears the slot only if `object` is the current holder.
    pub fn vacate(&mut self, group: ExclusivityGroup, object: ObjectId) -> bool {
        if self.holder(group) != Some(object) {
            return false;
        }
        self.holder_by_group.remove(&group);
        true
    }

    pub fn forget(&mut self, object: ObjectId) {
        self.holder_by_group.retain(|_, holder| *holder != object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_then_conflict_for_other_candidate_only() {
        let mut coordinator = GrabCoordinator::default();
        let group = ExclusivityGroup(0);
        coordinator.claim(group, ObjectId(1));

        assert_eq!(
            coordinator.conflicting_holder(group, ObjectId(2)),
            Some(ObjectId(1))
        );
        assert_eq!(coordinator.conflicting_holder(group, ObjectId(1)), None);
        assert_eq!(
            coordinator.conflicting_holder(ExclusivityGroup(7), ObjectId(2)),
            None
        );
    }

    #[test]
    fn vacate_ignores_non_holder() {
        let mut coordinator = GrabCoordinator::default();
        let group = ExclusivityGroup(3);
        coordinator.claim(group, ObjectId(1));

        assert!(!coordinator.vacate(group, ObjectId(2)));
        assert_eq!(coordinator.holder(group), Some(ObjectId(1)));
        assert!(coordinator.vacate(group, ObjectId(1)));
        assert_eq!(coordinator.holder(group), None);
    }

    #[test]
    fn forget_clears_every_group_held_by_object() {
        let mut coordinator = GrabCoordinator::default();
        coordinator.claim(ExclusivityGroup(0), ObjectId(5));
        coordinator.claim(ExclusivityGroup(1), ObjectId(5));
        coordinator.claim(ExclusivityGroup(2), ObjectId(6));

        coordinator.forget(ObjectId(5));
        assert_eq!(coordinator.holder(ExclusivityGroup(0)), None);
        assert_eq!(coordinator.holder(ExclusivityGroup(1)), None);
        assert_eq!(coordinator.holder(ExclusivityGroup(2)), Some(ObjectId(6)));
    }
}
