use std::collections::HashMap;

use crate::scene::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    pub const LOCAL: Self = Self(0);
}

/// Decides whether `actor` may mutate the replicated state of `object`.
pub trait AuthorityGate {
    fn has_authority(&self, actor: ParticipantId, object: ObjectId) -> bool;
}

impl<F> AuthorityGate for F
where
    F: Fn(ParticipantId, ObjectId) -> bool,
{
    fn has_authority(&self, actor: ParticipantId, object: ObjectId) -> bool {
        self(actor, object)
    }
}

/// Single-player gate: the local participant owns everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAuthority;

impl AuthorityGate for LocalAuthority {
    fn has_authority(&self, _actor: ParticipantId, _object: ObjectId) -> bool {
        true
    }
}

/// Explicit authority tokens. Objects without a token are owned by nobody.
#[derive(Debug, Clone, Default)]
pub struct AuthorityTable {
    holder_by_object: HashMap<ObjectId, ParticipantId>,
}

impl AuthorityTable {
    pub fn assign(&mut self, object: ObjectId, holder: ParticipantId) -> Option<ParticipantId> {
        self.holder_by_object.insert(object, holder)
    }

    pub fn revoke(&mut self, object: ObjectId) -> Option<ParticipantId> {
        self.holder_by_object.remove(&object)
    }

    pub fn holder(&self, object: ObjectId) -> Option<ParticipantId> {
        self.holder_by_object.get(&object).copied()
    }
}

impl AuthorityGate for AuthorityTable {
    fn has_authority(&self, actor: ParticipantId, object: ObjectId) -> bool {
        self.holder(object) == Some(actor)
    }
}
