//! State-change events delivered by the host.

use serde::{Deserialize, Serialize};

use crate::entity::EntitySnapshot;
use crate::id::EntityId;
use crate::time::{Timestamp, now};

/// An entity's snapshot changed (state, attributes, or both).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangedEvent {
    pub entity_id: EntityId,
    /// Previous snapshot; `None` when the entity just appeared.
    pub old: Option<EntitySnapshot>,
    pub new: EntitySnapshot,
    pub timestamp: Timestamp,
}

impl StateChangedEvent {
    /// Build an event for `new`, stamped with the current time.
    #[must_use]
    pub fn new(old: Option<EntitySnapshot>, new: EntitySnapshot) -> Self {
        Self {
            entity_id: new.entity_id.clone(),
            old,
            new,
            timestamp: now(),
        }
    }

    /// Whether the state string itself changed.
    #[must_use]
    pub fn state_changed(&self) -> bool {
        self.old.as_ref().is_none_or(|old| old.state != self.new.state)
    }

    /// Whether the named attribute differs between old and new.
    #[must_use]
    pub fn attribute_changed(&self, name: &str) -> bool {
        let before = self.old.as_ref().and_then(|old| old.get_attribute(name));
        before != self.new.get_attribute(name)
    }
}
