//! Virtual boolean switch, used as a recast gate.

use castkeeper_domain::entity::{EntitySnapshot, EntityState};
use castkeeper_domain::id::EntityId;

#[must_use]
pub fn initial(entity_id: EntityId, on: bool) -> EntitySnapshot {
    EntitySnapshot::new(entity_id, state(on))
}

#[must_use]
pub fn state(on: bool) -> EntityState {
    if on { EntityState::On } else { EntityState::Off }
}
