//! Virtual sun entity.

use castkeeper_domain::entity::{EntitySnapshot, EntityState};
use castkeeper_domain::id::EntityId;
use castkeeper_domain::theme::ABOVE_HORIZON;

pub const BELOW_HORIZON: &str = "below_horizon";

#[must_use]
pub fn initial(entity_id: EntityId, above_horizon: bool) -> EntitySnapshot {
    EntitySnapshot::new(entity_id, state(above_horizon))
}

#[must_use]
pub fn state(above_horizon: bool) -> EntityState {
    EntityState::from(if above_horizon { ABOVE_HORIZON } else { BELOW_HORIZON })
}
