//! State reader port: synchronous access to the host's current entity states.

use castkeeper_domain::entity::{EntitySnapshot, EntityState};
use castkeeper_domain::id::EntityId;

/// Reads the latest snapshot the host holds for an entity.
pub trait StateReader: Send + Sync {
    /// Current snapshot of `entity_id`, or `None` if the host does not know it.
    fn snapshot(&self, entity_id: &EntityId) -> Option<EntitySnapshot>;

    /// Current state of `entity_id`.
    fn state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.snapshot(entity_id).map(|snapshot| snapshot.state)
    }
}
