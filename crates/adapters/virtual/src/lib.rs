//! # castkeeper-adapter-virtual
//!
//! Virtual host that simulates the entities castkeeper watches and drives,
//! for demonstration and end-to-end testing.
//!
//! ## Provided entities
//!
//! | Kind | Entity domain | Behaviour |
//! |------|---------------|-----------|
//! | Media player | `media_player` | `load_url` / `turn_off` / `volume_set`; unreachable while `unavailable` |
//! | Switch | any (`input_boolean`, `switch`, …) | `on` / `off`, changed from outside |
//! | Sun | `sun` | `above_horizon` / `below_horizon` |
//!
//! Every change, whether triggered by a control call or simulated through
//! [`VirtualHost::set_state`], is published as a
//! [`StateChangedEvent`] on the configured publisher. A volatile
//! [`MemoryKeyValueStore`] completes the set of host ports.
//!
//! ## Dependency rule
//!
//! Depends on `castkeeper-app` (port traits) and `castkeeper-domain` only.

pub mod devices;
mod memory_store;

pub use memory_store::MemoryKeyValueStore;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use castkeeper_app::ports::{DeviceControl, EventPublisher, StateReader, ThemeSetter};
use castkeeper_domain::entity::{AttributeValue, EntitySnapshot, EntityState};
use castkeeper_domain::error::{CastkeeperError, ControlError};
use castkeeper_domain::event::StateChangedEvent;
use castkeeper_domain::id::EntityId;
use castkeeper_domain::theme::ThemeMode;
use castkeeper_domain::time::now;

use devices::{media_player, sun, switch};

/// In-memory host holding simulated entity snapshots.
pub struct VirtualHost<P> {
    publisher: P,
    entities: Mutex<HashMap<EntityId, EntitySnapshot>>,
    themes: Mutex<HashMap<ThemeMode, String>>,
}

impl<P> VirtualHost<P>
where
    P: EventPublisher + Send + Sync,
{
    /// An empty host publishing its changes to `publisher`.
    #[must_use]
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            entities: Mutex::new(HashMap::new()),
            themes: Mutex::new(HashMap::new()),
        }
    }

    /// Register a powered-off media player.
    pub fn add_media_player(&self, entity_id: EntityId) {
        self.insert(media_player::initial(entity_id));
    }

    /// Register a boolean switch.
    pub fn add_switch(&self, entity_id: EntityId, on: bool) {
        self.insert(switch::initial(entity_id, on));
    }

    /// Register the sun entity.
    pub fn add_sun(&self, entity_id: EntityId, above_horizon: bool) {
        self.insert(sun::initial(entity_id, above_horizon));
    }

    /// Register an arbitrary snapshot, replacing any previous one.
    ///
    /// No event is published.
    pub fn insert(&self, snapshot: EntitySnapshot) {
        tracing::debug!(entity_id = %snapshot.entity_id, state = %snapshot.state, "registered virtual entity");
        self.lock_entities()
            .insert(snapshot.entity_id.clone(), snapshot);
    }

    /// Simulate an outside state change (power button, network loss, …).
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnknownEntity`] for an unregistered entity.
    pub async fn set_state(
        &self,
        entity_id: &EntityId,
        state: EntityState,
    ) -> Result<(), CastkeeperError> {
        self.update(entity_id, |current| {
            let mut next = current.clone();
            next.update_state(state, now());
            Ok(next)
        })
        .await
    }

    /// Simulate an outside attribute change.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnknownEntity`] for an unregistered entity.
    pub async fn set_attribute(
        &self,
        entity_id: &EntityId,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), CastkeeperError> {
        let value = value.into();
        self.update(entity_id, |current| {
            Ok(current.clone().with_attribute(name, value))
        })
        .await
    }

    /// Theme currently applied for `mode`.
    #[must_use]
    pub fn theme(&self, mode: ThemeMode) -> Option<String> {
        self.themes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&mode)
            .cloned()
    }

    /// Apply `change` to the entity's snapshot and publish the result when
    /// the state or attributes differ.
    async fn update<F>(&self, entity_id: &EntityId, change: F) -> Result<(), CastkeeperError>
    where
        F: FnOnce(&EntitySnapshot) -> Result<EntitySnapshot, ControlError>,
    {
        let (old, new) = {
            let mut entities = self.lock_entities();
            let current = entities
                .get(entity_id)
                .ok_or_else(|| ControlError::UnknownEntity(entity_id.to_string()))?;
            let next = change(current)?;
            if next.state == current.state && next.attributes == current.attributes {
                return Ok(());
            }
            let old = entities.insert(entity_id.clone(), next.clone());
            (old, next)
        };
        tracing::debug!(%entity_id, state = %new.state, "virtual entity changed");
        self.publisher
            .publish(StateChangedEvent::new(old, new))
            .await
    }

    async fn control<F>(&self, entity_id: &EntityId, action: &'static str, change: F) -> Result<(), CastkeeperError>
    where
        F: FnOnce(&EntitySnapshot) -> Result<EntitySnapshot, ControlError>,
    {
        if entity_id.domain() != media_player::DOMAIN {
            return Err(ControlError::Rejected {
                entity_id: entity_id.to_string(),
                action,
                reason: "not a media player".to_string(),
            }
            .into());
        }
        tracing::info!(%entity_id, action, "virtual device control");
        self.update(entity_id, change).await
    }

    fn lock_entities(&self) -> MutexGuard<'_, HashMap<EntityId, EntitySnapshot>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> StateReader for VirtualHost<P>
where
    P: EventPublisher + Send + Sync,
{
    fn snapshot(&self, entity_id: &EntityId) -> Option<EntitySnapshot> {
        self.lock_entities().get(entity_id).cloned()
    }
}

impl<P> DeviceControl for VirtualHost<P>
where
    P: EventPublisher + Send + Sync,
{
    async fn volume_set(&self, entity_id: &EntityId, level: f64) -> Result<(), CastkeeperError> {
        self.control(entity_id, "volume_set", |current| {
            media_player::volume_set(current, level)
        })
        .await
    }

    async fn turn_off(&self, entity_id: &EntityId) -> Result<(), CastkeeperError> {
        self.control(entity_id, "turn_off", media_player::turn_off)
            .await
    }

    async fn load_url(
        &self,
        entity_id: &EntityId,
        url: &str,
        force: bool,
    ) -> Result<(), CastkeeperError> {
        self.control(entity_id, "load_url", |current| {
            media_player::load_url(current, url, force)
        })
        .await
    }
}

impl<P> ThemeSetter for VirtualHost<P>
where
    P: EventPublisher + Send + Sync,
{
    async fn set_theme(&self, mode: ThemeMode, name: &str) -> Result<(), CastkeeperError> {
        tracing::info!(%mode, theme = name, "virtual theme applied");
        self.themes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mode, name.to_string());
        Ok(())
    }
}
