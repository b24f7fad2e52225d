//! In-memory fakes for the ports, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use castkeeper_domain::entity::{EntitySnapshot, EntityState, VOLUME_LEVEL};
use castkeeper_domain::error::{CastkeeperError, ControlError};
use castkeeper_domain::event::StateChangedEvent;
use castkeeper_domain::id::EntityId;
use castkeeper_domain::theme::ThemeMode;

use crate::event_bus::InProcessEventBus;
use crate::ports::{DeviceControl, EventPublisher, KeyValueStore, StateReader, ThemeSetter};

/// A device-control call recorded by [`FakeHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    VolumeSet(f64),
    TurnOff,
    LoadUrl(String),
}

/// Passive host: records control calls, never changes state on its own.
pub struct FakeHost {
    pub bus: InProcessEventBus,
    started: Instant,
    states: Mutex<HashMap<EntityId, EntitySnapshot>>,
    store: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(std::time::Duration, EntityId, Call)>>,
    themes: Mutex<Vec<(ThemeMode, String)>>,
    failing: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bus: InProcessEventBus::new(64),
            started: Instant::now(),
            states: Mutex::new(HashMap::new()),
            store: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            themes: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    /// Seed a snapshot without publishing an event.
    pub fn seed(&self, snapshot: EntitySnapshot) {
        self.states
            .lock()
            .unwrap()
            .insert(snapshot.entity_id.clone(), snapshot);
    }

    /// Change an entity's state and publish the matching event.
    pub async fn set_state(&self, entity_id: &str, state: EntityState) {
        let id: EntityId = entity_id.parse().unwrap();
        let old = self.snapshot(&id);
        let mut new = old
            .clone()
            .unwrap_or_else(|| EntitySnapshot::new(id.clone(), state.clone()));
        new.update_state(state, castkeeper_domain::time::now());
        self.push(old, new).await;
    }

    /// Change an entity's volume attribute and publish the matching event.
    pub async fn set_volume(&self, entity_id: &str, level: f64) {
        let id: EntityId = entity_id.parse().unwrap();
        let old = self.snapshot(&id);
        let new = old
            .clone()
            .unwrap_or_else(|| EntitySnapshot::new(id.clone(), EntityState::Idle))
            .with_attribute(VOLUME_LEVEL, level);
        self.push(old, new).await;
    }

    async fn push(&self, old: Option<EntitySnapshot>, new: EntitySnapshot) {
        self.seed(new.clone());
        self.bus
            .publish(StateChangedEvent::new(old, new))
            .await
            .unwrap();
    }

    pub fn store_value(&self, key: &str, value: &str) {
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    /// Recorded calls with their offset from the host's creation.
    pub fn calls(&self) -> Vec<(std::time::Duration, Call)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _, call)| (*at, call.clone()))
            .collect()
    }

    pub fn themes(&self) -> Vec<(ThemeMode, String)> {
        self.themes.lock().unwrap().clone()
    }

    pub fn fail_control(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, entity_id: &EntityId, call: Call) -> Result<(), CastkeeperError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ControlError::Unreachable {
                entity_id: entity_id.to_string(),
            }
            .into());
        }
        self.calls
            .lock()
            .unwrap()
            .push((self.started.elapsed(), entity_id.clone(), call));
        Ok(())
    }
}

impl StateReader for FakeHost {
    fn snapshot(&self, entity_id: &EntityId) -> Option<EntitySnapshot> {
        self.states.lock().unwrap().get(entity_id).cloned()
    }
}

impl DeviceControl for FakeHost {
    async fn volume_set(&self, entity_id: &EntityId, level: f64) -> Result<(), CastkeeperError> {
        self.record(entity_id, Call::VolumeSet(level))
    }

    async fn turn_off(&self, entity_id: &EntityId) -> Result<(), CastkeeperError> {
        self.record(entity_id, Call::TurnOff)
    }

    async fn load_url(
        &self,
        entity_id: &EntityId,
        url: &str,
        _force: bool,
    ) -> Result<(), CastkeeperError> {
        self.record(entity_id, Call::LoadUrl(url.to_string()))
    }
}

impl KeyValueStore for FakeHost {
    async fn get(&self, key: &str) -> Result<Option<String>, CastkeeperError> {
        Ok(self.stored(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CastkeeperError> {
        self.store_value(key, value);
        Ok(())
    }
}

impl ThemeSetter for FakeHost {
    async fn set_theme(&self, mode: ThemeMode, name: &str) -> Result<(), CastkeeperError> {
        self.themes.lock().unwrap().push((mode, name.to_string()));
        Ok(())
    }
}

/// Let spawned tasks run until they block on something not yet ready.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
