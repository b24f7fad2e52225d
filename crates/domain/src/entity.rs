//! Entity snapshot: what the host reports about an entity at one instant.
//!
//! A snapshot carries the entity's state string and its attribute map.
//! Media players expose the attributes castkeeper cares about:
//! [`APP_NAME`] (the active application) and [`VOLUME_LEVEL`].

mod attribute_value;
mod state;

pub use attribute_value::AttributeValue;
pub use state::EntityState;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::EntityId;
use crate::time::{Timestamp, now};

/// Attribute holding the identifier of the application currently shown.
pub const APP_NAME: &str = "app_name";
/// Attribute holding the media player volume in `0.0..=1.0`.
pub const VOLUME_LEVEL: &str = "volume_level";

/// Point-in-time view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: EntityId,
    pub state: EntityState,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    pub last_changed: Timestamp,
}

impl EntitySnapshot {
    /// Snapshot with the given state and no attributes.
    #[must_use]
    pub fn new(entity_id: EntityId, state: EntityState) -> Self {
        Self {
            entity_id,
            state,
            attributes: HashMap::new(),
            last_changed: now(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// The active application, if reported.
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.get_attribute(APP_NAME).and_then(AttributeValue::as_str)
    }

    /// The reported volume level, if numeric.
    #[must_use]
    pub fn volume_level(&self) -> Option<f64> {
        self.get_attribute(VOLUME_LEVEL).and_then(AttributeValue::as_f64)
    }

    /// Replace the state, bumping `last_changed` only when it differs.
    pub fn update_state(&mut self, state: EntityState, at: Timestamp) {
        if self.state != state {
            self.state = state;
            self.last_changed = at;
        }
    }
}
