//! Persisted device memory: the per-device runtime state mirrored into the
//! key/value store so it survives restarts.
//!
//! Two slots exist per device, keyed by the entity's object id:
//!
//! | Key | Encoding | Default |
//! |-----|----------|---------|
//! | `castkeeper.<object_id>_availability` | `"1"` available, `"0"` unavailable | `"1"` |
//! | `castkeeper.<object_id>_volume_level` | decimal float | `"0.0"` |
//!
//! The in-memory [`DeviceRuntimeState`] is a cache; the store is read back
//! whenever the recast sequence needs a value.

use std::sync::{Arc, Mutex, PoisonError};

use castkeeper_domain::error::{CastkeeperError, StoredValueError};
use castkeeper_domain::id::EntityId;

use crate::ports::KeyValueStore;

/// Prefix shared by every persisted key.
pub const KEY_PREFIX: &str = "castkeeper";

const AVAILABLE: &str = "1";
const UNAVAILABLE: &str = "0";
const DEFAULT_VOLUME: &str = "0.0";

/// Whether the device was last seen unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
}

impl Availability {
    fn encode(self) -> &'static str {
        match self {
            Self::Available => AVAILABLE,
            Self::Unavailable => UNAVAILABLE,
        }
    }

    fn decode(key: &str, value: &str) -> Result<Self, StoredValueError> {
        match value {
            AVAILABLE => Ok(Self::Available),
            UNAVAILABLE => Ok(Self::Unavailable),
            _ => Err(StoredValueError {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Mutable per-device state owned by one engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceRuntimeState {
    pub availability: Availability,
    pub last_volume_level: f64,
}

/// Typed view over a device's persisted slots, with an in-memory cache.
pub struct DeviceMemory<K> {
    store: Arc<K>,
    availability_key: String,
    volume_key: String,
    cache: Mutex<DeviceRuntimeState>,
}

impl<K: KeyValueStore> DeviceMemory<K> {
    /// Initialise both slots if absent and load them into the cache.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store fails, or
    /// [`CastkeeperError::StoredValue`] if a stored value cannot be decoded.
    pub async fn load(store: Arc<K>, entity_id: &EntityId) -> Result<Self, CastkeeperError> {
        let availability_key = format!("{KEY_PREFIX}.{}_availability", entity_id.object_id());
        let volume_key = format!("{KEY_PREFIX}.{}_volume_level", entity_id.object_id());

        let raw = store.get_or_init(&availability_key, AVAILABLE).await?;
        let availability = Availability::decode(&availability_key, &raw)?;
        let raw = store.get_or_init(&volume_key, DEFAULT_VOLUME).await?;
        let last_volume_level = decode_volume(&volume_key, &raw)?;

        Ok(Self {
            store,
            availability_key,
            volume_key,
            cache: Mutex::new(DeviceRuntimeState {
                availability,
                last_volume_level,
            }),
        })
    }

    /// Key of the availability slot.
    #[must_use]
    pub fn availability_key(&self) -> &str {
        &self.availability_key
    }

    /// Key of the volume slot.
    #[must_use]
    pub fn volume_key(&self) -> &str {
        &self.volume_key
    }

    /// Snapshot of the cached runtime state.
    #[must_use]
    pub fn cached(&self) -> DeviceRuntimeState {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that the device reported `unavailable`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn mark_unavailable(&self) -> Result<(), CastkeeperError> {
        self.write_availability(Availability::Unavailable).await
    }

    /// Consume the unavailable flag.
    ///
    /// Returns `true` (and resets the flag to available in both copies) when
    /// the persisted flag says the device was unavailable.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn take_unavailable(&self) -> Result<bool, CastkeeperError> {
        let raw = self
            .store
            .get_or_init(&self.availability_key, AVAILABLE)
            .await?;
        if Availability::decode(&self.availability_key, &raw)? == Availability::Available {
            return Ok(false);
        }
        self.write_availability(Availability::Available).await?;
        Ok(true)
    }

    /// Record the latest reported volume level.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn record_volume(&self, level: f64) -> Result<(), CastkeeperError> {
        self.store.set(&self.volume_key, &level.to_string()).await?;
        self.lock_cache().last_volume_level = level;
        Ok(())
    }

    /// Read the persisted volume level.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn stored_volume(&self) -> Result<f64, CastkeeperError> {
        let raw = self
            .store
            .get_or_init(&self.volume_key, DEFAULT_VOLUME)
            .await?;
        let level = decode_volume(&self.volume_key, &raw)?;
        self.lock_cache().last_volume_level = level;
        Ok(level)
    }

    async fn write_availability(&self, availability: Availability) -> Result<(), CastkeeperError> {
        self.store
            .set(&self.availability_key, availability.encode())
            .await?;
        self.lock_cache().availability = availability;
        Ok(())
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, DeviceRuntimeState> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode_volume(key: &str, value: &str) -> Result<f64, StoredValueError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StoredValueError {
            key: key.to_string(),
            value: value.to_string(),
        })
}
