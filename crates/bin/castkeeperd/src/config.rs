//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `castkeeper.toml` in the working directory, or at the path in
//! `CASTKEEPER_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! Devices are listed either as bare entity ids or as tables carrying
//! per-device overrides of the `[defaults]` section:
//!
//! ```toml
//! devices = [
//!     "media_player.kitchen_display",
//!     { entity_id = "media_player.hall_display", off_duration = 30 },
//! ]
//!
//! [defaults]
//! dashboard_url = "http://hass.local:8123/lovelace/kiosk"
//! ```

use std::collections::HashSet;

use serde::Deserialize;

use castkeeper_domain::config::{DeviceConfig, DeviceSettings};
use castkeeper_domain::id::EntityId;
use castkeeper_domain::theme::DEFAULT_SUN_ENTITY;

const DEFAULT_PATH: &str = "castkeeper.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key/value store settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Sun entity driving the theme switchers.
    pub sun: SunConfig,
    /// Initial state of the simulated host.
    pub simulation: SimulationConfig,
    /// Settings shared by every device.
    pub defaults: DeviceSettings,
    /// Tracked devices.
    pub devices: Vec<DeviceEntry>,
}

/// Which key/value store backs the device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Volatile; device memory is lost on restart.
    Memory,
}

/// Key/value store configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SunConfig {
    pub entity_id: String,
}

/// Simulated host settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Start with the sun above the horizon.
    pub sun_above_horizon: bool,
    /// Enable switches that start `off`; every other switch starts `on`.
    pub switches_off: Vec<String>,
}

/// One `devices` entry: a bare id, or an id with overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DeviceEntry {
    Id(String),
    Table(DeviceTable),
}

/// A `devices` table: `entity_id` plus overrides of `[defaults]`.
///
/// Parsed through a [`toml::Table`] so unknown override keys are rejected
/// the same way they are under `[defaults]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "toml::Table")]
pub struct DeviceTable {
    pub entity_id: String,
    pub settings: DeviceSettings,
}

impl TryFrom<toml::Table> for DeviceTable {
    type Error = String;

    fn try_from(mut table: toml::Table) -> Result<Self, Self::Error> {
        let entity_id = match table.remove("entity_id") {
            Some(toml::Value::String(entity_id)) => entity_id,
            Some(other) => return Err(format!("entity_id must be a string, got {other}")),
            None => return Err("missing entity_id".to_string()),
        };
        let settings = toml::Value::Table(table)
            .try_into::<DeviceSettings>()
            .map_err(|err| format!("{entity_id}: {err}"))?;
        Ok(Self {
            entity_id,
            settings,
        })
    }
}

impl DeviceEntry {
    fn entity_id(&self) -> &str {
        match self {
            Self::Id(entity_id) | Self::Table(DeviceTable { entity_id, .. }) => entity_id,
        }
    }

    fn overrides(&self) -> Option<&DeviceSettings> {
        match self {
            Self::Id(_) => None,
            Self::Table(table) => Some(&table.settings),
        }
    }
}

impl Config {
    /// Load configuration from `castkeeper.toml` (or `CASTKEEPER_CONFIG`)
    /// if present, then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CASTKEEPER_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("CASTKEEPER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("CASTKEEPER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StorageBackend::Sqlite && self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database url must not be empty".to_string(),
            ));
        }
        self.sun_entity()?;
        Ok(())
    }

    /// The sun entity id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the id is malformed.
    pub fn sun_entity(&self) -> Result<EntityId, ConfigError> {
        self.sun
            .entity_id
            .parse()
            .map_err(|err| ConfigError::Validation(format!("sun: {err}")))
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Resolve every device entry against `[defaults]`.
    ///
    /// Entries that fail to resolve, and repeated entity ids, are logged
    /// and skipped.
    #[must_use]
    pub fn resolve_devices(&self) -> Vec<DeviceConfig> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.devices.len());

        for entry in &self.devices {
            let settings = match entry.overrides() {
                Some(overrides) => self.defaults.merge(overrides),
                None => self.defaults.clone(),
            };
            match DeviceConfig::resolve(entry.entity_id(), &settings) {
                Ok(config) if !seen.insert(config.entity_id.clone()) => {
                    tracing::warn!(entity_id = %config.entity_id, "device listed twice, keeping the first entry");
                }
                Ok(config) => resolved.push(config),
                Err(err) => {
                    tracing::error!(entity_id = entry.entity_id(), %err, "skipping misconfigured device");
                }
            }
        }
        resolved
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            url: "sqlite:castkeeper.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "castkeeperd=info,castkeeper_app=info,castkeeper_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            entity_id: DEFAULT_SUN_ENTITY.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
