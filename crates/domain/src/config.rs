//! Device configuration: settings bags and the resolved, immutable
//! [`DeviceConfig`].
//!
//! Settings come from three layers, lowest precedence first: the built-in
//! defaults, the global section of the configuration file, and the
//! per-device overrides. [`DeviceSettings::merge`] combines two layers and
//! [`DeviceConfig::resolve`] fills the remaining gaps with the defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::id::EntityId;
use crate::time::optional_secs;

/// Default extra wait after a device comes back from `unavailable`.
pub const DEFAULT_BOOT_DELAY_SECS: i64 = 20;
/// Default hold before recasting an `off` device.
pub const DEFAULT_OFF_DURATION_SECS: i64 = 10;
/// Default hold before recasting an `idle` device.
pub const DEFAULT_IDLE_DURATION_SECS: i64 = 3 * 60;
/// Default hold before recasting a `paused` device.
pub const DEFAULT_PAUSED_DURATION_SECS: i64 = 3 * 60;

/// Optional per-device options, as written by the operator.
///
/// Durations are whole seconds; a negative hold duration disables the
/// matching trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSettings {
    pub dashboard_url: Option<String>,
    pub enable_switch: Option<String>,
    pub off_duration: Option<i64>,
    pub idle_duration: Option<i64>,
    pub paused_duration: Option<i64>,
    pub boot_delay: Option<i64>,
    pub mute_before_recast: Option<bool>,
    pub restore_volume_level: Option<bool>,
    pub recast_on_start: Option<bool>,
    pub light_theme: Option<String>,
    pub dark_theme: Option<String>,
}

impl DeviceSettings {
    /// Layer `overrides` on top of `self`; every set field in `overrides` wins.
    #[must_use]
    pub fn merge(&self, overrides: &Self) -> Self {
        Self {
            dashboard_url: overrides.dashboard_url.clone().or_else(|| self.dashboard_url.clone()),
            enable_switch: overrides.enable_switch.clone().or_else(|| self.enable_switch.clone()),
            off_duration: overrides.off_duration.or(self.off_duration),
            idle_duration: overrides.idle_duration.or(self.idle_duration),
            paused_duration: overrides.paused_duration.or(self.paused_duration),
            boot_delay: overrides.boot_delay.or(self.boot_delay),
            mute_before_recast: overrides.mute_before_recast.or(self.mute_before_recast),
            restore_volume_level: overrides.restore_volume_level.or(self.restore_volume_level),
            recast_on_start: overrides.recast_on_start.or(self.recast_on_start),
            light_theme: overrides.light_theme.clone().or_else(|| self.light_theme.clone()),
            dark_theme: overrides.dark_theme.clone().or_else(|| self.dark_theme.clone()),
        }
    }
}

/// Fully resolved configuration of one tracked device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeviceConfig {
    pub entity_id: EntityId,
    pub dashboard_url: String,
    /// Boolean entity gating all recasts; must be `on` when set.
    pub enable_switch: Option<EntityId>,
    /// `None` disables the matching hold trigger.
    pub off_hold: Option<Duration>,
    pub idle_hold: Option<Duration>,
    pub paused_hold: Option<Duration>,
    pub boot_delay: Duration,
    pub mute_before_recast: bool,
    pub restore_volume_level: bool,
    pub recast_on_start: bool,
    pub light_theme: Option<String>,
    pub dark_theme: Option<String>,
}

impl DeviceConfig {
    /// Resolve merged settings for `entity_id`, applying built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the entity id (or the enable switch id)
    /// is malformed, when no dashboard URL is configured, or when the boot
    /// delay is negative.
    pub fn resolve(entity_id: &str, settings: &DeviceSettings) -> Result<Self, ConfigError> {
        let entity_id: EntityId = entity_id.parse()?;

        let dashboard_url = settings
            .dashboard_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                entity_id: entity_id.to_string(),
                field: "dashboard_url",
            })?;

        let enable_switch: Option<EntityId> = settings
            .enable_switch
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<EntityId>)
            .transpose()?;

        let boot_delay_secs = settings.boot_delay.unwrap_or(DEFAULT_BOOT_DELAY_SECS);
        let boot_delay = optional_secs(boot_delay_secs).ok_or_else(|| ConfigError::Negative {
            entity_id: entity_id.to_string(),
            field: "boot_delay",
            value: boot_delay_secs,
        })?;

        Ok(Self {
            entity_id,
            dashboard_url,
            enable_switch,
            off_hold: optional_secs(settings.off_duration.unwrap_or(DEFAULT_OFF_DURATION_SECS)),
            idle_hold: optional_secs(settings.idle_duration.unwrap_or(DEFAULT_IDLE_DURATION_SECS)),
            paused_hold: optional_secs(
                settings
                    .paused_duration
                    .unwrap_or(DEFAULT_PAUSED_DURATION_SECS),
            ),
            boot_delay,
            mute_before_recast: settings.mute_before_recast.unwrap_or(true),
            restore_volume_level: settings.restore_volume_level.unwrap_or(true),
            recast_on_start: settings.recast_on_start.unwrap_or(true),
            light_theme: settings.light_theme.clone().filter(|t| !t.is_empty()),
            dark_theme: settings.dark_theme.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Whether either theme name is configured.
    #[must_use]
    pub fn has_themes(&self) -> bool {
        self.light_theme.is_some() || self.dark_theme.is_some()
    }
}
