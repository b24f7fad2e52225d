//! Theme selection from the sun position.

use std::fmt;

use crate::config::DeviceConfig;
use crate::entity::EntityState;

/// Sun entity tracked by default.
pub const DEFAULT_SUN_ENTITY: &str = "sun.sun";
/// Sun state during daytime; every other state counts as night.
pub const ABOVE_HORIZON: &str = "above_horizon";

/// Appearance mode a theme is applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    /// Both modes, in the order they are applied.
    pub const ALL: [Self; 2] = [Self::Light, Self::Dark];
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Dark => f.write_str("dark"),
        }
    }
}

/// Pick the light theme by day and the dark theme otherwise.
///
/// Returns `None` when the selected theme is not configured.
#[must_use]
pub fn select_theme<'a>(config: &'a DeviceConfig, sun: Option<&EntityState>) -> Option<&'a str> {
    let daytime = sun.is_some_and(|state| state.as_str() == ABOVE_HORIZON);
    if daytime {
        config.light_theme.as_deref()
    } else {
        config.dark_theme.as_deref()
    }
}
