//! Entity state: the status string an entity reports.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete reported state of an entity.
///
/// Well-known media player and switch states get their own variant;
/// anything else (e.g. `above_horizon` for the sun) is kept verbatim in
/// [`Custom`](Self::Custom).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityState {
    On,
    Off,
    Idle,
    Paused,
    Playing,
    Standby,
    Buffering,
    #[default]
    Unknown,
    Unavailable,
    Custom(String),
}

impl EntityState {
    /// Whether the entity is reachable (anything but [`Unavailable`](Self::Unavailable)).
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// The lowercase wire form of this state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Idle => "idle",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Standby => "standby",
            Self::Buffering => "buffering",
            Self::Unknown => "unknown",
            Self::Unavailable => "unavailable",
            Self::Custom(s) => s,
        }
    }
}

impl From<&str> for EntityState {
    fn from(s: &str) -> Self {
        match s {
            "on" => Self::On,
            "off" => Self::Off,
            "idle" => Self::Idle,
            "paused" => Self::Paused,
            "playing" => Self::Playing,
            "standby" => Self::Standby,
            "buffering" => Self::Buffering,
            "unknown" => Self::Unknown,
            "unavailable" => Self::Unavailable,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for EntityState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<EntityState> for String {
    fn from(state: EntityState) -> Self {
        state.as_str().to_string()
    }
}

impl FromStr for EntityState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
