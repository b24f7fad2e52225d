//! Textual entity identifiers (`<domain>.<object_id>`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identifier of an entity known to the host, e.g. `media_player.kitchen_display`.
///
/// Always contains a `.` separating a non-empty domain from a non-empty
/// object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// The part before the first `.` (e.g. `media_player`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.split().0
    }

    /// The part after the first `.` (e.g. `kitchen_display`).
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.split().1
    }

    /// Borrow the full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        // Construction guarantees the separator exists.
        self.0.split_once('.').unwrap_or(("", &self.0))
    }
}

impl FromStr for EntityId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ConfigError::InvalidEntityId(s.to_string())),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
