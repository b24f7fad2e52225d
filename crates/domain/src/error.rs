//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`CastkeeperError`] via `#[from]`.

/// Top-level error for castkeeper operations.
#[derive(Debug, thiserror::Error)]
pub enum CastkeeperError {
    /// A device's configuration could not be resolved.
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// A device-control action failed.
    #[error("device control failed")]
    Control(#[from] ControlError),

    /// A persisted value could not be decoded.
    #[error("invalid persisted value")]
    StoredValue(#[from] StoredValueError),

    /// The persistence backend failed.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Configuration errors detected while resolving a device's settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The entity id is not of the form `<domain>.<object_id>`.
    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),

    /// A required setting has no value after merging.
    #[error("{entity_id}: missing required setting `{field}`")]
    MissingField {
        entity_id: String,
        field: &'static str,
    },

    /// A setting holds a value outside its accepted range.
    #[error("{entity_id}: `{field}` must not be negative (got {value})")]
    Negative {
        entity_id: String,
        field: &'static str,
        value: i64,
    },
}

/// A device-control action could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The target entity is not known to the host.
    #[error("unknown entity {0}")]
    UnknownEntity(String),

    /// The device did not respond.
    #[error("{entity_id} is unreachable")]
    Unreachable { entity_id: String },

    /// The host refused the action.
    #[error("{action} rejected for {entity_id}: {reason}")]
    Rejected {
        entity_id: String,
        action: &'static str,
        reason: String,
    },
}

/// A persisted string could not be decoded into its typed field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("key {key:?} holds undecodable value {value:?}")]
pub struct StoredValueError {
    pub key: String,
    pub value: String,
}
