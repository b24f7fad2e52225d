//! Virtual cast-capable media player.

use castkeeper_domain::entity::{APP_NAME, EntitySnapshot, EntityState, VOLUME_LEVEL};
use castkeeper_domain::error::ControlError;
use castkeeper_domain::id::EntityId;
use castkeeper_domain::predicate::CAST_APP_NAME;
use castkeeper_domain::time::now;

/// Entity domain of media players.
pub const DOMAIN: &str = "media_player";
/// Attribute holding the URL being shown.
pub const MEDIA_CONTENT_ID: &str = "media_content_id";

const INITIAL_VOLUME: f64 = 0.5;

/// A powered-off player at the initial volume.
#[must_use]
pub fn initial(entity_id: EntityId) -> EntitySnapshot {
    EntitySnapshot::new(entity_id, EntityState::Off).with_attribute(VOLUME_LEVEL, INITIAL_VOLUME)
}

/// Start casting `url`.
///
/// Without `force`, a player already showing the cast app keeps its session.
///
/// # Errors
///
/// Returns [`ControlError::Unreachable`] while the player is unavailable.
pub fn load_url(current: &EntitySnapshot, url: &str, force: bool) -> Result<EntitySnapshot, ControlError> {
    ensure_reachable(current)?;
    if !force && current.app_name() == Some(CAST_APP_NAME) {
        return Ok(current.clone());
    }
    let mut next = current
        .clone()
        .with_attribute(APP_NAME, CAST_APP_NAME)
        .with_attribute(MEDIA_CONTENT_ID, url);
    next.update_state(EntityState::Playing, now());
    Ok(next)
}

/// Power the player off, ending any session.
///
/// # Errors
///
/// Returns [`ControlError::Unreachable`] while the player is unavailable.
pub fn turn_off(current: &EntitySnapshot) -> Result<EntitySnapshot, ControlError> {
    ensure_reachable(current)?;
    let mut next = current.clone();
    next.attributes.remove(APP_NAME);
    next.attributes.remove(MEDIA_CONTENT_ID);
    next.update_state(EntityState::Off, now());
    Ok(next)
}

/// Set the volume.
///
/// # Errors
///
/// Returns [`ControlError::Rejected`] for a level outside `0.0..=1.0` and
/// [`ControlError::Unreachable`] while the player is unavailable.
pub fn volume_set(current: &EntitySnapshot, level: f64) -> Result<EntitySnapshot, ControlError> {
    if !(0.0..=1.0).contains(&level) {
        return Err(ControlError::Rejected {
            entity_id: current.entity_id.to_string(),
            action: "volume_set",
            reason: format!("volume level {level} out of range"),
        });
    }
    ensure_reachable(current)?;
    Ok(current.clone().with_attribute(VOLUME_LEVEL, level))
}

fn ensure_reachable(current: &EntitySnapshot) -> Result<(), ControlError> {
    if current.state == EntityState::Unavailable {
        return Err(ControlError::Unreachable {
            entity_id: current.entity_id.to_string(),
        });
    }
    Ok(())
}
