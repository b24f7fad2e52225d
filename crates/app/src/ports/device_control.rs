//! Device control port: the media player actions castkeeper issues.

use std::future::Future;

use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::id::EntityId;

/// Commands sent to a media player through the host.
///
/// Implementations resolve once the host has accepted the command; they do
/// not wait for the device to report its new state.
pub trait DeviceControl: Send + Sync {
    /// Set the volume to `level` (`0.0..=1.0`).
    fn volume_set(
        &self,
        entity_id: &EntityId,
        level: f64,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send;

    /// Power the device off.
    fn turn_off(&self, entity_id: &EntityId)
    -> impl Future<Output = Result<(), CastkeeperError>> + Send;

    /// Cast `url` to the device; `force` replaces whatever is showing.
    fn load_url(
        &self,
        entity_id: &EntityId,
        url: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send;
}
