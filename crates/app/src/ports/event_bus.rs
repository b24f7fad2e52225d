//! Event bus port: publish state-change notifications.

use std::future::Future;

use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::event::StateChangedEvent;

/// Publishes state-change events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(
        &self,
        event: StateChangedEvent,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: StateChangedEvent,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send {
        (**self).publish(event)
    }
}
