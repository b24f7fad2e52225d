//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::event::StateChangedEvent;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). A subscriber that falls more than
/// `capacity` events behind receives `RecvError::Lagged` and resumes from
/// the oldest retained event.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<StateChangedEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChangedEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(
        &self,
        event: StateChangedEvent,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send {
        let entity_id = event.entity_id.clone();
        // broadcast::send fails only when there are zero receivers.
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::trace!(%entity_id, receivers, "state change published");
        async { Ok(()) }
    }
}
