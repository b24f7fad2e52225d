//! Hold triggers: fire once a status has been reported continuously for a
//! configured duration.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use castkeeper_domain::entity::EntityState;
use castkeeper_domain::id::EntityId;

/// Debounce timer for one status value of one device.
///
/// Feed it every state transition through [`observe`](Self::observe).
/// Entering the status (re)arms the timer, any other state disarms it.
/// Once the timer has fired the action runs to completion even if the
/// state changes again.
pub struct HoldTrigger {
    entity_id: EntityId,
    status: EntityState,
    hold: Duration,
    armed: Option<CancellationToken>,
}

impl HoldTrigger {
    /// A disarmed trigger for `status` held during `hold`.
    #[must_use]
    pub fn new(entity_id: EntityId, status: EntityState, hold: Duration) -> Self {
        Self {
            entity_id,
            status,
            hold,
            armed: None,
        }
    }

    /// The status this trigger waits for.
    #[must_use]
    pub fn status(&self) -> &EntityState {
        &self.status
    }

    /// The configured hold duration.
    #[must_use]
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Whether a timer is currently pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.as_ref().is_some_and(|token| !token.is_cancelled())
    }

    /// React to the device now reporting `state`.
    ///
    /// `fire` builds the action run when the hold elapses; it is only
    /// called when the timer is armed.
    pub fn observe<F, Fut>(&mut self, state: &EntityState, fire: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        if *state != self.status {
            return;
        }

        let token = CancellationToken::new();
        let action = fire();
        let hold = self.hold;
        let entity_id = self.entity_id.clone();
        let status = self.status.clone();
        tokio::spawn({
            let token = token.clone();
            async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(hold) => {}
                }
                token.cancel();
                tracing::info!(%entity_id, %status, hold_secs = hold.as_secs(), "hold elapsed");
                action.await;
            }
        });
        tracing::debug!(entity_id = %self.entity_id, status = %self.status, "hold armed");
        self.armed = Some(token);
    }

    /// Cancel the pending timer, if any.
    pub fn disarm(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
        }
    }
}

impl Drop for HoldTrigger {
    fn drop(&mut self) {
        self.disarm();
    }
}
