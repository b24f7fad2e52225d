//! Device automation engine: reacts to one device's state changes by
//! tracking its availability and volume and recasting it when it sits
//! `off`, `idle` or `paused` for too long.
//!
//! One [`DeviceAutomation`] exists per configured device. [`start`]
//! subscribes to the event bus, evaluates every handler once against the
//! current state, and spawns a dispatcher task that feeds subsequent events
//! to the handlers. The returned [`DeviceAutomationHandle`] owns that task;
//! dropping it stops the device's automation.
//!
//! [`start`]: DeviceAutomation::start

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use castkeeper_domain::config::DeviceConfig;
use castkeeper_domain::entity::{EntitySnapshot, EntityState, VOLUME_LEVEL};
use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::event::StateChangedEvent;

use crate::device_memory::DeviceMemory;
use crate::event_bus::InProcessEventBus;
use crate::hold::HoldTrigger;
use crate::ports::{DeviceControl, KeyValueStore, StateReader};
use crate::recast::{Readiness, RecastController};

/// A handler the engine registered for its device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Marks the device unavailable when it reports `unavailable`.
    Unavailability,
    /// Records every reported volume level.
    VolumeLevel,
    /// Recasts after `status` has been held for `hold`.
    Hold { status: EntityState, hold: Duration },
    /// Powers off a stale cast session once at startup.
    RecastOnStart,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailability => f.write_str("unavailability"),
            Self::VolumeLevel => f.write_str("volume_level"),
            Self::Hold { status, hold } => write!(f, "hold({status}, {}s)", hold.as_secs()),
            Self::RecastOnStart => f.write_str("recast_on_start"),
        }
    }
}

/// Per-device automation: configuration, runtime state, and handlers.
pub struct DeviceAutomation<S, C, K> {
    config: Arc<DeviceConfig>,
    states: Arc<S>,
    control: Arc<C>,
    memory: Arc<DeviceMemory<K>>,
    recast: Arc<RecastController<S, C, K>>,
}

impl<S, C, K> DeviceAutomation<S, C, K>
where
    S: StateReader + 'static,
    C: DeviceControl + 'static,
    K: KeyValueStore + 'static,
{
    /// Build the engine, initialising the device's persisted memory.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error from [`DeviceMemory::load`].
    pub async fn new(
        config: DeviceConfig,
        states: Arc<S>,
        control: Arc<C>,
        store: Arc<K>,
    ) -> Result<Self, CastkeeperError> {
        let config = Arc::new(config);
        let memory = Arc::new(DeviceMemory::load(store, &config.entity_id).await?);
        let recast = Arc::new(RecastController::new(
            Arc::clone(&config),
            Arc::clone(&states),
            Arc::clone(&control),
            Arc::clone(&memory),
        ));
        Ok(Self {
            config,
            states,
            control,
            memory,
            recast,
        })
    }

    /// The device's resolved configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The device's persisted memory.
    #[must_use]
    pub fn memory(&self) -> &DeviceMemory<K> {
        &self.memory
    }

    /// The device's recast controller.
    #[must_use]
    pub fn recast(&self) -> &RecastController<S, C, K> {
        &self.recast
    }

    /// Handlers enabled by the configuration, in evaluation order.
    #[must_use]
    pub fn registered_triggers(&self) -> Vec<Trigger> {
        let mut triggers = vec![Trigger::Unavailability];
        if self.config.restore_volume_level {
            triggers.push(Trigger::VolumeLevel);
        }
        triggers.extend(self.hold_triggers().iter().map(|hold| Trigger::Hold {
            status: hold.status().clone(),
            hold: hold.hold(),
        }));
        if self.config.recast_on_start {
            triggers.push(Trigger::RecastOnStart);
        }
        triggers
    }

    /// Subscribe to `bus`, run the startup evaluation, and spawn the
    /// dispatcher.
    #[tracing::instrument(skip_all, fields(entity_id = %self.config.entity_id))]
    pub async fn start(self, bus: &InProcessEventBus) -> DeviceAutomationHandle<S, C, K> {
        let triggers = self.registered_triggers();
        tracing::info!(
            triggers = %triggers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            "starting device automation"
        );

        let engine = Arc::new(self);
        let events = bus.subscribe();
        let mut holds = engine.hold_triggers();
        engine.on_startup(&mut holds).await;

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.dispatch(events, holds).await }
        });
        DeviceAutomationHandle { engine, task }
    }

    fn hold_triggers(&self) -> Vec<HoldTrigger> {
        let config = &*self.config;
        [
            (EntityState::Off, config.off_hold),
            (EntityState::Idle, config.idle_hold),
            (EntityState::Paused, config.paused_hold),
        ]
        .into_iter()
        .filter_map(|(status, hold)| {
            hold.map(|hold| HoldTrigger::new(config.entity_id.clone(), status, hold))
        })
        .collect()
    }

    async fn on_startup(&self, holds: &mut [HoldTrigger]) {
        if let Some(current) = self.states.snapshot(&self.config.entity_id) {
            self.track_unavailability(&current).await;
            if self.config.restore_volume_level {
                self.track_volume(&current).await;
            }
            self.observe_holds(holds, &current.state);
        } else {
            tracing::warn!(entity_id = %self.config.entity_id, "device not known to the host yet");
        }

        if self.config.recast_on_start {
            self.recast_on_start().await;
        }
    }

    async fn dispatch(
        &self,
        mut events: broadcast::Receiver<StateChangedEvent>,
        mut holds: Vec<HoldTrigger>,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&mut holds, &event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(entity_id = %self.config.entity_id, skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(entity_id = %self.config.entity_id, "event stream closed");
    }

    async fn handle_event(&self, holds: &mut [HoldTrigger], event: &StateChangedEvent) {
        if event.entity_id != self.config.entity_id {
            return;
        }

        if event.state_changed() {
            self.track_unavailability(&event.new).await;
            self.observe_holds(holds, &event.new.state);
        }
        if self.config.restore_volume_level && event.attribute_changed(VOLUME_LEVEL) {
            self.track_volume(&event.new).await;
        }
    }

    fn observe_holds(&self, holds: &mut [HoldTrigger], state: &EntityState) {
        for hold in holds {
            hold.observe(state, || {
                let recast = Arc::clone(&self.recast);
                async move { recast.attempt_recast().await }
            });
        }
    }

    async fn track_unavailability(&self, snapshot: &EntitySnapshot) {
        if snapshot.state != EntityState::Unavailable {
            return;
        }
        tracing::info!(entity_id = %self.config.entity_id, "device became unavailable");
        if let Err(err) = self.memory.mark_unavailable().await {
            tracing::warn!(entity_id = %self.config.entity_id, %err, "failed to persist availability");
        }
    }

    async fn track_volume(&self, snapshot: &EntitySnapshot) {
        let Some(level) = snapshot.volume_level() else {
            return;
        };
        tracing::debug!(entity_id = %self.config.entity_id, level, "volume level changed");
        if let Err(err) = self.memory.record_volume(level).await {
            tracing::warn!(entity_id = %self.config.entity_id, %err, "failed to persist volume level");
        }
    }

    /// Power off a cast session left over from a previous run.
    ///
    /// Turning the device off lets the `off` hold trigger recast it with a
    /// fresh session; no recast job is created here.
    async fn recast_on_start(&self) {
        let readiness = Readiness::read(&self.config, &*self.states);
        if !(readiness.should_cast && readiness.casting) {
            return;
        }
        tracing::info!(entity_id = %self.config.entity_id, "powering off stale cast session");
        if let Err(err) = self.control.turn_off(&self.config.entity_id).await {
            tracing::error!(entity_id = %self.config.entity_id, %err, "failed to power off device");
        }
    }
}

/// Owns a started [`DeviceAutomation`] and its dispatcher task.
pub struct DeviceAutomationHandle<S, C, K> {
    engine: Arc<DeviceAutomation<S, C, K>>,
    task: JoinHandle<()>,
}

impl<S, C, K> DeviceAutomationHandle<S, C, K>
where
    S: StateReader + 'static,
    C: DeviceControl + 'static,
    K: KeyValueStore + 'static,
{
    /// The running engine.
    #[must_use]
    pub fn engine(&self) -> &DeviceAutomation<S, C, K> {
        &self.engine
    }

    /// Stop the dispatcher (disarming hold timers), close the recast
    /// controller to hold timers that already fired, and cancel any running
    /// recast.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        self.engine.recast.close().await;
        tracing::info!(entity_id = %self.engine.config.entity_id, "device automation stopped");
    }
}

impl<S, C, K> Drop for DeviceAutomationHandle<S, C, K> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
