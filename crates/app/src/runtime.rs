//! Runtime: one engine (and optional theme switcher) per configured device.

use std::sync::Arc;

use castkeeper_domain::config::DeviceConfig;
use castkeeper_domain::id::EntityId;

use crate::automation_engine::{DeviceAutomation, DeviceAutomationHandle};
use crate::event_bus::InProcessEventBus;
use crate::ports::{DeviceControl, KeyValueStore, StateReader, ThemeSetter};
use crate::theme_switcher::{ThemeSwitcher, ThemeSwitcherHandle};

/// The host-side port implementations shared by every device.
pub struct Host<S, C, K, T> {
    pub states: Arc<S>,
    pub control: Arc<C>,
    pub store: Arc<K>,
    pub themes: Arc<T>,
}

impl<S, C, K, T> Clone for Host<S, C, K, T> {
    fn clone(&self) -> Self {
        Self {
            states: Arc::clone(&self.states),
            control: Arc::clone(&self.control),
            store: Arc::clone(&self.store),
            themes: Arc::clone(&self.themes),
        }
    }
}

/// Every started device automation and theme switcher.
pub struct AutomationRuntime<S, C, K> {
    devices: Vec<DeviceAutomationHandle<S, C, K>>,
    switchers: Vec<ThemeSwitcherHandle>,
}

impl<S, C, K> AutomationRuntime<S, C, K>
where
    S: StateReader + 'static,
    C: DeviceControl + 'static,
    K: KeyValueStore + 'static,
{
    /// Start one engine per config, plus a theme switcher for configs that
    /// name a theme. A device whose engine cannot be built is logged and
    /// skipped.
    #[tracing::instrument(skip_all, fields(devices = configs.len()))]
    pub async fn start<T: ThemeSetter + 'static>(
        configs: Vec<DeviceConfig>,
        host: &Host<S, C, K, T>,
        bus: &InProcessEventBus,
        sun: &EntityId,
    ) -> Self {
        let mut devices = Vec::with_capacity(configs.len());
        let mut switchers = Vec::new();

        for config in configs {
            let entity_id = config.entity_id.clone();
            let engine = match DeviceAutomation::new(
                config,
                Arc::clone(&host.states),
                Arc::clone(&host.control),
                Arc::clone(&host.store),
            )
            .await
            {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!(%entity_id, %err, "skipping device, automation could not start");
                    continue;
                }
            };

            if engine.config().has_themes() {
                let switcher = ThemeSwitcher::new(
                    Arc::new(engine.config().clone()),
                    sun.clone(),
                    Arc::clone(&host.states),
                    Arc::clone(&host.themes),
                );
                switchers.push(switcher.start(bus).await);
            }
            devices.push(engine.start(bus).await);
        }

        tracing::info!(
            started = devices.len(),
            theme_switchers = switchers.len(),
            "automation runtime started"
        );
        Self { devices, switchers }
    }

    /// Handles of the running device automations.
    #[must_use]
    pub fn devices(&self) -> &[DeviceAutomationHandle<S, C, K>] {
        &self.devices
    }

    /// Stop every engine and switcher, cancelling running recasts.
    pub async fn shutdown(self) {
        for switcher in self.switchers {
            switcher.shutdown().await;
        }
        for device in self.devices {
            device.shutdown().await;
        }
        tracing::info!("automation runtime stopped");
    }
}
