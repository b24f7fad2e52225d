//! Sun-driven theme switching for devices that name a light or dark theme.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use castkeeper_domain::config::DeviceConfig;
use castkeeper_domain::error::CastkeeperError;
use castkeeper_domain::id::EntityId;
use castkeeper_domain::theme::{ThemeMode, select_theme};

use crate::event_bus::InProcessEventBus;
use crate::ports::{StateReader, ThemeSetter};

/// Applies a device's light or dark theme following the sun entity.
pub struct ThemeSwitcher<S, T> {
    config: Arc<DeviceConfig>,
    sun: EntityId,
    states: Arc<S>,
    themes: Arc<T>,
}

impl<S, T> ThemeSwitcher<S, T>
where
    S: StateReader + 'static,
    T: ThemeSetter + 'static,
{
    #[must_use]
    pub fn new(config: Arc<DeviceConfig>, sun: EntityId, states: Arc<S>, themes: Arc<T>) -> Self {
        Self {
            config,
            sun,
            states,
            themes,
        }
    }

    /// Apply the theme matching the sun's current state to both modes.
    ///
    /// Does nothing when the selected theme is not configured.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the [`ThemeSetter`].
    pub async fn apply(&self) -> Result<(), CastkeeperError> {
        let sun = self.states.state(&self.sun);
        let Some(name) = select_theme(&self.config, sun.as_ref()) else {
            return Ok(());
        };
        tracing::info!(entity_id = %self.config.entity_id, theme = name, "applying theme");
        for mode in ThemeMode::ALL {
            self.themes.set_theme(mode, name).await?;
        }
        Ok(())
    }

    /// Apply once now, then again on every sun state change.
    pub async fn start(self, bus: &InProcessEventBus) -> ThemeSwitcherHandle {
        let mut events = bus.subscribe();
        self.apply_logged().await;

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.entity_id == self.sun && event.state_changed() => {
                        self.apply_logged().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(entity_id = %self.config.entity_id, skipped, "theme events lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        ThemeSwitcherHandle { task }
    }

    async fn apply_logged(&self) {
        if let Err(err) = self.apply().await {
            tracing::warn!(entity_id = %self.config.entity_id, %err, "failed to apply theme");
        }
    }
}

/// Owns a running [`ThemeSwitcher`]; dropping it stops the switcher.
pub struct ThemeSwitcherHandle {
    task: JoinHandle<()>,
}

impl ThemeSwitcherHandle {
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for ThemeSwitcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
