//! # castkeeperd: castkeeper daemon
//!
//! Composition root that wires all adapters together and runs one recast
//! automation per configured device.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Open the key/value store (`SQLite` with migrations, or in-memory)
//! - Build the simulated host and register the configured entities
//! - Start the automation runtime and stop it on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use castkeeper_adapter_storage_sqlite_sqlx::{Config as StorageConfig, SqliteKeyValueStore};
use castkeeper_adapter_virtual::{MemoryKeyValueStore, VirtualHost};
use castkeeper_app::event_bus::InProcessEventBus;
use castkeeper_app::ports::KeyValueStore;
use castkeeper_app::runtime::{AutomationRuntime, Host};
use castkeeper_domain::config::DeviceConfig;
use castkeeper_domain::id::EntityId;

use crate::config::{Config, StorageBackend};

type SimulatedHost = VirtualHost<InProcessEventBus>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let devices = config.resolve_devices();
    if devices.is_empty() {
        tracing::warn!("no device configured, nothing to automate");
    }
    let sun = config.sun_entity()?;

    // Event bus
    let event_bus = InProcessEventBus::new(256);

    // Simulated host
    let virtual_host = Arc::new(VirtualHost::new(event_bus.clone()));
    register_entities(&virtual_host, &config, &devices, &sun)?;

    match config.database.backend {
        StorageBackend::Sqlite => {
            let db = StorageConfig {
                database_url: config.database_url().to_string(),
            }
            .build()
            .await?;
            let store = Arc::new(SqliteKeyValueStore::new(db.pool().clone()));
            run(devices, virtual_host, store, &event_bus, &sun).await
        }
        StorageBackend::Memory => {
            tracing::warn!("device memory is volatile and will be lost on restart");
            let store = Arc::new(MemoryKeyValueStore::new());
            run(devices, virtual_host, store, &event_bus, &sun).await
        }
    }
}

fn register_entities(
    host: &SimulatedHost,
    config: &Config,
    devices: &[DeviceConfig],
    sun: &EntityId,
) -> Result<(), Box<dyn std::error::Error>> {
    host.add_sun(sun.clone(), config.simulation.sun_above_horizon);

    let switches_off = config
        .simulation
        .switches_off
        .iter()
        .map(|id| id.parse::<EntityId>())
        .collect::<Result<Vec<_>, _>>()?;

    for device in devices {
        host.add_media_player(device.entity_id.clone());
        if let Some(switch) = &device.enable_switch {
            host.add_switch(switch.clone(), !switches_off.contains(switch));
        }
    }
    Ok(())
}

async fn run<K>(
    devices: Vec<DeviceConfig>,
    virtual_host: Arc<SimulatedHost>,
    store: Arc<K>,
    event_bus: &InProcessEventBus,
    sun: &EntityId,
) -> Result<(), Box<dyn std::error::Error>>
where
    K: KeyValueStore + 'static,
{
    let host = Host {
        states: Arc::clone(&virtual_host),
        control: Arc::clone(&virtual_host),
        store,
        themes: virtual_host,
    };
    let runtime = AutomationRuntime::start(devices, &host, event_bus, sun).await;

    tracing::info!("castkeeperd running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    runtime.shutdown().await;
    Ok(())
}
