//! End-to-end tests for the full castkeeperd stack.
//!
//! Each test wires the simulated host, a key/value store, the event bus and
//! the automation runtime exactly like the daemon does, then drives the
//! simulated entities and checks what the devices end up showing.

use std::sync::Arc;
use std::time::Duration;

use castkeeper_adapter_storage_sqlite_sqlx::{Config, SqliteKeyValueStore};
use castkeeper_adapter_virtual::devices::media_player;
use castkeeper_adapter_virtual::{MemoryKeyValueStore, VirtualHost};
use castkeeper_app::event_bus::InProcessEventBus;
use castkeeper_app::ports::{KeyValueStore, StateReader};
use castkeeper_app::runtime::{AutomationRuntime, Host};
use castkeeper_domain::config::{DeviceConfig, DeviceSettings};
use castkeeper_domain::entity::{APP_NAME, EntityState, VOLUME_LEVEL};
use castkeeper_domain::id::EntityId;
use castkeeper_domain::predicate::CAST_APP_NAME;
use castkeeper_domain::theme::{DEFAULT_SUN_ENTITY, ThemeMode};
use castkeeper_domain::time::now;

const DISPLAY: &str = "media_player.kitchen_display";
const GATE: &str = "input_boolean.kiosk";
const URL: &str = "http://hass.local:8123/lovelace/kiosk";

type Simulated = VirtualHost<InProcessEventBus>;

fn id(value: &str) -> EntityId {
    value.parse().unwrap()
}

fn settings() -> DeviceSettings {
    DeviceSettings {
        dashboard_url: Some(URL.to_string()),
        ..DeviceSettings::default()
    }
}

fn device(settings: &DeviceSettings) -> DeviceConfig {
    DeviceConfig::resolve(DISPLAY, settings).unwrap()
}

fn simulated(bus: &InProcessEventBus) -> Arc<Simulated> {
    let host = Arc::new(VirtualHost::new(bus.clone()));
    host.add_sun(id(DEFAULT_SUN_ENTITY), false);
    host.add_media_player(id(DISPLAY));
    host
}

async fn start<K: KeyValueStore + 'static>(
    configs: Vec<DeviceConfig>,
    virtual_host: &Arc<Simulated>,
    store: &Arc<K>,
    bus: &InProcessEventBus,
) -> AutomationRuntime<Simulated, Simulated, K> {
    let host = Host {
        states: Arc::clone(virtual_host),
        control: Arc::clone(virtual_host),
        store: Arc::clone(store),
        themes: Arc::clone(virtual_host),
    };
    let runtime = AutomationRuntime::start(configs, &host, bus, &id(DEFAULT_SUN_ENTITY)).await;
    settle().await;
    runtime
}

async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    settle().await;
}

fn casting(host: &Simulated) -> bool {
    host.snapshot(&id(DISPLAY))
        .is_some_and(|snapshot| snapshot.app_name() == Some(CAST_APP_NAME))
}

// ---------------------------------------------------------------------------
// Recast cycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_recast_display_left_off_and_restore_its_volume() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    let store = Arc::new(MemoryKeyValueStore::new());
    let runtime = start(vec![device(&settings())], &host, &store, &bus).await;

    advance(9).await;
    assert!(!casting(&host));

    advance(2).await;
    let snapshot = host.snapshot(&id(DISPLAY)).unwrap();
    assert_eq!(snapshot.state, EntityState::Playing);
    assert_eq!(snapshot.app_name(), Some(CAST_APP_NAME));
    assert_eq!(snapshot.volume_level(), Some(0.0), "muted while the cast settles");

    advance(3).await;
    assert_eq!(host.snapshot(&id(DISPLAY)).unwrap().volume_level(), Some(0.5));
    assert_eq!(
        store.get("castkeeper.kitchen_display_volume_level").await.unwrap().as_deref(),
        Some("0.5")
    );

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_restore_volume_adjusted_while_waiting() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    let store = Arc::new(MemoryKeyValueStore::new());
    let runtime = start(vec![device(&settings())], &host, &store, &bus).await;

    advance(5).await;
    host.set_attribute(&id(DISPLAY), VOLUME_LEVEL, 0.3).await.unwrap();
    settle().await;
    assert_eq!(
        store.get("castkeeper.kitchen_display_volume_level").await.unwrap().as_deref(),
        Some("0.3")
    );

    // Volume changes do not reset the off hold.
    advance(6).await;
    assert!(casting(&host));
    assert_eq!(host.snapshot(&id(DISPLAY)).unwrap().volume_level(), Some(0.0));

    advance(3).await;
    assert_eq!(host.snapshot(&id(DISPLAY)).unwrap().volume_level(), Some(0.3));

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_wait_for_boot_delay_after_reboot() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    host.set_state(&id(DISPLAY), EntityState::Playing).await.unwrap();
    let store = Arc::new(MemoryKeyValueStore::new());
    let runtime = start(vec![device(&settings())], &host, &store, &bus).await;

    host.set_state(&id(DISPLAY), EntityState::Unavailable).await.unwrap();
    advance(5).await;
    host.set_state(&id(DISPLAY), EntityState::Off).await.unwrap();
    settle().await;

    // Hold elapses at 15s, then the 20s boot delay runs.
    advance(29).await;
    assert!(!casting(&host));
    assert_eq!(
        store.get("castkeeper.kitchen_display_availability").await.unwrap().as_deref(),
        Some("1"),
        "flag is consumed when the boot delay starts"
    );

    advance(2).await;
    assert!(casting(&host));

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_power_off_stale_session_then_recast() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    let mut stale = media_player::initial(id(DISPLAY)).with_attribute(APP_NAME, CAST_APP_NAME);
    stale.update_state(EntityState::Idle, now());
    host.insert(stale);
    let store = Arc::new(MemoryKeyValueStore::new());

    let runtime = start(vec![device(&settings())], &host, &store, &bus).await;
    assert_eq!(host.state(&id(DISPLAY)), Some(EntityState::Off));
    assert!(!casting(&host));

    advance(11).await;
    assert!(casting(&host));

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_respect_enable_switch() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    host.add_switch(id(GATE), false);
    let store = Arc::new(MemoryKeyValueStore::new());
    let gated = DeviceSettings {
        enable_switch: Some(GATE.to_string()),
        ..settings()
    };
    let runtime = start(vec![device(&gated)], &host, &store, &bus).await;

    advance(60).await;
    assert!(!casting(&host));

    // Turning the switch on does not recast by itself; the next hold does.
    host.set_state(&id(GATE), EntityState::On).await.unwrap();
    host.set_state(&id(DISPLAY), EntityState::Playing).await.unwrap();
    host.set_state(&id(DISPLAY), EntityState::Off).await.unwrap();
    settle().await;
    advance(11).await;
    assert!(casting(&host));

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_stop_everything_on_shutdown() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    let store = Arc::new(MemoryKeyValueStore::new());
    let runtime = start(vec![device(&settings())], &host, &store, &bus).await;

    advance(5).await;
    runtime.shutdown().await;
    advance(60).await;

    assert_eq!(host.state(&id(DISPLAY)), Some(EntityState::Off));
}

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_switch_theme_with_the_sun() {
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    let store = Arc::new(MemoryKeyValueStore::new());
    let themed = DeviceSettings {
        light_theme: Some("Day".to_string()),
        dark_theme: Some("Night".to_string()),
        ..settings()
    };
    let runtime = start(vec![device(&themed)], &host, &store, &bus).await;
    assert_eq!(host.theme(ThemeMode::Light).as_deref(), Some("Night"));
    assert_eq!(host.theme(ThemeMode::Dark).as_deref(), Some("Night"));

    host.set_state(&id(DEFAULT_SUN_ENTITY), EntityState::from("above_horizon"))
        .await
        .unwrap();
    settle().await;

    assert_eq!(host.theme(ThemeMode::Light).as_deref(), Some("Day"));
    assert_eq!(host.theme(ThemeMode::Dark).as_deref(), Some("Day"));
    runtime.shutdown().await;
}

// ---------------------------------------------------------------------------
// SQLite-backed device memory
// ---------------------------------------------------------------------------

async fn eventually(what: &str, mut check: impl AsyncFnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn should_keep_unavailability_across_engine_restart() {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .unwrap();
    let store = Arc::new(SqliteKeyValueStore::new(db.pool().clone()));
    let bus = InProcessEventBus::new(256);
    let host = simulated(&bus);
    host.set_state(&id(DISPLAY), EntityState::Playing).await.unwrap();
    let quick = DeviceSettings {
        off_duration: Some(0),
        boot_delay: Some(0),
        mute_before_recast: Some(false),
        ..settings()
    };

    let first = start(vec![device(&quick)], &host, &store, &bus).await;
    host.set_state(&id(DISPLAY), EntityState::Unavailable).await.unwrap();
    eventually("availability flag", async || {
        store.get("castkeeper.kitchen_display_availability").await.unwrap().as_deref() == Some("0")
    })
    .await;
    first.shutdown().await;

    let second = start(vec![device(&quick)], &host, &store, &bus).await;
    host.set_state(&id(DISPLAY), EntityState::Off).await.unwrap();
    eventually("recast", async || casting(&host)).await;
    assert_eq!(
        store.get("castkeeper.kitchen_display_availability").await.unwrap().as_deref(),
        Some("1")
    );

    second.shutdown().await;
}
