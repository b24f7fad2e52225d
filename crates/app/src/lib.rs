//! # castkeeper-app
//!
//! Application layer — **port definitions** (traits) and the per-device
//! recast automation.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `StateReader` — current entity snapshots
//!   - `DeviceControl` — volume, power and URL casting commands
//!   - `KeyValueStore` — small values that survive restarts
//!   - `ThemeSetter` — frontend theme selection
//!   - `EventPublisher` — state-change notifications
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//! - Run one `DeviceAutomation` per device: hold triggers, availability and
//!   volume tracking, and the single-flight `RecastController`
//! - Follow the sun with a `ThemeSwitcher`
//!
//! ## Dependency rule
//! Depends on `castkeeper-domain` only (plus `tokio` and `tokio-util` for
//! tasks, channels and cancellation). Never imports adapter crates.
//! Adapters depend on *this* crate, not the reverse.

pub mod automation_engine;
pub mod device_memory;
pub mod event_bus;
pub mod hold;
pub mod ports;
pub mod recast;
pub mod runtime;
pub mod theme_switcher;

#[cfg(test)]
mod testing;
