//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the host
//! runtime. They are defined here (in `app`) so that both the engine and
//! the adapter layer can depend on them without creating circular
//! dependencies.

pub mod device_control;
pub mod event_bus;
pub mod key_value_store;
pub mod state_reader;
pub mod theme_setter;

pub use device_control::DeviceControl;
pub use event_bus::EventPublisher;
pub use key_value_store::KeyValueStore;
pub use state_reader::StateReader;
pub use theme_setter::ThemeSetter;
