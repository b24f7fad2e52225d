//! Virtual device behaviours: media player, boolean switch, sun.
//!
//! Each module exposes pure functions that take the current
//! [`EntitySnapshot`] and return the next one, so the host can apply them
//! under its lock and publish the resulting event afterwards.
//!
//! [`EntitySnapshot`]: castkeeper_domain::entity::EntitySnapshot

pub mod media_player;
pub mod sun;
pub mod switch;
