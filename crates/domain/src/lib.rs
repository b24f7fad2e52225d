//! # castkeeper-domain
//!
//! Pure domain model for the castkeeper cast automation system.
//!
//! ## Responsibilities
//! - Foundational types: entity identifiers, error conventions, timestamps
//! - Define **entity snapshots** (state + attributes reported by the host)
//! - Define **state-change events** delivered by the host
//! - Resolve **device configuration** from defaults, global settings and
//!   per-device overrides
//! - Answer the pure questions of the recast logic (`should_cast`,
//!   `is_casting`) and pick themes from the sun position
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod config;
pub mod entity;
pub mod event;
pub mod predicate;
pub mod theme;
