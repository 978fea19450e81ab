//! Flyball ETS firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod race;

// Peripheral-facing modules; the device implementations are cfg-gated
// inside, the host builds get simulation stubs.
pub mod adapters;
pub mod drivers;
