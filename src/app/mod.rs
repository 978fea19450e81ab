//! Application core: race orchestration, zero I/O.
//!
//! Wires the [`race`](crate::race) engine to its collaborators: start
//! lights, display fields and event sinks.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
