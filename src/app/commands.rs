//! Inbound commands to the application service.
//!
//! These represent operator actions (start/stop button, serial console)
//! that the [`RaceService`](super::service::RaceService) applies to the race.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceCommand {
    /// Single-button toggle: start when idle, reset when finished,
    /// stop otherwise.
    StartStop,

    /// Begin the start sequence (idle races only).
    Start,

    /// Stop the running race now.
    Stop,

    /// Clear a stopped race.
    Reset,
}
