//! Outbound race events.
//!
//! The [`RaceService`](super::service::RaceService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::race::RaceState;
use crate::race::history::RaceRecord;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum RaceEvent {
    /// The race lifecycle moved between states.
    StateChanged { from: RaceState, to: RaceState },

    /// A different dog is now running.
    DogChanged { from: u8, to: u8 },

    /// A dog's fault flag was raised or cleared.
    FaultChanged { dog: u8, faulted: bool },

    /// The last dog came home with faults; reruns begin.
    RerunStarted,

    /// A race was stopped and written to history.
    RaceArchived(RaceRecord),
}
