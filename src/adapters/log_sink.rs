//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing race events to the ESP-IDF logger
//! (UART / USB-CDC in production).  Archived races are additionally
//! dumped as one-line JSON so a laptop on the serial port can collect
//! results.

use log::{info, warn};

use crate::app::events::RaceEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`RaceEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &RaceEvent) {
        match event {
            RaceEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            RaceEvent::DogChanged { from, to } => {
                info!("DOG   | {} -> {}", from + 1, to + 1);
            }
            RaceEvent::FaultChanged { dog, faulted: true } => {
                info!("FAULT | dog {} faulted", dog + 1);
            }
            RaceEvent::FaultChanged { dog, faulted: false } => {
                info!("FAULT | dog {} cleared", dog + 1);
            }
            RaceEvent::RerunStarted => {
                info!("RERUN | faulted dogs run again");
            }
            RaceEvent::RaceArchived(record) => {
                info!(
                    "RACE  | #{} finished in {}.{:03}s, crossing {}ms",
                    record.id,
                    record.elapsed_us / 1_000_000,
                    (record.elapsed_us / 1000) % 1000,
                    record.total_crossing_us / 1000,
                );
                match serde_json::to_string(record) {
                    Ok(json) => info!("JSON  | {}", json),
                    Err(e) => warn!("JSON  | race #{} not serialisable: {}", record.id, e),
                }
            }
        }
    }
}
