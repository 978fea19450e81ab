//! Port traits: the hexagonal boundary between the race engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RaceService (domain)
//! ```
//!
//! Driven adapters (clock, start lights, display, event sinks) implement
//! these traits.  The [`RaceService`](super::service::RaceService) consumes
//! them via generics, so the engine never touches hardware directly.

use crate::race::RaceState;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time since boot.
///
/// Sensor timestamps captured in ISRs must come from the same time base.
pub trait Clock {
    /// Microseconds since boot.
    fn now_us(&self) -> u64;

    /// Milliseconds since boot.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

// ───────────────────────────────────────────────────────────────
// Start-light port (driven adapter: domain ↔ light sequencer)
// ───────────────────────────────────────────────────────────────

/// Signal raised by the light sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightsSignal {
    /// The green light is on: timing starts now.
    FinalStage,
}

/// A start-light sequencer that follows the race lifecycle.
pub trait StartLightsPort {
    /// Called on every lifecycle transition.
    fn on_race_state(&mut self, state: RaceState, now_ms: u64);

    /// Advance the light schedule.  Returns [`LightsSignal::FinalStage`]
    /// exactly once per start sequence.
    fn poll(&mut self, now_ms: u64) -> Option<LightsSignal>;
}

// ───────────────────────────────────────────────────────────────
// Display ports (driven adapter: domain → text display)
// ───────────────────────────────────────────────────────────────

/// Named fixed-width display fields.  Dog indices are `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    DogTime(u8),
    CrossTime(u8),
    RerunInfo(u8),
    RaceState,
    TeamTime,
    TotalCrossTime,
    BoxDirection,
}

/// Receives pre-formatted field text.
pub trait FieldSink {
    fn update_field(&mut self, field: FieldId, text: &str) -> crate::error::Result<()>;
}

/// Exposes the text currently held for a field.
pub trait FieldView {
    fn field_text(&self, field: FieldId) -> Option<&str>;
}

/// A line-oriented text surface (character LCD, serial console, ...).
pub trait DisplaySurface {
    fn write_line(&mut self, line: u8, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`RaceEvent`](super::events::RaceEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::RaceEvent);
}
