//! Application service: the hexagonal core.
//!
//! [`RaceService`] owns the [`RaceHandler`] and runs one orchestration
//! pass per main-loop iteration.  All I/O flows through port traits
//! injected at call sites, making the whole service testable with mock
//! adapters.
//!
//! ```text
//!  StartLightsPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                      │      RaceService       │
//!  TriggerQueue ─────▶ │  RaceHandler · render  │ ──▶ FieldSink
//!                      └────────────────────────┘
//! ```

use core::fmt::Write;

use log::{info, warn};

use crate::config::RaceConfig;
use crate::events::TriggerQueue;
use crate::race::dogs::{Attempt, DOG_COUNT, Direction};
use crate::race::{RaceHandler, RaceState};

use super::commands::RaceCommand;
use super::events::RaceEvent;
use super::ports::{Clock, EventSink, FieldId, FieldSink, LightsSignal, StartLightsPort};

/// Formatted text for one display field.
pub type FieldText = heapless::String<16>;

/// Engine state as last reported to the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observed {
    state: RaceState,
    dog: u8,
    faults: [bool; DOG_COUNT],
    rerun_busy: bool,
}

impl Observed {
    fn of<C: Clock>(race: &RaceHandler<'_, C>) -> Self {
        Self {
            state: race.state(),
            dog: race.current_dog(),
            faults: core::array::from_fn(|d| race.dog_fault(d as u8)),
            rerun_busy: race.rerun_busy(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// RaceService
// ───────────────────────────────────────────────────────────────

pub struct RaceService<'q, C: Clock> {
    race: RaceHandler<'q, C>,
    seen: Observed,
    seen_overruns: u32,
    last_render_ms: Option<u64>,
}

impl<'q, C: Clock> RaceService<'q, C> {
    pub fn new(queue: &'q TriggerQueue, clock: C, config: RaceConfig) -> Self {
        let race = RaceHandler::new(queue, clock, config);
        let seen = Observed::of(&race);
        let seen_overruns = race.queue_overruns();
        Self {
            race,
            seen,
            seen_overruns,
            last_render_ms: None,
        }
    }

    pub fn race(&self) -> &RaceHandler<'q, C> {
        &self.race
    }

    pub fn now_ms(&self) -> u64 {
        self.race.clock().now_ms()
    }

    // ── Per-loop orchestration ────────────────────────────────

    /// One main-loop pass: lights → engine → events → display fields.
    pub fn tick(
        &mut self,
        lights: &mut impl StartLightsPort,
        fields: &mut impl FieldSink,
        sink: &mut impl EventSink,
    ) {
        let now_ms = self.now_ms();

        if lights.poll(now_ms) == Some(LightsSignal::FinalStage) {
            self.race.start_timers();
        }

        self.race.process();
        self.publish_changes(lights, sink);

        let overruns = self.race.queue_overruns();
        if overruns != self.seen_overruns {
            warn!("Trigger queue overrun, edges lost ({} laps total)", overruns);
            self.seen_overruns = overruns;
        }

        let due = self
            .last_render_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.race.config().display_refresh_ms);
        if due {
            self.render_fields(fields);
            self.last_render_ms = Some(now_ms);
        }
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: RaceCommand,
        lights: &mut impl StartLightsPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            RaceCommand::StartStop => match self.race.state() {
                RaceState::Stop if self.race.is_finished() => self.race.reset(),
                RaceState::Stop => self.race.start(),
                RaceState::Starting | RaceState::Racing => self.race.stop(None),
            },
            RaceCommand::Start => self.race.start(),
            RaceCommand::Stop => self.race.stop(None),
            RaceCommand::Reset => self.race.reset(),
        }
        self.publish_changes(lights, sink);
        // Show the effect of a command on the next pass.
        self.last_render_ms = None;
    }

    // ── Display fields ────────────────────────────────────────

    /// Push the text of every field.  Rejected values are logged and skipped.
    pub fn render_fields(&self, fields: &mut impl FieldSink) {
        let race = &self.race;

        for dog in 0..DOG_COUNT as u8 {
            let time = seconds(race.dog_time_ms(dog, Attempt::Rotating) as i64, 7);
            put(fields, FieldId::DogTime(dog), &time);

            let cross = crossing(race.crossing_offset_ms(dog, Attempt::Rotating));
            put(fields, FieldId::CrossTime(dog), &cross);

            let mut rerun = FieldText::new();
            if race.dog_fault(dog) {
                let _ = rerun.push_str("F ");
            } else if race.run_count(dog) > 0 {
                let _ = write!(rerun, "*{}", race.run_count(dog));
            } else {
                let _ = rerun.push_str("  ");
            }
            put(fields, FieldId::RerunInfo(dog), &rerun);
        }

        let state = match race.state() {
            RaceState::Stop => " STOP",
            RaceState::Starting => " START",
            RaceState::Racing => "RACING",
        };
        put(fields, FieldId::RaceState, state);
        put(fields, FieldId::TeamTime, &seconds(race.race_time_ms() as i64, 7));
        put(fields, FieldId::TotalCrossTime, &seconds(race.total_crossing_ms(), 7));

        let arrow = match race.direction() {
            Direction::GoingIn => "-->",
            Direction::ComingBack => "<--",
        };
        put(fields, FieldId::BoxDirection, arrow);
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish_changes(&mut self, lights: &mut impl StartLightsPort, sink: &mut impl EventSink) {
        let now = Observed::of(&self.race);
        let prev = self.seen;
        if now == prev {
            return;
        }

        if now.state != prev.state {
            info!("Race state {:?} -> {:?}", prev.state, now.state);
            sink.emit(&RaceEvent::StateChanged {
                from: prev.state,
                to: now.state,
            });
            lights.on_race_state(now.state, self.now_ms());

            if now.state == RaceState::Stop && self.race.is_finished() {
                if let Some(record) = self.race.history().latest() {
                    sink.emit(&RaceEvent::RaceArchived(*record));
                }
            }
        }

        if now.dog != prev.dog {
            sink.emit(&RaceEvent::DogChanged {
                from: prev.dog,
                to: now.dog,
            });
        }

        for (dog, (&was, &is)) in (0u8..).zip(prev.faults.iter().zip(now.faults.iter())) {
            if was != is {
                sink.emit(&RaceEvent::FaultChanged { dog, faulted: is });
            }
        }

        if now.rerun_busy && !prev.rerun_busy {
            sink.emit(&RaceEvent::RerunStarted);
        }

        self.seen = now;
    }
}

fn put(fields: &mut impl FieldSink, field: FieldId, text: &str) {
    if let Err(e) = fields.update_field(field, text) {
        warn!("Display field {:?} rejected '{}': {}", field, text, e);
    }
}

/// Largest time a 7-wide seconds field can hold (`999.999`).
const MAX_SHOWN_MS: u64 = 999_999;

/// Milliseconds as right-aligned seconds with three decimals, e.g. `"  4.123"`.
/// Out-of-range values saturate at `999.999` (`-99.999` when negative).
pub fn seconds(ms: i64, width: usize) -> FieldText {
    let mut digits = FieldText::new();
    let sign = if ms < 0 { "-" } else { "" };
    let limit = if ms < 0 { MAX_SHOWN_MS / 10 } else { MAX_SHOWN_MS };
    let abs = ms.unsigned_abs().min(limit);
    let _ = write!(digits, "{}{}.{:03}", sign, abs / 1000, abs % 1000);

    let mut out = FieldText::new();
    let _ = write!(out, "{:>width$}", digits.as_str(), width = width);
    out
}

/// Signed crossing offset, e.g. `"+  0.120"` or `"-  0.045"`.
pub fn crossing(ms: i64) -> FieldText {
    let mut out = FieldText::new();
    let sign = if ms < 0 { '-' } else { '+' };
    let abs = i64::try_from(ms.unsigned_abs()).unwrap_or(i64::MAX);
    let _ = write!(out, "{}{}", sign, seconds(abs, 7).as_str());
    out
}
