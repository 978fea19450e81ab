//! Mock hardware for integration tests.
//!
//! A settable clock, recording light pins, and a recording event sink,
//! plus helpers to play beam edges into the trigger queue the way the
//! gate ISRs would.

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use flyball_ets::app::events::RaceEvent;
use flyball_ets::app::ports::{Clock, EventSink};
use flyball_ets::app::service::RaceService;
use flyball_ets::config::RaceConfig;
use flyball_ets::drivers::lights::{LIGHT_COUNT, LightsSequencer};
use flyball_ets::events::{Level, Sensor, TriggerQueue};

/// Gap between consecutive edges of one gate pass.
pub const EDGE_GAP_US: u64 = 10_000;

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    now_us: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new(now_us: u64) -> Self {
        Self {
            now_us: Cell::new(now_us),
        }
    }

    pub fn set_us(&self, now_us: u64) {
        self.now_us.set(now_us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_us.set(self.now_us.get() + ms * 1000);
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockPin {
    pub high: Rc<Cell<bool>>,
}

impl ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

/// A light sequencer over mock pins, plus handles to read the pin levels.
pub fn mock_lights(stage_ms: u64) -> (LightsSequencer<MockPin>, [MockPin; LIGHT_COUNT]) {
    let pins: [MockPin; LIGHT_COUNT] = Default::default();
    (LightsSequencer::new(pins.clone(), stage_ms), pins)
}

#[allow(dead_code)]
pub fn light_levels(pins: &[MockPin; LIGHT_COUNT]) -> [bool; LIGHT_COUNT] {
    core::array::from_fn(|i| pins[i].high.get())
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<RaceEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&RaceEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &RaceEvent) {
        self.events.push(event.clone());
    }
}

// ── Gate playback ─────────────────────────────────────────────

/// Queue one gate pass written as a transition string (`A`/`a` handler
/// beam high/low, `B`/`b` box beam high/low), one edge every
/// [`EDGE_GAP_US`] starting at `at_us`.  Returns the time of the last edge.
pub fn play(queue: &TriggerQueue, pattern: &str, at_us: u64) -> u64 {
    let mut t = at_us;
    for (i, c) in pattern.chars().enumerate() {
        t = at_us + i as u64 * EDGE_GAP_US;
        let (sensor, level) = match c {
            'A' => (Sensor::Handler, Level::High),
            'a' => (Sensor::Handler, Level::Low),
            'B' => (Sensor::Box, Level::High),
            'b' => (Sensor::Box, Level::Low),
            other => panic!("bad edge symbol {other:?}"),
        };
        queue.trigger_sensor(sensor, level, t);
    }
    t
}

/// Play a gate pass, move the clock past it, and run one service pass.
#[allow(dead_code)]
pub fn pass<C: Clock>(
    svc: &mut RaceService<'_, C>,
    clock: &MockClock,
    queue: &TriggerQueue,
    lights: &mut LightsSequencer<MockPin>,
    sink: &mut RecordingSink,
    pattern: &str,
    at_us: u64,
) {
    let last = play(queue, pattern, at_us);
    clock.set_us(last + 1);
    let mut fields = flyball_ets::drivers::display::DisplayController::new(500);
    svc.tick(lights, &mut fields, sink);
}

#[allow(dead_code)]
pub fn default_config() -> RaceConfig {
    RaceConfig::default()
}
