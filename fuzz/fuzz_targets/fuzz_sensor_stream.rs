//! Fuzz target: `RaceHandler::process`
//!
//! Decodes the input as a stream of beam edges and lifecycle commands
//! and drives them through the race engine.  Asserts that the engine
//! never panics, keeps the active dog in range, and never reports a
//! race time while idle.
//!
//! cargo fuzz run fuzz_sensor_stream

#![no_main]

use std::cell::Cell;

use flyball_ets::app::ports::Clock;
use flyball_ets::config::RaceConfig;
use flyball_ets::events::{Level, Sensor, TriggerQueue};
use flyball_ets::race::dogs::{Attempt, DOG_COUNT};
use flyball_ets::race::{RaceHandler, RaceState};
use libfuzzer_sys::fuzz_target;

struct FuzzClock(Cell<u64>);

impl Clock for FuzzClock {
    fn now_us(&self) -> u64 {
        self.0.get()
    }
}

fuzz_target!(|data: &[u8]| {
    let queue = TriggerQueue::new();
    let clock = FuzzClock(Cell::new(1_000_000));
    let mut race = RaceHandler::new(&queue, &clock, RaceConfig::default());
    race.start();
    race.start_timers();

    // Two bytes per step: op + time gap.
    for chunk in data.chunks_exact(2) {
        let (op, gap) = (chunk[0], chunk[1]);
        let now = clock.0.get() + u64::from(gap) * 20_000;
        clock.0.set(now);

        match op & 0x07 {
            0..=3 => {
                let sensor = if op & 0x01 == 0 { Sensor::Handler } else { Sensor::Box };
                let level = if op & 0x02 == 0 { Level::Low } else { Level::High };
                race.trigger_sensor(sensor, level, now);
            }
            4 => race.process(),
            5 => race.stop(None),
            6 => race.reset(),
            _ => {
                race.start();
                race.start_timers();
            }
        }

        assert!(usize::from(race.current_dog()) < DOG_COUNT);
        if race.state() == RaceState::Stop && !race.is_finished() {
            assert_eq!(race.race_time_us(), 0);
        }
    }

    race.process();
    for dog in 0..DOG_COUNT as u8 {
        let _ = race.dog_time_us(dog, Attempt::Rotating);
        let _ = race.crossing_offset_us(dog, Attempt::Latest);
    }
});
