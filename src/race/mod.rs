//! Race timing engine.
//!
//! [`RaceHandler`] owns everything that happens between the start command
//! and the archived result: the lifecycle state, the transition
//! recognizer, the per-dog timing tables and the rerun logic.  It is fed
//! by the interrupt-side [`TriggerQueue`] and drained once per main-loop
//! pass via [`RaceHandler::process`].
//!
//! ```text
//!            start()                 start_timers()
//!   STOP ──────────────▶ STARTING ──────────────────▶ RACING
//!    ▲  (idle)                │                          │
//!    │                        │ stop()                   │ stop() / auto-stop
//!    │ reset()                ▼                          ▼
//!    └──────────────────── STOP (finished, archived) ◀───┘
//! ```
//!
//! Per trigger record:
//!
//! 1. expire a stale transition string,
//! 2. on a rising edge with the gates clear, run the handler-side or
//!    box-side rules of [`DogTable`] (box side may finalize a run and
//!    hand over to [`FaultOrchestrator`]),
//! 3. append the edge to the transition string and apply any verdict.

pub mod dogs;
pub mod history;
pub mod rerun;
pub mod transition;

use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::Clock;
use crate::config::RaceConfig;
use crate::events::{Level, Sensor, SensorTriggerRecord, TriggerQueue};

use dogs::{Attempt, DOG_COUNT, Direction, DogTable};
use history::{DogRecord, RaceHistory, RaceRecord};
use rerun::{FaultOrchestrator, FinalizeOutcome};
use transition::{Crossing, Symbol, TransitionRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceState {
    /// Start lights running; timer zero-point lies in the future.
    Starting,
    Racing,
    /// Idle before a race, or finished after one.
    Stop,
}

pub struct RaceHandler<'q, C: Clock> {
    queue: &'q TriggerQueue,
    clock: C,
    config: RaceConfig,
    state: RaceState,
    race_id: u32,
    start_us: u64,
    end_us: u64,
    elapsed_us: u64,
    /// Set once the current race id has been written to history.
    archived: bool,
    dogs: DogTable,
    transitions: TransitionRecognizer,
    faults: FaultOrchestrator,
    history: RaceHistory,
}

impl<'q, C: Clock> RaceHandler<'q, C> {
    pub fn new(queue: &'q TriggerQueue, clock: C, config: RaceConfig) -> Self {
        queue.set_armed(false);
        let transitions = TransitionRecognizer::new(config.transition_stale_us);
        Self {
            queue,
            clock,
            config,
            state: RaceState::Stop,
            race_id: 0,
            start_us: 0,
            end_us: 0,
            elapsed_us: 0,
            archived: false,
            dogs: DogTable::new(),
            transitions,
            faults: FaultOrchestrator::new(),
            history: RaceHistory::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    // ── Interrupt side ────────────────────────────────────────

    /// Record a beam edge.  No-op while the race is stopped.
    pub fn trigger_sensor(&self, sensor: Sensor, level: Level, timestamp_us: u64) -> bool {
        self.queue.trigger_sensor(sensor, level, timestamp_us)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// STOP (idle) → STARTING.  Arms the timer zero-point one lead-in
    /// from now.  Ignored in any other state, including a finished race
    /// that has not been reset.
    pub fn start(&mut self) {
        if self.state != RaceState::Stop || self.archived {
            debug!("start() ignored in {:?} (archived={})", self.state, self.archived);
            return;
        }

        let now = self.clock.now_us();
        self.start_us = now + self.config.lead_in_us;
        self.end_us = 0;
        self.elapsed_us = 0;
        self.dogs.arm(self.start_us);
        self.transitions.reset();
        self.faults.reset();
        self.queue.clear();

        self.state = RaceState::Starting;
        self.queue.set_armed(true);
        info!("Race {} starting, zero-point at {} us", self.race_id, self.start_us);
    }

    /// STARTING → RACING, called when the green light comes on.
    pub fn start_timers(&mut self) {
        if self.state != RaceState::Starting {
            debug!("start_timers() ignored in {:?}", self.state);
            return;
        }
        self.state = RaceState::Racing;
        info!("Race {} running", self.race_id);
    }

    /// Stop the race at `at_us` (or now) and archive it.  A second call
    /// on a stopped race changes nothing.
    pub fn stop(&mut self, at_us: Option<u64>) {
        if self.state == RaceState::Stop {
            debug!("stop() ignored, race already stopped");
            return;
        }

        self.queue.set_armed(false);
        self.end_us = at_us.unwrap_or_else(|| self.clock.now_us());
        self.elapsed_us = self.end_us.saturating_sub(self.start_us);
        self.state = RaceState::Stop;

        let record = self.snapshot();
        self.history.push(record);
        self.archived = true;
        info!(
            "Race {} stopped: {} ms, fault={}, overruns={}",
            self.race_id,
            self.elapsed_us / 1000,
            self.dogs.any_fault(),
            self.queue.overruns()
        );
    }

    /// Clear all race data; only allowed while stopped.
    pub fn reset(&mut self) {
        if self.state != RaceState::Stop {
            debug!("reset() ignored in {:?}", self.state);
            return;
        }

        self.queue.set_armed(false);
        self.queue.clear();
        if self.archived {
            self.race_id += 1;
            self.archived = false;
        }
        self.start_us = 0;
        self.end_us = 0;
        self.elapsed_us = 0;
        self.dogs.reset();
        self.transitions.reset();
        self.faults.reset();
        debug!("Race reset, next id {}", self.race_id);
    }

    // ── Processing pass ───────────────────────────────────────

    /// Drain the trigger queue and advance every state machine.
    pub fn process(&mut self) {
        if self.state == RaceState::Stop {
            return;
        }

        while let Some(record) = self.queue.pop() {
            self.handle_trigger(record);
            if self.state == RaceState::Stop {
                return;
            }
        }

        self.transitions.expire_stale(self.clock.now_us());
    }

    fn handle_trigger(&mut self, record: SensorTriggerRecord) {
        let at = record.timestamp_us;
        self.transitions.expire_stale(at);

        if record.level == Level::High && self.transitions.gates_clear() {
            match record.sensor {
                Sensor::Handler => {
                    let next = self.faults.next_dog(&self.dogs);
                    self.dogs.on_handler_high(at, next, self.faults.rerun_busy());
                }
                Sensor::Box => {
                    if self.dogs.on_box_high(at, self.config.bounce_window_us) {
                        self.after_finalize(at);
                    }
                }
            }
        }

        if self.state == RaceState::Stop {
            return;
        }

        if let Some(crossing) = self.transitions.push(Symbol::from_edge(record.sensor, record.level), at) {
            self.apply_crossing(crossing);
        }
    }

    fn after_finalize(&mut self, at: u64) {
        match self.faults.after_finalize(&mut self.dogs, at) {
            FinalizeOutcome::Stop => self.stop(Some(at)),
            FinalizeOutcome::Rerun { dog } | FinalizeOutcome::Handoff { dog } => {
                debug!("Dog {} seeded at {}", dog, at);
            }
        }
    }

    fn apply_crossing(&mut self, crossing: Crossing) {
        match crossing {
            Crossing::Outbound => self.dogs.set_direction(Direction::ComingBack),
            Crossing::Inbound => {
                self.dogs.set_direction(Direction::GoingIn);
                match self.faults.next_dog(&self.dogs) {
                    Some(next) => self.dogs.change_dog(next),
                    None => debug!("Inbound crossing with no dog left to run"),
                }
            }
            Crossing::SpatBall => {
                let dog = self.dogs.current();
                warn!("Dog {} crossed without the ball", dog);
                self.dogs.set_fault(dog, true);
            }
            Crossing::Simultaneous => match self.faults.next_dog(&self.dogs) {
                Some(next) => {
                    self.dogs.change_dog(next);
                    self.dogs.set_direction(Direction::ComingBack);
                    self.dogs.seed_from_previous();
                }
                None => debug!("Simultaneous crossing with no dog left to run"),
            },
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn race_id(&self) -> u32 {
        self.race_id
    }

    /// True for a stopped race that still holds results.
    pub fn is_finished(&self) -> bool {
        self.state == RaceState::Stop && self.archived
    }

    pub fn current_dog(&self) -> u8 {
        self.dogs.current()
    }

    pub fn previous_dog(&self) -> Option<u8> {
        self.dogs.previous()
    }

    pub fn direction(&self) -> Direction {
        self.dogs.direction()
    }

    pub fn rerun_busy(&self) -> bool {
        self.faults.rerun_busy()
    }

    /// OR of every dog's fault flag.
    pub fn has_fault(&self) -> bool {
        self.dogs.any_fault()
    }

    pub fn dog_fault(&self, dog: u8) -> bool {
        self.dogs.fault(dog)
    }

    pub fn run_count(&self, dog: u8) -> u8 {
        self.dogs.run_count(dog)
    }

    pub fn queue_overruns(&self) -> u32 {
        self.queue.overruns()
    }

    /// Pending transition symbols, for diagnostics.
    pub fn transition_text(&self) -> heapless::String<{ transition::TRANSITION_CAPACITY }> {
        self.transitions.as_text()
    }

    /// Team time: zero while starting, live while racing, frozen once stopped.
    pub fn race_time_us(&self) -> u64 {
        match self.state {
            RaceState::Starting => 0,
            RaceState::Racing => self.clock.now_us().saturating_sub(self.start_us),
            RaceState::Stop => self.elapsed_us,
        }
    }

    pub fn race_time_ms(&self) -> u64 {
        self.race_time_us() / 1000
    }

    /// Running time of `dog` in the selected attempt, excluding a late
    /// start.  Never negative; frozen once the attempt has an exit time.
    pub fn dog_time_us(&self, dog: u8, attempt: Attempt) -> u64 {
        let slot = self.resolve_attempt(dog, attempt);
        let timing = self.dogs.timing(dog, slot);
        let Some(enter) = timing.enter_us else {
            return 0;
        };

        let end = match timing.exit_us {
            Some(exit) => exit,
            None if self.is_live(dog, slot) => match self.state {
                RaceState::Stop => self.end_us,
                _ => self.clock.now_us(),
            },
            None => return 0,
        };

        let late_start = timing.crossing_offset_us.max(0) as u64;
        end.saturating_sub(enter).saturating_sub(late_start)
    }

    pub fn dog_time_ms(&self, dog: u8, attempt: Attempt) -> u64 {
        self.dog_time_us(dog, attempt) / 1000
    }

    pub fn crossing_offset_us(&self, dog: u8, attempt: Attempt) -> i64 {
        let slot = self.resolve_attempt(dog, attempt);
        self.dogs.timing(dog, slot).crossing_offset_us
    }

    /// Truncated toward zero.
    pub fn crossing_offset_ms(&self, dog: u8, attempt: Attempt) -> i64 {
        self.crossing_offset_us(dog, attempt) / 1000
    }

    pub fn total_crossing_us(&self) -> i64 {
        self.dogs.total_crossing_us()
    }

    /// Sum of all crossing offsets, truncated to whole milliseconds.
    pub fn total_crossing_ms(&self) -> i64 {
        self.total_crossing_us() / 1000
    }

    /// Live view of the current race.
    pub fn snapshot(&self) -> RaceRecord {
        let dogs = core::array::from_fn(|d| {
            let dog = d as u8;
            DogRecord {
                attempts: *self.dogs.attempts(dog),
                run_count: self.dogs.run_count(dog),
                fault: self.dogs.fault(dog),
            }
        });

        RaceRecord {
            id: self.race_id,
            start_us: self.start_us,
            end_us: self.end_us,
            elapsed_us: self.race_time_us(),
            state: self.state,
            dogs,
            total_crossing_us: self.dogs.total_crossing_us(),
        }
    }

    /// Record of race `id`: live for the race in progress, archived otherwise.
    pub fn race_record(&self, id: u32) -> Option<RaceRecord> {
        if id == self.race_id && !self.archived {
            return Some(self.snapshot());
        }
        self.history.get(id).copied()
    }

    pub fn history(&self) -> &RaceHistory {
        &self.history
    }

    // ── Internal ──────────────────────────────────────────────

    fn resolve_attempt(&self, dog: u8, attempt: Attempt) -> usize {
        let runs = self.dogs.run_count(dog);
        let slot = match attempt {
            Attempt::Index(i) => i.min(runs),
            Attempt::Latest => runs,
            Attempt::Rotating => {
                let period = self.config.attempt_rotation_ms.max(1);
                ((self.clock.now_ms() / period) % (u64::from(runs) + 1)) as u8
            }
        };
        usize::from(slot)
    }

    /// The attempt currently being run, still without an exit time.
    fn is_live(&self, dog: u8, slot: usize) -> bool {
        dog == self.dogs.current() && slot == usize::from(self.dogs.run_count(dog))
    }
}
