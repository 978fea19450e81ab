//! Dog run state machine.
//!
//! Fixed arena of timing slots indexed by `[dog][attempt]`.  Four dogs
//! and a bounded number of attempts are properties of the sport, so the
//! tables never grow.
//!
//! ```text
//!            handler beam (A)        box beam (B)
//!  handler ───────┃───────────────────────┃──────────▶ box
//!                 ┃   GoingIn  ────────▶  ┃
//!                 ┃   ◀──────  ComingBack ┃
//! ```
//!
//! Only rising edges (beam broken) that arrive while the gates are clear
//! reach this module; everything else is left to the transition
//! recognizer.

use log::{debug, warn};
use serde::Serialize;

pub const DOG_COUNT: usize = 4;
pub const MAX_ATTEMPTS: usize = 4;
/// Index of the anchor dog.
pub const LAST_DOG: u8 = DOG_COUNT as u8 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Active dog is running toward the box.
    GoingIn,
    /// Active dog has the ball and is running home.
    ComingBack,
}

/// Timing of one attempt of one dog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptTiming {
    pub enter_us: Option<u64>,
    pub exit_us: Option<u64>,
    pub elapsed_us: u64,
    /// Entry relative to the perfect-crossing reference; negative is early.
    pub crossing_offset_us: i64,
}

/// Attempt selector for timing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// A specific attempt slot, clamped to the dog's run count.
    Index(u8),
    /// Cycle through the recorded attempts, for display only.
    Rotating,
    /// The dog's most recent attempt.
    Latest,
}

impl From<i8> for Attempt {
    /// `-1` rotates, `-2` selects the latest attempt, anything else
    /// is clamped to a valid slot.
    fn from(raw: i8) -> Self {
        match raw {
            -1 => Self::Rotating,
            -2 => Self::Latest,
            i if i < 0 => Self::Index(0),
            i => Self::Index(i as u8),
        }
    }
}

pub struct DogTable {
    timings: [[AttemptTiming; MAX_ATTEMPTS]; DOG_COUNT],
    run_counter: [u8; DOG_COUNT],
    faults: [bool; DOG_COUNT],
    current: u8,
    previous: Option<u8>,
    direction: Direction,
    perfect_crossing_us: u64,
}

impl Default for DogTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DogTable {
    pub fn new() -> Self {
        Self {
            timings: [[AttemptTiming::default(); MAX_ATTEMPTS]; DOG_COUNT],
            run_counter: [0; DOG_COUNT],
            faults: [false; DOG_COUNT],
            current: 0,
            previous: None,
            direction: Direction::GoingIn,
            perfect_crossing_us: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Prepare for a race whose timer zero-point is `start_us`.
    pub fn arm(&mut self, start_us: u64) {
        self.reset();
        self.perfect_crossing_us = start_us;
        self.timings[0][0].enter_us = Some(start_us);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn current(&self) -> u8 {
        self.current
    }

    pub fn previous(&self) -> Option<u8> {
        self.previous
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn perfect_crossing_us(&self) -> u64 {
        self.perfect_crossing_us
    }

    pub fn fault(&self, dog: u8) -> bool {
        self.faults[check(dog)]
    }

    pub fn any_fault(&self) -> bool {
        self.faults.iter().any(|&f| f)
    }

    /// Lowest-numbered dog with an outstanding fault.
    pub fn first_faulted(&self) -> Option<u8> {
        self.faults.iter().position(|&f| f).map(|d| d as u8)
    }

    pub fn run_count(&self, dog: u8) -> u8 {
        self.run_counter[check(dog)]
    }

    pub fn timing(&self, dog: u8, slot: usize) -> &AttemptTiming {
        &self.timings[check(dog)][slot]
    }

    pub fn attempts(&self, dog: u8) -> &[AttemptTiming; MAX_ATTEMPTS] {
        &self.timings[check(dog)]
    }

    /// Sum of every recorded crossing offset, in microseconds.
    pub fn total_crossing_us(&self) -> i64 {
        self.timings.iter().flatten().map(|t| t.crossing_offset_us).sum()
    }

    // ── Mutators ──────────────────────────────────────────────

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn set_fault(&mut self, dog: u8, fault: bool) {
        let d = check(dog);
        if self.faults[d] != fault {
            debug!("Dog {} fault {}", dog, if fault { "raised" } else { "cleared" });
        }
        self.faults[d] = fault;
    }

    pub fn change_dog(&mut self, dog: u8) {
        check(dog);
        self.previous = Some(self.current);
        self.current = dog;
    }

    /// Seed the active attempt of `dog` with an entry at `at_us`.  A slot
    /// that already holds a finished run moves the dog to a fresh attempt.
    pub fn begin_attempt(&mut self, dog: u8, at_us: u64) {
        let d = check(dog);
        if self.active_slot(dog).exit_us.is_some() {
            if usize::from(self.run_counter[d]) + 1 < MAX_ATTEMPTS {
                self.run_counter[d] += 1;
            } else {
                warn!("Dog {} out of attempt slots, reusing the last one", dog);
            }
        }
        *self.active_slot_mut(dog) = AttemptTiming {
            enter_us: Some(at_us),
            ..AttemptTiming::default()
        };
    }

    /// Close the active attempt of `dog` at `at_us`.
    pub fn finish_attempt(&mut self, dog: u8, at_us: u64) {
        let slot = self.active_slot_mut(dog);
        slot.exit_us = Some(at_us);
        slot.elapsed_us = slot.enter_us.map_or(0, |enter| at_us.saturating_sub(enter));
    }

    /// Simultaneous crossing: the active dog left the instant the previous
    /// one came home.
    pub fn seed_from_previous(&mut self) {
        let prev_exit = self.previous_exit();
        let slot = self.active_slot_mut(self.current);
        slot.crossing_offset_us = 0;
        if prev_exit.is_some() {
            slot.enter_us = prev_exit;
        }
    }

    /// Handler beam broken with the gates clear.
    ///
    /// `next` is the dog that would run after the active one, if any.
    pub fn on_handler_high(&mut self, at_us: u64, next: Option<u8>, rerun_busy: bool) {
        let cur = self.current;
        if cur == 0 && self.direction == Direction::GoingIn && at_us < self.perfect_crossing_us {
            // Anchor-less early start: the first dog broke the beam before green.
            self.set_fault(0, true);
            let offset = signed_delta(at_us, self.perfect_crossing_us);
            let slot = self.active_slot_mut(0);
            slot.crossing_offset_us = offset;
            slot.enter_us = Some(at_us);
        } else if self.direction == Direction::ComingBack {
            if let Some(next) = next {
                // Next dog entered while the active one is still out.
                // The transition string decides later whether that was real.
                self.set_fault(next, true);
                self.finish_attempt(cur, at_us);
                self.begin_attempt(next, at_us);
            }
        }

        if self.direction == Direction::GoingIn {
            let offset = signed_delta(at_us, self.perfect_crossing_us);
            self.active_slot_mut(cur).crossing_offset_us = offset;
            if rerun_busy {
                self.set_fault(cur, false);
            }
        }
    }

    /// Box beam broken with the gates clear.
    ///
    /// Returns `true` when the active dog's run was finalized, in which
    /// case the caller decides what happens next.
    pub fn on_box_high(&mut self, at_us: u64, bounce_window_us: u64) -> bool {
        let cur = self.current;
        if self.direction != Direction::ComingBack {
            // Missed a perfectly overlapped crossing; the dog left when
            // the previous one came home.
            if let Some(prev_exit) = self.previous_exit() {
                self.active_slot_mut(cur).enter_us = Some(prev_exit);
            }
        }

        let Some(enter) = self.active_slot(cur).enter_us else {
            return false;
        };
        let since_enter = at_us.saturating_sub(enter);

        if self.faults[usize::from(cur)] && since_enter < bounce_window_us {
            // The "early" dog never left; the previous dog is only now home.
            if let Some(prev) = self.previous {
                self.finish_attempt(prev, at_us);
                self.active_slot_mut(cur).crossing_offset_us = signed_delta(enter, at_us);
                debug!("Dog {} was still returning, exit moved to {}", prev, at_us);
            }
            false
        } else if since_enter > bounce_window_us {
            self.finish_attempt(cur, at_us);
            self.perfect_crossing_us = at_us;
            true
        } else {
            false
        }
    }

    // ── Internal ──────────────────────────────────────────────

    pub(crate) fn active_slot(&self, dog: u8) -> &AttemptTiming {
        let d = check(dog);
        &self.timings[d][usize::from(self.run_counter[d])]
    }

    fn active_slot_mut(&mut self, dog: u8) -> &mut AttemptTiming {
        let d = check(dog);
        &mut self.timings[d][usize::from(self.run_counter[d])]
    }

    fn previous_exit(&self) -> Option<u64> {
        self.previous.and_then(|p| self.active_slot(p).exit_us)
    }
}

/// Dog indices come from the engine itself; anything else is a bug.
fn check(dog: u8) -> usize {
    assert!(usize::from(dog) < DOG_COUNT, "dog index {dog} out of range");
    usize::from(dog)
}

fn signed_delta(at_us: u64, reference_us: u64) -> i64 {
    at_us as i64 - reference_us as i64
}
