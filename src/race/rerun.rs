//! Fault and rerun orchestration.
//!
//! Decides what happens after a dog's run is finalized on the box side:
//! stop the race, hand over to the next dog, or send a faulted dog back
//! out.  A rerun stays in progress until a dog comes home with no fault
//! outstanding anywhere in the team, even if a rerun dog faults again.

use log::info;

use super::dogs::{DOG_COUNT, DogTable, LAST_DOG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Team is complete and clean; stop at the finalize timestamp.
    Stop,
    /// `dog` reruns its leg in a new attempt slot.
    Rerun { dog: u8 },
    /// Normal handover to `dog`.
    Handoff { dog: u8 },
}

#[derive(Debug, Default)]
pub struct FaultOrchestrator {
    rerun_busy: bool,
}

impl FaultOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.rerun_busy = false;
    }

    pub fn rerun_busy(&self) -> bool {
        self.rerun_busy
    }

    /// Dog expected to run after the active one.
    pub fn next_dog(&self, dogs: &DogTable) -> Option<u8> {
        if self.rerun_busy || (dogs.current() == LAST_DOG && dogs.any_fault()) {
            dogs.first_faulted()
        } else {
            let next = dogs.current() + 1;
            (usize::from(next) < DOG_COUNT).then_some(next)
        }
    }

    /// Apply race-completion and rerun rules after the active dog's run
    /// was finalized at `at_us`.
    pub fn after_finalize(&mut self, dogs: &mut DogTable, at_us: u64) -> FinalizeOutcome {
        let last = dogs.current() == LAST_DOG;
        let fault = dogs.any_fault();

        if (last && !fault && !self.rerun_busy) || (self.rerun_busy && !fault) {
            self.rerun_busy = false;
            return FinalizeOutcome::Stop;
        }

        if last || self.rerun_busy {
            if !self.rerun_busy {
                info!("Last dog home with faults outstanding, starting reruns");
            }
            self.rerun_busy = true;
            // `fault` is set, so some dog is faulted.
            let dog = dogs.first_faulted().unwrap_or(dogs.current());
            dogs.begin_attempt(dog, at_us);
            info!("Rerun: dog {} attempt {}", dog, dogs.run_count(dog));
            return FinalizeOutcome::Rerun { dog };
        }

        let dog = dogs.current() + 1;
        dogs.begin_attempt(dog, at_us);
        FinalizeOutcome::Handoff { dog }
    }
}
