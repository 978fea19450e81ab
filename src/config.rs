//! Race timing configuration
//!
//! All tunable parameters of the timing system.  The defaults are the
//! values the sport's equipment is built around; nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceConfig {
    // --- Race engine (microseconds) ---
    /// Delay between the start command and the timer zero-point
    pub lead_in_us: u64,
    /// Pending transition symbols are discarded after this much silence
    pub transition_stale_us: u64,
    /// Box-side edges closer than this to a dog's entry are treated as bounce
    pub bounce_window_us: u64,

    // --- Collaborators (milliseconds) ---
    /// Duration of one start-light stage
    pub light_stage_ms: u64,
    /// Display repaint interval
    pub display_refresh_ms: u64,
    /// Period of the rotating attempt view on the display
    pub attempt_rotation_ms: u64,
    /// Minimum gap between two accepted button presses
    pub button_lockout_ms: u32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            lead_in_us: 3_000_000,
            transition_stale_us: 2_000_000,
            bounce_window_us: 2_000_000,

            light_stage_ms: 1000,
            display_refresh_ms: 500,
            attempt_rotation_ms: 2000,
            button_lockout_ms: 300,
        }
    }
}

impl RaceConfig {
    /// Reject configurations the engine cannot run with.
    ///
    /// The green light (start of the fourth stage) must coincide with the
    /// armed start time, so the lead-in has to span exactly three stages.
    pub fn validate(&self) -> Result<()> {
        if self.transition_stale_us == 0 || self.bounce_window_us == 0 {
            return Err(Error::Config("timing windows must be non-zero"));
        }
        if self.light_stage_ms == 0 || self.display_refresh_ms == 0 || self.attempt_rotation_ms == 0 {
            return Err(Error::Config("intervals must be non-zero"));
        }
        if self.lead_in_us != self.light_stage_ms * 3 * 1000 {
            return Err(Error::Config("lead-in must equal three light stages"));
        }
        Ok(())
    }
}
