//! Start-light sequencer.
//!
//! Four lights (red, yellow, yellow, green) count the team down.  When the
//! race enters STARTING each light is scheduled on for one stage:
//!
//! ```text
//!  t = 0      1s      2s      3s      4s
//!      RED ──┐
//!            YEL1 ──┐
//!                   YEL2 ──┐
//!                          GREEN ──┐   ← FinalStage: timers start
//! ```
//!
//! The sequencer is generic over [`OutputPin`], so on the device it drives
//! `esp_idf_hal` pin drivers and in tests it drives recording mocks.
//! Pin write failures are logged and the schedule carries on.

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::app::ports::{LightsSignal, StartLightsPort};
use crate::error::{LightError, Result};
use crate::race::RaceState;

pub const LIGHT_COUNT: usize = 4;

/// Index of the green light.
const GREEN: usize = LIGHT_COUNT - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Red = 0,
    Yellow1 = 1,
    Yellow2 = 2,
    Green = 3,
}

pub struct LightsSequencer<P: OutputPin> {
    pins: [P; LIGHT_COUNT],
    stage_ms: u64,
    on_at: [Option<u64>; LIGHT_COUNT],
    off_at: [Option<u64>; LIGHT_COUNT],
    lit: [bool; LIGHT_COUNT],
}

impl<P: OutputPin> LightsSequencer<P> {
    /// Takes ownership of the pins in red, yellow, yellow, green order
    /// and drives them all low.
    pub fn new(pins: [P; LIGHT_COUNT], stage_ms: u64) -> Self {
        let mut seq = Self {
            pins,
            stage_ms,
            on_at: [None; LIGHT_COUNT],
            off_at: [None; LIGHT_COUNT],
            lit: [false; LIGHT_COUNT],
        };
        seq.all_off();
        seq
    }

    /// Schedule the countdown starting at `now_ms`.
    pub fn begin_sequence(&mut self, now_ms: u64) {
        for i in 0..LIGHT_COUNT {
            let stage = i as u64;
            self.on_at[i] = Some(now_ms + stage * self.stage_ms);
            self.off_at[i] = Some(now_ms + (stage + 1) * self.stage_ms);
        }
        debug!("Lights: sequence scheduled at {} ms", now_ms);
    }

    /// Delete every schedule and turn all lights off.
    pub fn cancel(&mut self) {
        self.on_at = [None; LIGHT_COUNT];
        self.off_at = [None; LIGHT_COUNT];
        self.all_off();
    }

    pub fn is_lit(&self, light: Light) -> bool {
        self.lit[light as usize]
    }

    /// `true` while any light still has a pending on or off time.
    pub fn is_sequencing(&self) -> bool {
        self.on_at.iter().chain(self.off_at.iter()).any(Option::is_some)
    }

    fn all_off(&mut self) {
        for i in 0..LIGHT_COUNT {
            if let Err(e) = self.set(i, false) {
                warn!("Lights: {}", e);
            }
        }
    }

    fn set(&mut self, idx: usize, on: bool) -> Result<()> {
        let pin = &mut self.pins[idx];
        let res = if on { pin.set_high() } else { pin.set_low() };
        res.map_err(|_| LightError::PinWriteFailed(idx as u8))?;
        self.lit[idx] = on;
        Ok(())
    }

    fn due(slot: &mut Option<u64>, now_ms: u64) -> bool {
        match *slot {
            Some(at) if now_ms >= at => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

impl<P: OutputPin> StartLightsPort for LightsSequencer<P> {
    fn on_race_state(&mut self, state: RaceState, now_ms: u64) {
        match state {
            RaceState::Starting => self.begin_sequence(now_ms),
            RaceState::Stop => self.cancel(),
            RaceState::Racing => {}
        }
    }

    fn poll(&mut self, now_ms: u64) -> Option<LightsSignal> {
        let mut signal = None;

        for i in 0..LIGHT_COUNT {
            if Self::due(&mut self.on_at[i], now_ms) {
                if let Err(e) = self.set(i, true) {
                    warn!("Lights: {}", e);
                }
                if i == GREEN {
                    info!("Lights: GREEN on");
                    signal = Some(LightsSignal::FinalStage);
                }
            }
            if Self::due(&mut self.off_at[i], now_ms) {
                if let Err(e) = self.set(i, false) {
                    warn!("Lights: {}", e);
                }
            }
        }

        signal
    }
}
