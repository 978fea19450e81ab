//! ISR-latched start/stop button with lock-out debounce.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up.  The GPIO fires on the
//! falling edge; the ISR stores the press time into an atomic latch and
//! the main loop picks it up with [`ButtonDriver::tick`].
//!
//! A press is accepted only if the lock-out period has passed since the
//! last accepted press.  Contact bounce and impatient double presses
//! inside that window are swallowed.

use core::sync::atomic::{AtomicU32, Ordering};

use log::debug;

/// Press timestamp written by the ISR (milliseconds since boot, truncated
/// to `u32`, 0 = nothing pending).
pub struct ButtonLatch(AtomicU32);

impl ButtonLatch {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Record a press.  Safe to call from interrupt context.
    pub fn record(&self, now_ms: u32) {
        // 0 marks an empty latch, so a press at exactly t=0 is nudged.
        self.0.store(now_ms.max(1), Ordering::Release);
    }

    fn take(&self) -> Option<u32> {
        match self.0.swap(0, Ordering::AcqRel) {
            0 => None,
            ms => Some(ms),
        }
    }
}

impl Default for ButtonLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Latch fed by the start/stop button ISR.
pub static BUTTON_LATCH: ButtonLatch = ButtonLatch::new();

/// ISR handler: register this on the button GPIO falling edge.
pub fn button_isr_handler(now_ms: u32) {
    BUTTON_LATCH.record(now_ms);
}

/// An accepted button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub at_ms: u32,
}

pub struct ButtonDriver {
    gpio: i32,
    lockout_ms: u32,
    latch: &'static ButtonLatch,
    last_accepted_ms: Option<u32>,
}

impl ButtonDriver {
    pub fn new(gpio: i32, lockout_ms: u32, latch: &'static ButtonLatch) -> Self {
        Self {
            gpio,
            lockout_ms,
            latch,
            last_accepted_ms: None,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Call from the main loop.  Returns a press if one was latched and
    /// the lock-out has expired.
    pub fn tick(&mut self) -> Option<ButtonPress> {
        let at_ms = self.latch.take()?;

        if let Some(last) = self.last_accepted_ms {
            if at_ms.wrapping_sub(last) < self.lockout_ms {
                debug!("Button: press at {} ms inside lock-out", at_ms);
                return None;
            }
        }

        self.last_accepted_ms = Some(at_ms);
        Some(ButtonPress { at_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_press_without_isr() {
        static LATCH: ButtonLatch = ButtonLatch::new();
        let mut btn = ButtonDriver::new(16, 300, &LATCH);
        assert_eq!(btn.tick(), None);
    }

    #[test]
    fn press_is_reported_once() {
        static LATCH: ButtonLatch = ButtonLatch::new();
        let mut btn = ButtonDriver::new(16, 300, &LATCH);
        LATCH.record(1000);
        assert_eq!(btn.tick(), Some(ButtonPress { at_ms: 1000 }));
        assert_eq!(btn.tick(), None);
    }

    #[test]
    fn bounce_inside_lockout_is_swallowed() {
        static LATCH: ButtonLatch = ButtonLatch::new();
        let mut btn = ButtonDriver::new(16, 300, &LATCH);
        LATCH.record(1000);
        assert!(btn.tick().is_some());
        LATCH.record(1120);
        assert_eq!(btn.tick(), None);
        LATCH.record(1300);
        assert_eq!(btn.tick(), Some(ButtonPress { at_ms: 1300 }));
    }

    #[test]
    fn press_at_boot_is_not_lost() {
        static LATCH: ButtonLatch = ButtonLatch::new();
        let mut btn = ButtonDriver::new(16, 300, &LATCH);
        LATCH.record(0);
        assert!(btn.tick().is_some());
    }
}
