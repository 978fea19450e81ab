//! Transition recognizer.
//!
//! Reduces the ordered edge stream of both beams to a short symbol
//! sequence and classifies what crossed the gates once they are clear
//! again.  Classification looks only at edge *order*, never at durations.
//!
//! | Symbol | Edge                        |
//! |--------|-----------------------------|
//! | `A`    | handler beam broken         |
//! | `a`    | handler beam restored       |
//! | `B`    | box beam broken             |
//! | `b`    | box beam restored           |
//!
//! | Sequence | Verdict                                         |
//! |----------|-------------------------------------------------|
//! | `ABab`   | one dog ran toward the box                      |
//! | `BAba`   | one dog ran back toward the handler             |
//! | `BbAa`   | something small rolled out alone (spat ball)    |
//! | other    | two dogs crossed at the same time               |

use heapless::Vec;
use log::{debug, warn};

use crate::events::{Level, Sensor};

/// Maximum number of pending symbols before the buffer is discarded.
pub const TRANSITION_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// `A`
    HandlerHigh,
    /// `a`
    HandlerLow,
    /// `B`
    BoxHigh,
    /// `b`
    BoxLow,
}

impl Symbol {
    pub const fn from_edge(sensor: Sensor, level: Level) -> Self {
        match (sensor, level) {
            (Sensor::Handler, Level::High) => Self::HandlerHigh,
            (Sensor::Handler, Level::Low) => Self::HandlerLow,
            (Sensor::Box, Level::High) => Self::BoxHigh,
            (Sensor::Box, Level::Low) => Self::BoxLow,
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            Self::HandlerHigh => 'A',
            Self::HandlerLow => 'a',
            Self::BoxHigh => 'B',
            Self::BoxLow => 'b',
        }
    }

    const fn sensor(self) -> Sensor {
        match self {
            Self::HandlerHigh | Self::HandlerLow => Sensor::Handler,
            Self::BoxHigh | Self::BoxLow => Sensor::Box,
        }
    }
}

/// Verdict for a completed crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// `ABab`: the active dog is out, heading for the box.
    Outbound,
    /// `BAba`: the active dog is home.
    Inbound,
    /// `BbAa`: a light object crossed without a dog.
    SpatBall,
    /// Any other sequence: returning and outgoing dog crossed together.
    Simultaneous,
}

pub struct TransitionRecognizer {
    symbols: Vec<Symbol, TRANSITION_CAPACITY>,
    last_update_us: u64,
    stale_after_us: u64,
    gates_clear: bool,
}

impl TransitionRecognizer {
    pub fn new(stale_after_us: u64) -> Self {
        Self {
            symbols: Vec::new(),
            last_update_us: 0,
            stale_after_us,
            gates_clear: true,
        }
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
        self.last_update_us = 0;
        self.gates_clear = true;
    }

    /// True when no dog is believed to be inside the gates.
    pub fn gates_clear(&self) -> bool {
        self.gates_clear
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Pending symbols rendered as text, e.g. `"ABa"`.
    pub fn as_text(&self) -> heapless::String<TRANSITION_CAPACITY> {
        self.symbols.iter().map(|s| s.as_char()).collect()
    }

    /// Discard pending symbols that have seen no update for the stale window.
    pub fn expire_stale(&mut self, now_us: u64) {
        if !self.symbols.is_empty() && now_us.saturating_sub(self.last_update_us) > self.stale_after_us {
            debug!("Transition '{}' went stale, clearing", self.as_text());
            self.symbols.clear();
            self.gates_clear = true;
        }
    }

    /// Append one edge.  Returns a verdict when the gates have cleared
    /// after a complete crossing.
    pub fn push(&mut self, symbol: Symbol, at_us: u64) -> Option<Crossing> {
        self.last_update_us = at_us;

        if self.symbols.push(symbol).is_err() {
            warn!("Transition buffer overflow at '{}', discarding", self.as_text());
            self.symbols.clear();
            // Capacity is non-zero, the retry cannot fail.
            let _ = self.symbols.push(symbol);
        }
        self.collapse_jitter();

        // `BbAa` ends on a single beam, so it is accepted as clear explicitly.
        self.gates_clear = matches!(
            self.symbols.as_slice(),
            []
                | [.., Symbol::HandlerLow, Symbol::BoxLow]
                | [.., Symbol::BoxLow, Symbol::HandlerLow]
                | [Symbol::BoxHigh, Symbol::BoxLow, Symbol::HandlerHigh, Symbol::HandlerLow]
        );

        if !self.gates_clear || self.symbols.len() <= 3 {
            return None;
        }

        let crossing = classify(&self.symbols);
        debug!("Transition '{}' -> {:?}", self.as_text(), crossing);
        self.symbols.clear();
        Some(crossing)
    }

    /// `XxX` on the same beam is bounce: keep only the first `X`.
    fn collapse_jitter(&mut self) {
        while let [.., x, y, z] = self.symbols.as_slice() {
            if x == z && x != y && x.sensor() == y.sensor() {
                let keep = self.symbols.len() - 2;
                self.symbols.truncate(keep);
            } else {
                break;
            }
        }
    }
}

fn classify(symbols: &[Symbol]) -> Crossing {
    use Symbol::{BoxHigh as B, BoxLow as b, HandlerHigh as A, HandlerLow as a};

    match symbols {
        [A, B, a, b] => Crossing::Outbound,
        [B, A, b, a] => Crossing::Inbound,
        [B, b, A, a] => Crossing::SpatBall,
        _ => Crossing::Simultaneous,
    }
}
