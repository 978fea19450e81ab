//! Serial-console display surface.
//!
//! Implements [`DisplaySurface`] by logging frame lines.  The frame is
//! repainted every refresh interval, so only lines whose text changed
//! since the last write are printed.

use log::info;

use crate::app::ports::DisplaySurface;
use crate::drivers::display::{COLUMNS, LINES};

pub struct ConsoleDisplay {
    shown: [heapless::String<COLUMNS>; LINES],
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            shown: core::array::from_fn(|_| heapless::String::new()),
        }
    }

    /// Text last printed for `line`.
    pub fn shown(&self, line: usize) -> &str {
        self.shown.get(line).map_or("", |s| s.as_str())
    }
}

impl DisplaySurface for ConsoleDisplay {
    fn write_line(&mut self, line: u8, text: &str) {
        let Some(slot) = self.shown.get_mut(line as usize) else {
            return;
        };
        if slot.as_str() == text {
            return;
        }

        slot.clear();
        for c in text.chars().take(COLUMNS) {
            if slot.push(c).is_err() {
                break;
            }
        }
        info!("LCD{} |{}|", line, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_changed_lines_only() {
        let mut console = ConsoleDisplay::new();
        console.write_line(1, "2:   4.000s");
        assert_eq!(console.shown(1), "2:   4.000s");
        console.write_line(1, "2:   4.000s");
        assert_eq!(console.shown(1), "2:   4.000s");
        assert_eq!(console.shown(0), "");
    }

    #[test]
    fn out_of_range_line_is_ignored() {
        let mut console = ConsoleDisplay::new();
        console.write_line(9, "x");
        assert_eq!(console.shown(9), "");
    }
}
