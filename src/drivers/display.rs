//! Fixed-layout race display.
//!
//! A 40×4 character frame with named fields laid over static labels:
//!
//! ```text
//!            1         2         3
//!  0123456789012345678901234567890123456789
//!  1:   0.000s +  0.000s   | STOP
//!  2:   0.000s +  0.000s   | Team:   0.000s
//!  3:   0.000s +  0.000s   |   CR:   0.000s
//!  4:   0.000s +  0.000s   |       Box: -->
//! ```
//!
//! The service pushes text with [`FieldSink::update_field`]; text longer
//! than the field width is rejected and the old value kept.  Every
//! `refresh_ms` the whole frame is composed (fields left-aligned and
//! space-padded) and written to a [`DisplaySurface`].

use log::debug;

use crate::app::ports::{DisplaySurface, FieldId, FieldSink, FieldView};
use crate::error::{DisplayError, Result};
use crate::race::dogs::DOG_COUNT;

pub const COLUMNS: usize = 40;
pub const LINES: usize = 4;

const FIELD_COUNT: usize = 3 * DOG_COUNT + 4;
const MAX_FIELD_WIDTH: usize = 8;

const TEMPLATE: [&[u8; COLUMNS]; LINES] = [
    b"1:   0.000s +  0.000s   |               ",
    b"2:   0.000s +  0.000s   | Team:   0.000s",
    b"3:   0.000s +  0.000s   |   CR:   0.000s",
    b"4:   0.000s +  0.000s   |       Box: -->",
];

/// Position of a field on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub line: u8,
    pub col: u8,
    pub width: u8,
}

impl FieldLayout {
    const fn at(line: u8, col: u8, width: u8) -> Self {
        Self { line, col, width }
    }
}

/// Layout of each named field.
pub fn layout(field: FieldId) -> FieldLayout {
    match field {
        FieldId::DogTime(d) => FieldLayout::at(dog_line(d), 3, 7),
        FieldId::CrossTime(d) => FieldLayout::at(dog_line(d), 12, 8),
        FieldId::RerunInfo(d) => FieldLayout::at(dog_line(d), 22, 2),
        FieldId::RaceState => FieldLayout::at(0, 25, 7),
        FieldId::TeamTime => FieldLayout::at(1, 32, 7),
        FieldId::TotalCrossTime => FieldLayout::at(2, 32, 7),
        FieldId::BoxDirection => FieldLayout::at(3, 37, 3),
    }
}

fn dog_line(dog: u8) -> u8 {
    assert!((dog as usize) < DOG_COUNT, "dog index {dog} out of range");
    dog
}

fn slot(field: FieldId) -> usize {
    let dogs = DOG_COUNT;
    match field {
        FieldId::DogTime(d) => dog_line(d) as usize,
        FieldId::CrossTime(d) => dogs + dog_line(d) as usize,
        FieldId::RerunInfo(d) => 2 * dogs + dog_line(d) as usize,
        FieldId::RaceState => 3 * dogs,
        FieldId::TeamTime => 3 * dogs + 1,
        FieldId::TotalCrossTime => 3 * dogs + 2,
        FieldId::BoxDirection => 3 * dogs + 3,
    }
}

fn field_at(slot: usize) -> FieldId {
    let dogs = DOG_COUNT;
    match slot {
        s if s < dogs => FieldId::DogTime(s as u8),
        s if s < 2 * dogs => FieldId::CrossTime((s - dogs) as u8),
        s if s < 3 * dogs => FieldId::RerunInfo((s - 2 * dogs) as u8),
        s if s == 3 * dogs => FieldId::RaceState,
        s if s == 3 * dogs + 1 => FieldId::TeamTime,
        s if s == 3 * dogs + 2 => FieldId::TotalCrossTime,
        _ => FieldId::BoxDirection,
    }
}

fn initial_text(field: FieldId) -> &'static str {
    match field {
        FieldId::DogTime(_) | FieldId::TeamTime | FieldId::TotalCrossTime => "  0.000",
        FieldId::CrossTime(_) => "+  0.000",
        FieldId::RerunInfo(_) => "  ",
        FieldId::RaceState => " STOP",
        FieldId::BoxDirection => "-->",
    }
}

// ───────────────────────────────────────────────────────────────
// DisplayController
// ───────────────────────────────────────────────────────────────

pub struct DisplayController {
    fields: [heapless::String<MAX_FIELD_WIDTH>; FIELD_COUNT],
    frame: [[u8; COLUMNS]; LINES],
    refresh_ms: u64,
    last_refresh_ms: Option<u64>,
}

impl DisplayController {
    pub fn new(refresh_ms: u64) -> Self {
        let fields = core::array::from_fn(|s| {
            let mut text = heapless::String::new();
            let _ = text.push_str(initial_text(field_at(s)));
            text
        });
        Self {
            fields,
            frame: TEMPLATE.map(|line| *line),
            refresh_ms,
            last_refresh_ms: None,
        }
    }

    /// Compose and write the frame if the refresh interval has passed.
    /// Returns `true` when the surface was written.
    pub fn refresh(&mut self, now_ms: u64, surface: &mut impl DisplaySurface) -> bool {
        let due = self
            .last_refresh_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.refresh_ms);
        if !due {
            return false;
        }

        self.compose();
        for line in 0..LINES {
            surface.write_line(line as u8, self.line(line));
        }
        self.last_refresh_ms = Some(now_ms);
        true
    }

    /// Text of a composed frame line (as of the last refresh).
    pub fn line(&self, line: usize) -> &str {
        // The frame only ever holds ASCII.
        core::str::from_utf8(&self.frame[line]).unwrap_or("")
    }

    fn compose(&mut self) {
        for (s, text) in self.fields.iter().enumerate() {
            let FieldLayout { line, col, width } = layout(field_at(s));
            let row = &mut self.frame[line as usize];
            let start = col as usize;
            let cells = &mut row[start..start + width as usize];

            cells.fill(b' ');
            for (cell, &b) in cells.iter_mut().zip(text.as_bytes()) {
                *cell = if b.is_ascii() { b } else { b'?' };
            }
        }
    }
}

impl FieldSink for DisplayController {
    fn update_field(&mut self, field: FieldId, text: &str) -> Result<()> {
        let width = layout(field).width;
        if text.len() > width as usize {
            debug!("Display: {:?} rejected {} chars", field, text.len());
            return Err(DisplayError::FieldTooLong {
                width,
                len: text.len(),
            }
            .into());
        }

        let stored = &mut self.fields[slot(field)];
        stored.clear();
        // Width never exceeds MAX_FIELD_WIDTH, so this cannot fail.
        let _ = stored.push_str(text);
        Ok(())
    }
}

impl FieldView for DisplayController {
    fn field_text(&self, field: FieldId) -> Option<&str> {
        Some(self.fields[slot(field)].as_str())
    }
}
