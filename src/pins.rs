//! GPIO pin assignments for the ETS main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Photo-electric gate sensors
// ---------------------------------------------------------------------------

/// Handler-side beam (closest to the handler, "A").  Interrupt on any edge.
pub const HANDLER_SENSOR_GPIO: i32 = 5;
/// Box-side beam (closest to the box, "B").  Interrupt on any edge.
pub const BOX_SENSOR_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Start lights (active HIGH, driven through transistor stages)
// ---------------------------------------------------------------------------

pub const LIGHT_RED_GPIO: i32 = 11;
pub const LIGHT_YELLOW1_GPIO: i32 = 12;
pub const LIGHT_YELLOW2_GPIO: i32 = 13;
pub const LIGHT_GREEN_GPIO: i32 = 14;

/// Start lights in sequence order.
pub const LIGHT_GPIOS: [i32; 4] = [
    LIGHT_RED_GPIO,
    LIGHT_YELLOW1_GPIO,
    LIGHT_YELLOW2_GPIO,
    LIGHT_GREEN_GPIO,
];

// ---------------------------------------------------------------------------
// Start/stop button (active-low with pull-up)
// ---------------------------------------------------------------------------

pub const BUTTON_GPIO: i32 = 16;
