//! Start lights, display, button, and hardware initialisation.

pub mod button;
pub mod display;
pub mod hw_init;
pub mod lights;
pub mod task_pin;
