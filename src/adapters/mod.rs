//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements       | Connects to                |
//! |------------------|------------------|----------------------------|
//! | `clock`          | Clock            | ESP32 system timer         |
//! | `hardware`       | OutputPin (×4)   | Start-light GPIOs          |
//! | `log_sink`       | EventSink        | Serial log output          |
//! | `serial_display` | DisplaySurface   | Serial log output          |

pub mod clock;
pub mod hardware;
pub mod log_sink;
pub mod serial_display;
