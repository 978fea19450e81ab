//! One-shot GPIO and interrupt setup.
//!
//! Configures the two gate sensors and the start/stop button as inputs
//! and wires their interrupts using raw ESP-IDF sys calls.  Called once
//! from `main()` before the loop starts.  The start-light outputs are
//! owned by `esp_idf_hal` pin drivers (see `adapters::hardware`).
//!
//! ## ISR contract
//!
//! Sensor ISRs sample the pin level and the µs timer, then push one
//! record into [`TRIGGER_QUEUE`](crate::events::TRIGGER_QUEUE).  The
//! queue drops the edge itself while the race is stopped.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── Inputs ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe { init_gpio_inputs()? };
    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Sensors: push-pull outputs of the gate receivers, both edges.
    let sensors = gpio_config_t {
        pin_bit_mask: (1u64 << pins::HANDLER_SENSOR_GPIO) | (1u64 << pins::BOX_SENSOR_GPIO),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&sensors) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    let button = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    let ret = unsafe { gpio_config(&button) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::drivers::button::button_isr_handler;
#[cfg(target_os = "espidf")]
use crate::events::{Level, Sensor, TRIGGER_QUEUE};

/// Sample one sensor pin and queue the edge.
#[cfg(target_os = "espidf")]
#[inline(always)]
fn sensor_edge(sensor: Sensor, pin: i32) {
    // SAFETY: esp_timer_get_time and gpio_get_level are register reads;
    // both are ISR-safe.
    let (now_us, level) = unsafe { (esp_timer_get_time(), gpio_get_level(pin)) };
    let level = if level != 0 { Level::High } else { Level::Low };
    TRIGGER_QUEUE.trigger_sensor(sensor, level, now_us as u64);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn handler_sensor_isr(_arg: *mut core::ffi::c_void) {
    sensor_edge(Sensor::Handler, pins::HANDLER_SENSOR_GPIO);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn box_sensor_isr(_arg: *mut core::ffi::c_void) {
    sensor_edge(Sensor::Box, pins::BOX_SENSOR_GPIO);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a RTC counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    button_isr_handler(now_ms);
}

/// Install the per-pin GPIO ISR service and register the handlers.
/// Call after init_peripherals() and before the main loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    type Isr = unsafe extern "C" fn(*mut core::ffi::c_void);
    let handlers: [(i32, Isr); 3] = [
        (pins::HANDLER_SENSOR_GPIO, handler_sensor_isr),
        (pins::BOX_SENSOR_GPIO, box_sensor_isr),
        (pins::BUTTON_GPIO, button_gpio_isr),
    ];

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handlers are static functions
    // that only touch lock-free atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for (pin, isr) in handlers {
            let ret = gpio_isr_handler_add(pin, Some(isr), core::ptr::null_mut());
            if ret != ESP_OK as i32 { return Err(HwInitError::IsrHandlerFailed(ret)); }
            gpio_intr_enable(pin);
        }
    }

    info!("hw_init: ISR service installed (handler beam, box beam, button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
