//! Hardware adapter: hands out the start-light output pins.
//!
//! On the device the lights are `esp_idf_hal` `PinDriver`s, which
//! implement `embedded_hal::digital::OutputPin` and plug straight into
//! [`LightsSequencer`](crate::drivers::lights::LightsSequencer).  On
//! non-espidf targets the pins are simulated and only logged.

use crate::drivers::lights::LIGHT_COUNT;
use crate::error::Result;

#[cfg(target_os = "espidf")]
pub type LightPin = esp_idf_hal::gpio::PinDriver<
    'static,
    esp_idf_hal::gpio::AnyOutputPin,
    esp_idf_hal::gpio::Output,
>;

#[cfg(not(target_os = "espidf"))]
pub type LightPin = SimLightPin;

/// Claim the four light GPIOs in sequence order.
#[cfg(target_os = "espidf")]
pub fn take_light_pins() -> Result<[LightPin; LIGHT_COUNT]> {
    use crate::error::Error;
    use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};

    let mut pins: heapless::Vec<LightPin, LIGHT_COUNT> = heapless::Vec::new();
    for gpio in crate::pins::LIGHT_GPIOS {
        // SAFETY: each light GPIO appears once in LIGHT_GPIOS and is
        // claimed nowhere else in the firmware.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        let driver = PinDriver::output(pin).map_err(|_| Error::Init("light pin driver"))?;
        pins.push(driver).map_err(|_| Error::Init("light pin table"))?;
    }
    pins.into_array().map_err(|_| Error::Init("light pin table"))
}

#[cfg(not(target_os = "espidf"))]
pub fn take_light_pins() -> Result<[LightPin; LIGHT_COUNT]> {
    log::info!("hardware(sim): light pins simulated");
    Ok(crate::pins::LIGHT_GPIOS.map(SimLightPin::new))
}

// ── Simulated output pin ──────────────────────────────────────

/// Host stand-in for a GPIO output.
#[derive(Debug)]
pub struct SimLightPin {
    gpio: i32,
    high: bool,
}

impl SimLightPin {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl embedded_hal::digital::ErrorType for SimLightPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for SimLightPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        if self.high {
            log::debug!("(sim) GPIO{} low", self.gpio);
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        if !self.high {
            log::debug!("(sim) GPIO{} high", self.gpio);
        }
        self.high = true;
        Ok(())
    }
}
