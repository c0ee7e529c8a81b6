//! Indicator LED driver.
//!
//! One push-pull output, active HIGH. The driver remembers the level it
//! last wrote successfully so callers can query it without touching the
//! pin.

use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

pub struct Indicator<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Indicator<P> {
    /// Take the pin and drive it low.
    pub fn new(pin: P) -> Self {
        let mut led = Self { pin, on: true };
        led.set(false);
        led
    }

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("Indicator write failed: {:?}", e.kind()),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
