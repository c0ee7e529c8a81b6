//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the indicator LED and the button pin, exposing
//! them through [`SensorPort`], [`ActuatorPort`] and [`InputPort`]. It is
//! generic over `embedded-hal` traits: `main` instantiates it with
//! `esp-idf-hal` drivers, tests with in-memory fakes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{ActuatorPort, InputPort, SensorPort};
use crate::drivers::indicator::Indicator;
use crate::sensors::{ClimateSample, MotionSample, SensorHub};

/// Concrete adapter that combines all board I/O behind port traits.
pub struct HardwareAdapter<I2C, DHT, D, LED, BTN> {
    sensor_hub: SensorHub<I2C, DHT, D>,
    indicator: Indicator<LED>,
    button: BTN,
    /// Level returned when the button pin cannot be read.
    last_button_level: bool,
}

impl<I2C, DHT, D, LED, BTN> HardwareAdapter<I2C, DHT, D, LED, BTN>
where
    I2C: I2c,
    DHT: InputPin + OutputPin,
    D: DelayNs,
    LED: OutputPin,
    BTN: InputPin,
{
    /// `button_idle_level` is what the line reads when nobody presses it.
    pub fn new(
        sensor_hub: SensorHub<I2C, DHT, D>,
        indicator: Indicator<LED>,
        button: BTN,
        button_idle_level: bool,
    ) -> Self {
        Self {
            sensor_hub,
            indicator,
            button,
            last_button_level: button_idle_level,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I2C, DHT, D, LED, BTN> SensorPort for HardwareAdapter<I2C, DHT, D, LED, BTN>
where
    I2C: I2c,
    DHT: InputPin + OutputPin,
    D: DelayNs,
    LED: OutputPin,
    BTN: InputPin,
{
    fn read_climate(&mut self, now_ms: u64) -> ClimateSample {
        self.sensor_hub.read_climate(now_ms)
    }

    fn read_motion(&mut self) -> MotionSample {
        self.sensor_hub.read_motion()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I2C, DHT, D, LED, BTN> ActuatorPort for HardwareAdapter<I2C, DHT, D, LED, BTN>
where
    I2C: I2c,
    DHT: InputPin + OutputPin,
    D: DelayNs,
    LED: OutputPin,
    BTN: InputPin,
{
    fn set_indicator(&mut self, on: bool) {
        self.indicator.set(on);
    }

    fn is_indicator_on(&self) -> bool {
        self.indicator.is_on()
    }
}

// ── InputPort implementation ──────────────────────────────────

impl<I2C, DHT, D, LED, BTN> InputPort for HardwareAdapter<I2C, DHT, D, LED, BTN>
where
    I2C: I2c,
    DHT: InputPin + OutputPin,
    D: DelayNs,
    LED: OutputPin,
    BTN: InputPin,
{
    fn button_level(&mut self) -> bool {
        match self.button.is_high() {
            Ok(level) => {
                self.last_button_level = level;
                level
            }
            Err(e) => {
                warn!("Button read failed: {:?}", e.kind());
                self.last_button_level
            }
        }
    }
}
