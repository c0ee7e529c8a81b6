//! Sensor subsystem: typed samples, individual drivers, and the
//! aggregating [`SensorHub`].
//!
//! The control core only ever sees [`ClimateSample`] and [`MotionSample`].
//! Register layouts and bus timing stay inside the drivers.

pub mod climate;
pub mod motion;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::warn;

use climate::Dht11;
use motion::Mpu6050;

/// Value written into every motion axis when the bus read fails.
pub const MOTION_SENTINEL: i16 = -9999;

/// One temperature / humidity reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// `false` when the read failed; the values are then meaningless.
    pub valid: bool,
}

impl ClimateSample {
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Self {
        let valid = temperature_c.is_finite() && humidity_pct.is_finite();
        Self {
            temperature_c,
            humidity_pct,
            valid,
        }
    }

    pub fn invalid() -> Self {
        Self {
            temperature_c: f32::NAN,
            humidity_pct: f32::NAN,
            valid: false,
        }
    }
}

/// One accelerometer + gyroscope reading in raw sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSample {
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
    /// `false` when the bus transaction came back short.
    pub valid: bool,
}

impl MotionSample {
    pub fn new(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self {
            ax: accel[0],
            ay: accel[1],
            az: accel[2],
            gx: gyro[0],
            gy: gyro[1],
            gz: gyro[2],
            valid: true,
        }
    }

    /// All axes hold [`MOTION_SENTINEL`].
    pub fn invalid() -> Self {
        Self {
            ax: MOTION_SENTINEL,
            ay: MOTION_SENTINEL,
            az: MOTION_SENTINEL,
            gx: MOTION_SENTINEL,
            gy: MOTION_SENTINEL,
            gz: MOTION_SENTINEL,
            valid: false,
        }
    }
}

/// Owns both sensor drivers and turns driver errors into invalid samples.
///
/// Individual read failures are logged; a flaky sensor never stops the
/// control loop.
pub struct SensorHub<I2C, PIN, D> {
    pub motion: Mpu6050<I2C>,
    pub climate: Dht11<PIN, D>,
}

impl<I2C, PIN, D> SensorHub<I2C, PIN, D>
where
    I2C: I2c,
    PIN: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(motion: Mpu6050<I2C>, climate: Dht11<PIN, D>) -> Self {
        Self { motion, climate }
    }

    pub fn read_climate(&mut self, now_ms: u64) -> ClimateSample {
        match self.climate.read(now_ms) {
            Ok(reading) => ClimateSample::new(reading.temperature_c, reading.humidity_pct),
            Err(e) => {
                warn!("DHT11 read failed: {}", e);
                ClimateSample::invalid()
            }
        }
    }

    pub fn read_motion(&mut self) -> MotionSample {
        match self.motion.read() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("MPU-6050 read failed: {}", e);
                MotionSample::invalid()
            }
        }
    }
}
