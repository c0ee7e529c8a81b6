//! MPU-6050 six-axis inertial sensor over I2C.
//!
//! One burst read of 14 bytes starting at `ACCEL_XOUT_H` returns
//! accelerometer X/Y/Z, die temperature, and gyroscope X/Y/Z as
//! big-endian `i16` words. The temperature word is skipped.
//!
//! Generic over [`embedded_hal::i2c::I2c`] so the same driver runs on the
//! ESP-IDF I2C peripheral and on a host mock.

use embedded_hal::i2c::I2c;
use log::info;

use super::MotionSample;
use crate::error::SensorError;

/// Default 7-bit address (AD0 tied low).
pub const MPU6050_ADDR: u8 = 0x68;

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const BURST_LEN: usize = 14;

pub struct Mpu6050<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Clear the sleep bit so the sensor starts converting.
    pub fn wake(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[REG_PWR_MGMT_1, 0x00])
            .map_err(|_| SensorError::BusReadFailed)?;
        info!("MPU-6050 awake at 0x{:02X}", self.address);
        Ok(())
    }

    pub fn read(&mut self) -> Result<MotionSample, SensorError> {
        let mut buf = [0u8; BURST_LEN];
        self.i2c
            .write_read(self.address, &[REG_ACCEL_XOUT_H], &mut buf)
            .map_err(|_| SensorError::BusReadFailed)?;
        decode_burst(&buf)
    }

    /// Give the bus back (used by tests to inspect the mock).
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Decode a register burst. Anything shorter than 14 bytes is a failed read.
pub fn decode_burst(bytes: &[u8]) -> Result<MotionSample, SensorError> {
    if bytes.len() < BURST_LEN {
        return Err(SensorError::BusReadFailed);
    }
    let word = |i: usize| i16::from_be_bytes([bytes[i], bytes[i + 1]]);
    Ok(MotionSample::new(
        [word(0), word(2), word(4)],
        // bytes 6..8 hold the die temperature
        [word(8), word(10), word(12)],
    ))
}
