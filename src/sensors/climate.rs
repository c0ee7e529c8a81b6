//! DHT11 temperature / humidity sensor on a single open-drain wire.
//!
//! ## Bus protocol
//!
//! | Phase          | Driven by | Duration            |
//! |----------------|-----------|---------------------|
//! | Start signal   | host low  | >= 18 ms            |
//! | Release        | pull-up   | 20 – 40 us          |
//! | Response       | sensor    | 80 us low, 80 us high |
//! | Each of 40 bits| sensor    | 50 us low, then 26 us high (0) or 70 us high (1) |
//!
//! A bit is sampled 35 us after its rising edge. The frame is humidity
//! (integer, decimal), temperature (integer, decimal), checksum.
//!
//! The part must not be polled faster than once every two seconds; a read
//! inside that window returns the cached result.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

const START_LOW_MS: u32 = 20;
const EDGE_TIMEOUT_US: u32 = 100;
const BIT_SAMPLE_US: u32 = 35;
const MIN_READ_INTERVAL_MS: u64 = 2_000;

/// Decoded DHT11 frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

pub struct Dht11<PIN, D> {
    pin: PIN,
    delay: D,
    last: Option<(u64, Result<ClimateReading, SensorError>)>,
}

impl<PIN, D> Dht11<PIN, D>
where
    PIN: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: PIN, delay: D) -> Self {
        Self {
            pin,
            delay,
            last: None,
        }
    }

    /// Read the sensor, or return the cached result when called again
    /// within two seconds.
    pub fn read(&mut self, now_ms: u64) -> Result<ClimateReading, SensorError> {
        if let Some((at, result)) = self.last {
            if now_ms.saturating_sub(at) < MIN_READ_INTERVAL_MS {
                return result;
            }
        }
        let result = self.read_frame().and_then(|frame| decode_frame(&frame));
        self.last = Some((now_ms, result));
        result
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_low().map_err(|_| SensorError::BusReadFailed)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| SensorError::BusReadFailed)?;

        // Response: pull-up high → sensor low 80 us → sensor high 80 us.
        self.wait_while(true).map_err(|_| SensorError::NoResponse)?;
        self.wait_while(false).map_err(|_| SensorError::NoResponse)?;
        self.wait_while(true).map_err(|_| SensorError::NoResponse)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_while(false)?;
            self.delay.delay_us(BIT_SAMPLE_US);
            if self.is_high()? {
                frame[bit / 8] |= 0x80 >> (bit % 8);
                self.wait_while(true)?;
            }
        }
        Ok(frame)
    }

    /// Spin while the line is at `level`; fail after the edge timeout.
    fn wait_while(&mut self, level: bool) -> Result<(), SensorError> {
        let mut waited = 0;
        while self.is_high()? == level {
            if waited >= EDGE_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
            self.delay.delay_us(1);
            waited += 1;
        }
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::BusReadFailed)
    }
}

/// Validate the checksum and convert a raw frame.
pub fn decode_frame(frame: &[u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }

    let humidity_pct = f32::from(frame[0]) + f32::from(frame[1]) * 0.1;
    let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) * 0.1;
    // Bit 7 of the temperature decimal byte marks sub-zero readings.
    let temperature_c = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };

    if humidity_pct > 100.0 {
        return Err(SensorError::OutOfRange);
    }
    Ok(ClimateReading {
        temperature_c,
        humidity_pct,
    })
}
