//! Broker topic table and payload encoding.
//!
//! | Topic                | Direction | Payload                         |
//! |----------------------|-----------|---------------------------------|
//! | `sensor/temperature` | publish   | decimal, 2 fractional digits    |
//! | `sensor/humidity`    | publish   | decimal, 2 fractional digits    |
//! | `sensor/motion`      | publish   | JSON `{AcX,AcY,AcZ,GyX,GyY,GyZ}` |
//! | `alert/motion`       | publish   | `1` / `0`                       |
//! | `alert/climate`      | publish   | `1` / `0`                       |
//! | `alert/button`       | publish   | mode status text                |
//! | `actuator/led`       | subscribe | `1` / `0`                       |
//!
//! Payloads live in fixed-capacity buffers sized for the largest message
//! (the motion record); encoders fail instead of truncating.

use core::fmt::Write;

use serde::Serialize;

use crate::error::CommsError;
use crate::sensors::MotionSample;

/// Largest payload the firmware produces.
pub const MAX_PAYLOAD_LEN: usize = 128;

pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

pub const STATUS_PAUSED: &str = "Sleep Mode activated";
pub const STATUS_RESUMED: &str = "Sleep Mode deactivated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Temperature,
    Humidity,
    Motion,
    AlertMotion,
    AlertClimate,
    AlertButton,
    /// Inbound actuator override.
    ActuatorLed,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "sensor/temperature",
            Self::Humidity => "sensor/humidity",
            Self::Motion => "sensor/motion",
            Self::AlertMotion => "alert/motion",
            Self::AlertClimate => "alert/climate",
            Self::AlertButton => "alert/button",
            Self::ActuatorLed => "actuator/led",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Temperature,
            Self::Humidity,
            Self::Motion,
            Self::AlertMotion,
            Self::AlertClimate,
            Self::AlertButton,
            Self::ActuatorLed,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy a short literal into a payload buffer, truncating at capacity.
pub fn payload_from(s: &str) -> Payload {
    let bytes = s.as_bytes();
    let n = bytes.len().min(MAX_PAYLOAD_LEN);
    let mut p = Payload::new();
    // n <= capacity
    let _ = p.extend_from_slice(&bytes[..n]);
    p
}

/// `23.456` → `"23.46"`.
pub fn encode_decimal(value: f32) -> Result<Payload, CommsError> {
    let mut s: heapless::String<32> = heapless::String::new();
    write!(s, "{:.2}", value).map_err(|_| CommsError::PayloadTooLarge)?;
    Ok(payload_from(&s))
}

pub fn encode_flag(on: bool) -> Payload {
    payload_from(if on { "1" } else { "0" })
}

pub fn encode_mode_status(paused: bool) -> Payload {
    payload_from(if paused { STATUS_PAUSED } else { STATUS_RESUMED })
}

#[derive(Serialize)]
struct MotionRecord {
    #[serde(rename = "AcX")]
    ac_x: i16,
    #[serde(rename = "AcY")]
    ac_y: i16,
    #[serde(rename = "AcZ")]
    ac_z: i16,
    #[serde(rename = "GyX")]
    gy_x: i16,
    #[serde(rename = "GyY")]
    gy_y: i16,
    #[serde(rename = "GyZ")]
    gy_z: i16,
}

pub fn encode_motion(sample: &MotionSample) -> Result<Payload, CommsError> {
    let record = MotionRecord {
        ac_x: sample.ax,
        ac_y: sample.ay,
        ac_z: sample.az,
        gy_x: sample.gx,
        gy_y: sample.gy,
        gy_z: sample.gz,
    };
    let json = serde_json::to_vec(&record).map_err(|_| CommsError::PayloadTooLarge)?;
    Payload::from_slice(&json).map_err(|()| CommsError::PayloadTooLarge)
}
