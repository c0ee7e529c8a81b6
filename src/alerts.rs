//! Threshold alert evaluation.
//!
//! Climate and motion alerts are independent. Each is recomputed from
//! the latest sample of its own sensor; when that sample is invalid the
//! previous value is held (sticky) instead of being cleared.

use crate::config::SystemConfig;
use crate::sensors::{ClimateSample, MotionSample};

/// Alert flags published on `alert/motion` and `alert/climate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub motion: bool,
    pub climate: bool,
}

impl AlertState {
    pub fn any(&self) -> bool {
        self.motion || self.climate
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub temp_min_c: f32,
    pub temp_max_c: f32,
    pub humidity_max_pct: f32,
    /// Raw accelerometer counts; compared against the absolute value per axis.
    pub motion_threshold: u16,
}

impl From<&SystemConfig> for AlertThresholds {
    fn from(c: &SystemConfig) -> Self {
        Self {
            temp_min_c: c.temp_min_c,
            temp_max_c: c.temp_max_c,
            humidity_max_pct: c.humidity_max_pct,
            motion_threshold: c.motion_threshold,
        }
    }
}

/// Compute the next alert state. Pure: same inputs, same output.
pub fn evaluate(
    previous: AlertState,
    climate: &ClimateSample,
    motion: &MotionSample,
    thresholds: &AlertThresholds,
) -> AlertState {
    AlertState {
        climate: if climate.valid {
            climate_out_of_bounds(climate, thresholds)
        } else {
            previous.climate
        },
        motion: if motion.valid {
            motion_exceeds(motion, thresholds.motion_threshold)
        } else {
            previous.motion
        },
    }
}

fn climate_out_of_bounds(s: &ClimateSample, t: &AlertThresholds) -> bool {
    s.temperature_c < t.temp_min_c
        || s.temperature_c > t.temp_max_c
        || s.humidity_pct > t.humidity_max_pct
}

fn motion_exceeds(s: &MotionSample, threshold: u16) -> bool {
    // unsigned_abs keeps i16::MIN from overflowing
    [s.ax, s.ay, s.az]
        .iter()
        .any(|axis| axis.unsigned_abs() > threshold)
}
