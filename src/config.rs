//! System configuration parameters
//!
//! All tunable parameters for the EnvWatch node. Defaults match the
//! deployed board; any subset can be overridden from a JSON document
//! (see [`SystemConfig::from_json`]). Values are validated before the
//! control loop accepts them.

use core::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::queue::MAX_QUEUE_DEPTH;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Climate thresholds ---
    /// Lower temperature bound (Celsius); below raises the climate alert.
    pub temp_min_c: f32,
    /// Upper temperature bound (Celsius); above raises the climate alert.
    pub temp_max_c: f32,
    /// Relative humidity bound (%); above raises the climate alert.
    pub humidity_max_pct: f32,

    // --- Motion threshold ---
    /// Raw accelerometer magnitude on any axis that raises the motion alert.
    pub motion_threshold: u16,

    // --- Timing ---
    /// Sensor tick period (milliseconds), measured from the previous tick.
    pub sensor_interval_ms: u32,
    /// Time the button level must hold before it counts (milliseconds).
    pub debounce_ms: u32,
    /// How long a remote actuator command governs the output (milliseconds).
    pub override_window_ms: u32,
    /// Fixed delay between link reconnection attempts (milliseconds).
    pub reconnect_delay_ms: u32,
    /// Sleep between scheduler passes in the device main loop (milliseconds).
    pub loop_idle_ms: u32,

    // --- Offline buffering ---
    /// Maximum number of telemetry messages held while the link is down.
    pub queue_capacity: usize,

    // --- Input wiring ---
    /// Button pulls the pin to ground when pressed.
    pub button_active_low: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Climate
            temp_min_c: 10.0,
            temp_max_c: 25.0,
            humidity_max_pct: 80.0,

            // Motion
            motion_threshold: 18_000,

            // Timing
            sensor_interval_ms: 5_000,
            debounce_ms: 50,
            override_window_ms: 10_000,
            reconnect_delay_ms: 5_000,
            loop_idle_ms: 10,

            // Offline buffering
            queue_capacity: 32,

            // Input
            button_active_low: true,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON document on top of the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            warn!("config: JSON parse failed: {}", e);
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the control loop misbehave.
    /// Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.temp_min_c.is_finite() || !self.temp_max_c.is_finite() {
            return Err(ConfigError::ValidationFailed("temperature bounds must be finite"));
        }
        if self.temp_min_c >= self.temp_max_c {
            return Err(ConfigError::ValidationFailed("temp_min_c must be below temp_max_c"));
        }
        if !(0.0..=100.0).contains(&self.humidity_max_pct) {
            return Err(ConfigError::ValidationFailed("humidity_max_pct must be within 0..=100"));
        }
        if self.motion_threshold == 0 {
            return Err(ConfigError::ValidationFailed("motion_threshold must be non-zero"));
        }
        if self.sensor_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("sensor_interval_ms must be non-zero"));
        }
        if self.override_window_ms == 0 {
            return Err(ConfigError::ValidationFailed("override_window_ms must be non-zero"));
        }
        if self.debounce_ms >= self.sensor_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "debounce_ms must be shorter than sensor_interval_ms",
            ));
        }
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_DEPTH {
            return Err(ConfigError::ValidationFailed("queue_capacity must be within 1..=64"));
        }
        Ok(())
    }
}

/// Deployment settings for the network link. Injected into the WiFi and
/// MQTT adapters; the control core never reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Broker URL, e.g. `mqtt://192.168.0.5:1883`.
    pub broker_url: heapless::String<96>,
    /// Client id prefix; the adapter appends a device-unique suffix.
    pub client_id_prefix: heapless::String<24>,
}

impl NetworkConfig {
    pub fn new(
        wifi_ssid: &str,
        wifi_password: &str,
        broker_url: &str,
        client_id_prefix: &str,
    ) -> Result<Self, ConfigError> {
        fn copy<const N: usize>(
            s: &str,
            field: &'static str,
        ) -> Result<heapless::String<N>, ConfigError> {
            let mut out = heapless::String::new();
            out.push_str(s).map_err(|()| ConfigError::ValidationFailed(field))?;
            Ok(out)
        }

        if broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_url must not be empty"));
        }

        Ok(Self {
            wifi_ssid: copy(wifi_ssid, "wifi_ssid too long")?,
            wifi_password: copy(wifi_password, "wifi_password too long")?,
            broker_url: copy(broker_url, "broker_url too long")?,
            client_id_prefix: copy(client_id_prefix, "client_id_prefix too long")?,
        })
    }
}

/// Errors from configuration parsing and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override document is not valid JSON for this schema.
    Malformed,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "config malformed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Malformed => Self::Config("malformed"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}
