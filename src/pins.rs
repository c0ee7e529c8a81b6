//! GPIO / peripheral pin assignments for the EnvWatch node (ESP32 DevKit).
//!
//! Single source of truth. `main` resolves these into `esp-idf-hal` pin
//! drivers; nothing else hard-codes pin numbers.

// ---------------------------------------------------------------------------
// Climate sensor (DHT11, single-wire, open-drain with pull-up)
// ---------------------------------------------------------------------------

pub const DHT_DATA_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Inertial sensor (MPU-6050 on I²C0)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard-mode I²C; the MPU-6050 breakout has weak pull-ups.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// Indicator LED (active HIGH)
// ---------------------------------------------------------------------------

pub const INDICATOR_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button toggling Active / Paused.
pub const BUTTON_GPIO: i32 = 4;
