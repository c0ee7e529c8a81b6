//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensors, indicator output, button, broker link, clock,
//! event sinks) implement these traits. The
//! [`ControlLoop`](super::service::ControlLoop) consumes them via generics,
//! so the core never touches hardware or the network directly.

use crate::error::CommsError;
use crate::sensors::{ClimateSample, MotionSample};

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond source. Never goes backwards on real hardware;
/// the core still tolerates it with saturating arithmetic.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port. Each read may fail independently; failure is reported
/// through the sample's `valid` flag, never as a panic or error value.
pub trait SensorPort {
    fn read_climate(&mut self, now_ms: u64) -> ClimateSample;

    fn read_motion(&mut self) -> MotionSample;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The single physical output driven from alerts and overrides.
pub trait ActuatorPort {
    fn set_indicator(&mut self, on: bool);

    fn is_indicator_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw, undebounced button level. `true` = line high.
pub trait InputPort {
    fn button_level(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the broker link.
///
/// Reconnection is the adapter's job; the core sees only
/// [`is_connected`](LinkPort::is_connected). Inbound commands arrive
/// through the [`CommandInbox`](super::inbox::CommandInbox), not here.
pub trait LinkPort {
    fn is_connected(&self) -> bool;

    /// Hand one message to the broker client.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Called once per scheduler pass so the adapter can run its
    /// reconnection policy. Must not block.
    fn maintain(&mut self, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
