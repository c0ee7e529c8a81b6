//! Inbound commands to the control loop.
//!
//! The broker link delivers raw `(topic, payload)` pairs; [`parse_inbound`]
//! turns the ones the firmware understands into [`RemoteCommand`]s.

use log::warn;

use crate::telemetry::Topic;

/// Commands the outside world can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Manual indicator override from `actuator/led`.
    SetActuator { on: bool },
}

/// Map a received message to a command. Unknown topics and payloads
/// other than `"1"` / `"0"` are ignored.
pub fn parse_inbound(topic: &str, payload: &[u8]) -> Option<RemoteCommand> {
    match Topic::parse(topic) {
        Some(Topic::ActuatorLed) => match payload.trim_ascii() {
            b"1" => Some(RemoteCommand::SetActuator { on: true }),
            b"0" => Some(RemoteCommand::SetActuator { on: false }),
            other => {
                warn!(
                    "Ignoring {} payload {:?}",
                    Topic::ActuatorLed,
                    core::str::from_utf8(other).unwrap_or("<binary>")
                );
                None
            }
        },
        _ => {
            warn!("Ignoring message on unexpected topic '{}'", topic);
            None
        }
    }
}
