//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them (serial log, test recorder).

use crate::alerts::AlertState;
use crate::diagnostics::RuntimeMetrics;
use crate::telemetry::Topic;

use super::service::Mode;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The loop has started (carries initial mode).
    Started(Mode),

    /// Button toggled Active ↔ Paused.
    ModeChanged { from: Mode, to: Mode },

    /// One sensor tick completed.
    Tick(TickReport),

    /// Either alert flag changed value.
    AlertChanged { from: AlertState, to: AlertState },

    /// A remote override was recorded.
    OverrideReceived { on: bool, at_ms: u64 },

    /// The physical output changed.
    ActuatorChanged { on: bool, overridden: bool },

    /// A full offline queue evicted its oldest message.
    QueueOverflow { dropped_topic: Topic, total_dropped: u32 },

    /// Backlog replayed after reconnection.
    QueueDrained { delivered: usize, remaining: usize },

    /// Periodic counter snapshot.
    Metrics(RuntimeMetrics),
}

/// What one sensor tick observed and did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub at_ms: u64,
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub motion_valid: bool,
    pub alerts: AlertState,
    pub actuator_on: bool,
    pub overridden: bool,
    pub link_up: bool,
    pub queued: usize,
}
