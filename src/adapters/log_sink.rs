//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn reading(value: Option<f32>) -> f32 {
    value.unwrap_or(f32::NAN)
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Tick(t) => {
                info!(
                    "TICK  | t={}ms | T={:.1}\u{00b0}C H={:.1}% | motion={} | \
                     alert motion={} climate={} | led={}{} | link={} queued={}",
                    t.at_ms,
                    reading(t.temperature_c),
                    reading(t.humidity_pct),
                    if t.motion_valid { "ok" } else { "ERR" },
                    t.alerts.motion,
                    t.alerts.climate,
                    if t.actuator_on { "ON" } else { "OFF" },
                    if t.overridden { " (override)" } else { "" },
                    if t.link_up { "UP" } else { "DOWN" },
                    t.queued,
                );
            }
            AppEvent::Started(mode) => {
                info!("START | mode={:?}", mode);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::AlertChanged { from, to } => {
                info!(
                    "ALERT | motion {} -> {} | climate {} -> {}",
                    from.motion, to.motion, from.climate, to.climate
                );
            }
            AppEvent::OverrideReceived { on, at_ms } => {
                info!("OVRD  | led={} at {}ms", if *on { "ON" } else { "OFF" }, at_ms);
            }
            AppEvent::ActuatorChanged { on, overridden } => {
                info!(
                    "LED   | {} ({})",
                    if *on { "ON" } else { "OFF" },
                    if *overridden { "override" } else { "auto" }
                );
            }
            AppEvent::QueueOverflow {
                dropped_topic,
                total_dropped,
            } => {
                warn!(
                    "QUEUE | full, evicted oldest {} (total dropped {})",
                    dropped_topic, total_dropped
                );
            }
            AppEvent::QueueDrained {
                delivered,
                remaining,
            } => {
                info!("QUEUE | replayed {} ({} left)", delivered, remaining);
            }
            AppEvent::Metrics(m) => {
                info!(
                    "STATS | passes={} ticks={} faults={}/{} ({:.2}/tick) pub={} fail={} \
                     queued={} dropped={} overrides={} presses={}",
                    m.iterations,
                    m.sensor_ticks,
                    m.climate_faults,
                    m.motion_faults,
                    m.faults_per_tick(),
                    m.published,
                    m.publish_failures,
                    m.queued,
                    m.queue_dropped,
                    m.overrides_received,
                    m.button_presses,
                );
            }
        }
    }
}
