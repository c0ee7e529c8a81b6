//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns the configuration and a single `ControlLoopState`
//! that is threaded through every pass. All I/O flows through port traits
//! injected at call sites, so the whole loop runs against mocks on the host.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   InputPort ──▶ │         ControlLoop           │
//! ActuatorPort ◀──│ alerts · arbiter · debouncer  │◀──▶ LinkPort
//! CommandInbox ──▶│ offline queue                 │
//!                 └──────────────────────────────┘
//! ```
//!
//! ## One scheduler pass
//!
//! 1. Let the link run its reconnection policy.
//! 2. Apply queued remote commands.
//! 3. Debounce the button; a press toggles Active ↔ Paused.
//! 4. Paused: hold the output off and stop.
//! 5. Active and the sensor interval has elapsed: read → evaluate →
//!    arbitrate → actuate → publish → drain backlog.

use log::{debug, info, warn};

use crate::alerts::{self, AlertState, AlertThresholds};
use crate::config::{ConfigError, SystemConfig};
use crate::control::arbiter::{ArbiterMode, OverrideArbiter};
use crate::diagnostics::RuntimeMetrics;
use crate::drivers::button::InputDebouncer;
use crate::queue::OfflineQueue;
use crate::sensors::{ClimateSample, MotionSample};
use crate::telemetry::{self, Payload, Topic};

use super::commands::RemoteCommand;
use super::events::{AppEvent, TickReport};
use super::inbox::CommandInbox;
use super::ports::{ActuatorPort, EventSink, InputPort, LinkPort, SensorPort};

// ───────────────────────────────────────────────────────────────
// Mode
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal sampling and actuation.
    Active,
    /// Operator-requested low-duty mode: no sampling, no publishing,
    /// output held off.
    Paused,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused => Self::Active,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// Everything the loop remembers between passes.
struct ControlLoopState {
    mode: Mode,
    alerts: AlertState,
    /// `None` until the first sensor tick, which then runs immediately.
    last_sample_at_ms: Option<u64>,
    /// Level last written to the indicator.
    actuator_on: bool,
    arbiter: OverrideArbiter,
    button: InputDebouncer,
    queue: OfflineQueue,
    metrics: RuntimeMetrics,
}

impl ControlLoopState {
    fn new(config: &SystemConfig) -> Self {
        Self {
            mode: Mode::Active,
            alerts: AlertState::default(),
            last_sample_at_ms: None,
            actuator_on: false,
            arbiter: OverrideArbiter::new(config.override_window_ms),
            button: InputDebouncer::new(config.button_active_low, config.debounce_ms),
            queue: OfflineQueue::new(config.queue_capacity),
            metrics: RuntimeMetrics::new(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

/// Stack given to the task that owns and runs the [`ControlLoop`].
pub const CONTROL_TASK_STACK_BYTES: usize = 16 * 1024;

pub struct ControlLoop {
    config: SystemConfig,
    thresholds: AlertThresholds,
    state: ControlLoopState,
}

impl ControlLoop {
    /// Validate the configuration and build the initial state.
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = AlertThresholds::from(&config);
        let state = ControlLoopState::new(&config);
        Ok(Self {
            config,
            thresholds,
            state,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the output in a known state and announce the start.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.set_indicator(false);
        self.state.actuator_on = false;
        sink.emit(&AppEvent::Started(self.state.mode));
        info!(
            "ControlLoop started in {:?} (interval {}ms, override {}ms, queue {})",
            self.state.mode,
            self.config.sensor_interval_ms,
            self.config.override_window_ms,
            self.state.queue.capacity()
        );
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// Run one scheduler pass.
    ///
    /// `hw` satisfies the sensor, actuator, and input ports together,
    /// which avoids juggling several mutable borrows of one board.
    pub fn run_iteration<H, L>(
        &mut self,
        now_ms: u64,
        hw: &mut H,
        link: &mut L,
        inbox: &CommandInbox,
        sink: &mut impl EventSink,
    ) where
        H: SensorPort + ActuatorPort + InputPort,
        L: LinkPort,
    {
        self.state.metrics.iterations += 1;

        // 1. Reconnection is the link's business.
        link.maintain(now_ms);

        // 2. Remote commands are accepted in both modes.
        while let Some(cmd) = inbox.pop() {
            self.handle_command(cmd, now_ms, sink);
        }

        // 3. The button is checked on every pass so a press is never
        //    missed while paused.
        self.poll_button(now_ms, hw, link, sink);

        // 4. Paused: output off, nothing else.
        if self.state.mode == Mode::Paused {
            if hw.is_indicator_on() || self.state.actuator_on {
                self.drive_actuator(hw, false, false, sink);
            }
            return;
        }

        // 5. Sensor tick on its own cadence.
        if self.sensor_tick_due(now_ms) {
            self.sensor_tick(now_ms, hw, link, sink);
        }
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(&mut self, cmd: RemoteCommand, now_ms: u64, sink: &mut impl EventSink) {
        match cmd {
            RemoteCommand::SetActuator { on } => {
                self.state.arbiter.record(on, now_ms);
                self.state.metrics.overrides_received += 1;
                info!("Remote override: indicator {}", if on { "ON" } else { "OFF" });
                sink.emit(&AppEvent::OverrideReceived { on, at_ms: now_ms });
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn alerts(&self) -> AlertState {
        self.state.alerts
    }

    pub fn actuator_on(&self) -> bool {
        self.state.actuator_on
    }

    pub fn arbiter_mode(&self, now_ms: u64) -> ArbiterMode {
        self.state.arbiter.mode(now_ms)
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.state.queue
    }

    pub fn metrics(&self) -> RuntimeMetrics {
        self.state.metrics
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Milliseconds until the next sensor tick is due (0 = due now).
    pub fn next_tick_in_ms(&self, now_ms: u64) -> u64 {
        match self.state.last_sample_at_ms {
            None => 0,
            Some(last) => {
                let interval = u64::from(self.config.sensor_interval_ms);
                interval.saturating_sub(now_ms.saturating_sub(last))
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn sensor_tick_due(&self, now_ms: u64) -> bool {
        self.next_tick_in_ms(now_ms) == 0
    }

    fn poll_button<H, L>(&mut self, now_ms: u64, hw: &mut H, link: &mut L, sink: &mut impl EventSink)
    where
        H: ActuatorPort + InputPort,
        L: LinkPort,
    {
        let level = hw.button_level();
        if self.state.button.update(level, now_ms).is_none() {
            return;
        }

        self.state.metrics.button_presses += 1;
        let from = self.state.mode;
        let to = from.toggled();
        self.state.mode = to;
        info!("Button: {:?} -> {:?}", from, to);

        if to == Mode::Paused {
            self.drive_actuator(hw, false, false, sink);
        }

        self.publish(
            link,
            Topic::AlertButton,
            telemetry::encode_mode_status(to == Mode::Paused),
            now_ms,
            sink,
        );
        sink.emit(&AppEvent::ModeChanged { from, to });
    }

    fn sensor_tick<H, L>(&mut self, now_ms: u64, hw: &mut H, link: &mut L, sink: &mut impl EventSink)
    where
        H: SensorPort + ActuatorPort,
        L: LinkPort,
    {
        let climate = hw.read_climate(now_ms);
        let motion = hw.read_motion();
        self.state.metrics.sensor_ticks += 1;

        // Evaluate, holding alerts for invalid reads.
        let previous = self.state.alerts;
        let alerts = alerts::evaluate(previous, &climate, &motion, &self.thresholds);
        self.note_faults(&climate, &motion, previous);
        if alerts != previous {
            info!(
                "Alerts: motion {} -> {}, climate {} -> {}",
                previous.motion, alerts.motion, previous.climate, alerts.climate
            );
            sink.emit(&AppEvent::AlertChanged {
                from: previous,
                to: alerts,
            });
        }
        self.state.alerts = alerts;

        // Arbitrate and actuate.
        let overridden = self.state.arbiter.mode(now_ms) == ArbiterMode::Overridden;
        let on = self.state.arbiter.decide(now_ms, alerts);
        self.drive_actuator(hw, on, overridden, sink);

        // Publish what is valid, then the alert flags.
        if climate.valid {
            self.publish_encoded(link, Topic::Temperature, telemetry::encode_decimal(climate.temperature_c), now_ms, sink);
            self.publish_encoded(link, Topic::Humidity, telemetry::encode_decimal(climate.humidity_pct), now_ms, sink);
        }
        if motion.valid {
            self.publish_encoded(link, Topic::Motion, telemetry::encode_motion(&motion), now_ms, sink);
        }
        self.publish(link, Topic::AlertMotion, telemetry::encode_flag(alerts.motion), now_ms, sink);
        self.publish(link, Topic::AlertClimate, telemetry::encode_flag(alerts.climate), now_ms, sink);

        // Replay anything buffered while the link was down.
        self.drain_backlog(link, sink);

        self.state.last_sample_at_ms = Some(now_ms);

        sink.emit(&AppEvent::Tick(TickReport {
            at_ms: now_ms,
            temperature_c: climate.valid.then_some(climate.temperature_c),
            humidity_pct: climate.valid.then_some(climate.humidity_pct),
            motion_valid: motion.valid,
            alerts,
            actuator_on: on,
            overridden,
            link_up: link.is_connected(),
            queued: self.state.queue.len(),
        }));
    }

    fn note_faults(&mut self, climate: &ClimateSample, motion: &MotionSample, held: AlertState) {
        if !climate.valid {
            self.state.metrics.climate_faults += 1;
            warn!("Climate read invalid; holding climate alert={}", held.climate);
        }
        if !motion.valid {
            self.state.metrics.motion_faults += 1;
            warn!("Motion read invalid; holding motion alert={}", held.motion);
        }
    }

    fn drive_actuator(
        &mut self,
        hw: &mut impl ActuatorPort,
        on: bool,
        overridden: bool,
        sink: &mut impl EventSink,
    ) {
        hw.set_indicator(on);
        if self.state.actuator_on != on {
            self.state.actuator_on = on;
            debug!("Indicator {} (override={})", on, overridden);
            sink.emit(&AppEvent::ActuatorChanged { on, overridden });
        }
    }

    fn publish_encoded(
        &mut self,
        link: &mut impl LinkPort,
        topic: Topic,
        encoded: Result<Payload, crate::error::CommsError>,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) {
        match encoded {
            Ok(payload) => self.publish(link, topic, payload, now_ms, sink),
            Err(e) => warn!("Skipping {}: {}", topic, e),
        }
    }

    /// Route one message: straight to the broker when the link is up and
    /// nothing older is waiting, otherwise behind the backlog.
    fn publish(
        &mut self,
        link: &mut impl LinkPort,
        topic: Topic,
        payload: Payload,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) {
        if link.is_connected() && self.state.queue.is_empty() {
            match link.publish(topic.as_str(), &payload) {
                Ok(()) => {
                    self.state.metrics.published += 1;
                    return;
                }
                Err(e) => {
                    self.state.metrics.publish_failures += 1;
                    warn!("Publish {} failed ({}), buffering", topic, e);
                }
            }
        }
        self.enqueue(topic, payload, now_ms, sink);
    }

    fn enqueue(&mut self, topic: Topic, payload: Payload, now_ms: u64, sink: &mut impl EventSink) {
        self.state.metrics.queued += 1;
        if let Some(evicted) = self.state.queue.enqueue(topic, payload, now_ms) {
            self.state.metrics.queue_dropped += 1;
            sink.emit(&AppEvent::QueueOverflow {
                dropped_topic: evicted.topic,
                total_dropped: self.state.queue.dropped(),
            });
        }
    }

    fn drain_backlog(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        if self.state.queue.is_empty() || !link.is_connected() {
            return;
        }

        let mut failures = 0;
        let delivered = self.state.queue.drain(|topic, payload| {
            match link.publish(topic.as_str(), payload) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Replay of {} failed ({}), will retry", topic, e);
                    failures += 1;
                    false
                }
            }
        });

        self.state.metrics.published += delivered as u64;
        self.state.metrics.publish_failures += failures;
        if delivered > 0 {
            let remaining = self.state.queue.len();
            info!("Replayed {} buffered messages ({} left)", delivered, remaining);
            sink.emit(&AppEvent::QueueDrained {
                delivered,
                remaining,
            });
        }
    }
}
