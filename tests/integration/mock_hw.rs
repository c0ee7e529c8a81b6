//! Mock adapters for integration tests.
//!
//! Records every actuator write and publish so tests can assert on the
//! full history without touching GPIO or a broker.

use std::cell::Cell;

use envwatch::app::events::AppEvent;
use envwatch::app::ports::{ActuatorPort, Clock, EventSink, InputPort, LinkPort, SensorPort};
use envwatch::error::CommsError;
use envwatch::sensors::{ClimateSample, MotionSample};

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub climate: ClimateSample,
    pub motion: MotionSample,
    /// Raw button line. Idle is high (active-low wiring).
    pub button_high: bool,
    pub indicator: bool,
    pub indicator_writes: Vec<bool>,
    pub climate_reads: u32,
    pub motion_reads: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            climate: ClimateSample::new(21.0, 45.0),
            motion: still(),
            button_high: true,
            indicator: false,
            indicator_writes: Vec::new(),
            climate_reads: 0,
            motion_reads: 0,
        }
    }

    pub fn set_climate(&mut self, temperature_c: f32, humidity_pct: f32) {
        self.climate = ClimateSample::new(temperature_c, humidity_pct);
    }

    pub fn press(&mut self) {
        self.button_high = false;
    }

    pub fn release(&mut self) {
        self.button_high = true;
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

/// Sensor at rest, gravity on Z.
pub fn still() -> MotionSample {
    MotionSample::new([120, -340, 16_384], [10, -5, 3])
}

impl SensorPort for MockHardware {
    fn read_climate(&mut self, _now_ms: u64) -> ClimateSample {
        self.climate_reads += 1;
        self.climate
    }

    fn read_motion(&mut self) -> MotionSample {
        self.motion_reads += 1;
        self.motion
    }
}

impl ActuatorPort for MockHardware {
    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
        self.indicator_writes.push(on);
    }

    fn is_indicator_on(&self) -> bool {
        self.indicator
    }
}

impl InputPort for MockHardware {
    fn button_level(&mut self) -> bool {
        self.button_high
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    pub connected: bool,
    /// Publishes to reject before accepting again.
    pub fail_next: u32,
    pub published: Vec<(String, String)>,
    pub maintained_at: Vec<u64>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn up() -> Self {
        Self {
            connected: true,
            fail_next: 0,
            published: Vec::new(),
            maintained_at: Vec::new(),
        }
    }

    pub fn down() -> Self {
        Self {
            connected: false,
            ..Self::up()
        }
    }

    pub fn topics(&self) -> Vec<&str> {
        self.published.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn payloads_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl LinkPort for MockLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::NotConnected);
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(CommsError::PublishFailed);
        }
        self.published
            .push((topic.to_owned(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn maintain(&mut self, now_ms: u64) {
        self.maintained_at.push(now_ms);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── FakeClock ─────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeClock {
    now: Cell<u64>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
