//! Integration tests for the ControlLoop → ports pipeline.
//!
//! Drive `run_iteration` with mock hardware, a mock broker link and a
//! recording sink, and check what reaches the indicator and the broker.

use super::mock_hw::{MockHardware, MockLink, RecordingSink};

use envwatch::app::commands::RemoteCommand;
use envwatch::app::events::AppEvent;
use envwatch::app::inbox::CommandInbox;
use envwatch::app::service::{ControlLoop, Mode};
use envwatch::config::SystemConfig;
use envwatch::control::arbiter::ArbiterMode;
use envwatch::sensors::{ClimateSample, MotionSample};
use envwatch::telemetry::{STATUS_PAUSED, STATUS_RESUMED, Topic};

const TICK_TOPICS: [&str; 5] = [
    "sensor/temperature",
    "sensor/humidity",
    "sensor/motion",
    "alert/motion",
    "alert/climate",
];

struct Rig {
    control: ControlLoop,
    hw: MockHardware,
    link: MockLink,
    inbox: CommandInbox,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    fn with_config(config: SystemConfig) -> Self {
        let mut control = ControlLoop::new(config).unwrap();
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        control.start(&mut hw, &mut sink);
        Self {
            control,
            hw,
            link: MockLink::up(),
            inbox: CommandInbox::new(),
            sink,
        }
    }

    fn step(&mut self, now_ms: u64) {
        self.control
            .run_iteration(now_ms, &mut self.hw, &mut self.link, &self.inbox, &mut self.sink);
    }

    fn command(&self, on: bool) {
        assert!(self.inbox.push(RemoteCommand::SetActuator { on }));
    }

    /// Hold the button long enough to register one press.
    fn click(&mut self, at_ms: u64) {
        self.hw.press();
        self.step(at_ms);
        self.step(at_ms + 60);
        self.hw.release();
        self.step(at_ms + 100);
        self.step(at_ms + 200);
    }
}

// ── Startup and cadence ───────────────────────────────────────

#[test]
fn start_forces_indicator_off_and_announces_mode() {
    let rig = Rig::new();
    assert_eq!(rig.hw.indicator_writes, vec![false]);
    assert_eq!(rig.sink.events.first(), Some(&AppEvent::Started(Mode::Active)));
}

#[test]
fn first_tick_runs_immediately_and_publishes_every_topic() {
    let mut rig = Rig::new();
    rig.step(0);

    assert_eq!(rig.link.topics(), TICK_TOPICS);
    assert_eq!(rig.link.payloads_on("sensor/temperature"), ["21.00"]);
    assert_eq!(rig.link.payloads_on("sensor/humidity"), ["45.00"]);
    assert_eq!(
        rig.link.payloads_on("sensor/motion"),
        [r#"{"AcX":120,"AcY":-340,"AcZ":16384,"GyX":10,"GyY":-5,"GyZ":3}"#]
    );
    assert_eq!(rig.link.payloads_on("alert/motion"), ["0"]);
    assert_eq!(rig.link.payloads_on("alert/climate"), ["0"]);
}

#[test]
fn sensor_tick_respects_interval() {
    let mut rig = Rig::new();
    rig.step(0);
    rig.step(10);
    rig.step(4_999);
    assert_eq!(rig.hw.climate_reads, 1);
    assert_eq!(rig.control.next_tick_in_ms(4_999), 1);

    rig.step(5_000);
    assert_eq!(rig.hw.climate_reads, 2);
    assert_eq!(rig.hw.motion_reads, 2);
}

#[test]
fn link_is_maintained_every_pass() {
    let mut rig = Rig::new();
    rig.step(0);
    rig.step(10);
    rig.step(20);
    assert_eq!(rig.link.maintained_at, vec![0, 10, 20]);
    assert_eq!(rig.control.metrics().iterations, 3);
}

// ── Alerts ────────────────────────────────────────────────────

#[test]
fn hot_then_normal_climate_drives_indicator() {
    let mut rig = Rig::new();

    rig.hw.set_climate(30.0, 40.0);
    rig.step(0);
    assert!(rig.control.alerts().climate);
    assert!(rig.hw.indicator);

    rig.hw.set_climate(20.0, 40.0);
    rig.step(5_000);
    assert!(!rig.control.alerts().climate);
    assert!(!rig.hw.indicator);

    assert_eq!(rig.link.payloads_on("alert/climate"), ["1", "0"]);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::AlertChanged { .. })),
        2
    );
}

#[test]
fn humid_air_raises_climate_alert() {
    let mut rig = Rig::new();
    rig.hw.set_climate(22.0, 85.0);
    rig.step(0);
    assert!(rig.control.alerts().climate);
    assert!(!rig.control.alerts().motion);
}

#[test]
fn motion_threshold_is_exclusive() {
    let mut rig = Rig::new();
    rig.hw.motion = MotionSample::new([18_000, 0, 0], [0, 0, 0]);
    rig.step(0);
    assert!(!rig.control.alerts().motion);

    rig.hw.motion = MotionSample::new([0, -18_001, 0], [0, 0, 0]);
    rig.step(5_000);
    assert!(rig.control.alerts().motion);
    assert!(rig.hw.indicator);
    assert_eq!(rig.link.payloads_on("alert/motion"), ["0", "1"]);
}

#[test]
fn invalid_climate_holds_alert_and_skips_its_metrics() {
    let mut rig = Rig::new();
    rig.hw.set_climate(30.0, 40.0);
    rig.step(0);

    rig.hw.climate = ClimateSample::invalid();
    rig.step(5_000);

    assert!(rig.control.alerts().climate, "alert held on a failed read");
    assert!(rig.hw.indicator);
    assert_eq!(rig.link.payloads_on("sensor/temperature"), ["30.00"]);
    assert_eq!(rig.link.payloads_on("sensor/humidity"), ["40.00"]);
    assert_eq!(rig.link.payloads_on("alert/climate"), ["1", "1"]);
    assert_eq!(rig.control.metrics().climate_faults, 1);
}

#[test]
fn invalid_motion_is_not_published() {
    let mut rig = Rig::new();
    rig.hw.motion = MotionSample::invalid();
    rig.step(0);
    assert!(rig.link.payloads_on("sensor/motion").is_empty());
    assert_eq!(rig.link.payloads_on("alert/motion"), ["0"]);
    assert_eq!(rig.control.metrics().motion_faults, 1);
}

// ── Remote override ───────────────────────────────────────────

#[test]
fn override_governs_for_its_window_then_expires() {
    let mut rig = Rig::new();

    rig.command(true);
    rig.step(0);
    assert!(rig.hw.indicator, "override on at t=0");
    assert_eq!(rig.control.arbiter_mode(0), ArbiterMode::Overridden);

    rig.step(5_000);
    assert!(rig.hw.indicator, "still inside the window at 5s");

    rig.step(11_000);
    assert!(!rig.hw.indicator, "automatic again at 11s");
    assert_eq!(rig.control.arbiter_mode(11_000), ArbiterMode::Automatic);
}

#[test]
fn unrecognised_payload_does_not_extend_the_window() {
    let mut rig = Rig::new();
    rig.command(true);
    rig.step(0);

    assert!(!rig.inbox.deliver("actuator/led", b"toggle"));
    rig.step(5_000);
    assert!(rig.hw.indicator);

    rig.step(11_000);
    assert!(!rig.hw.indicator, "window still measured from t=0");
    assert_eq!(rig.control.arbiter_mode(11_000), ArbiterMode::Automatic);
    assert_eq!(rig.control.metrics().overrides_received, 1);
}

#[test]
fn override_off_beats_active_alert() {
    let mut rig = Rig::new();
    rig.hw.set_climate(35.0, 40.0);
    rig.command(false);
    rig.step(0);

    assert!(rig.control.alerts().climate);
    assert!(!rig.hw.indicator);
    assert_eq!(rig.link.payloads_on("alert/climate"), ["1"]);
    assert!(rig.sink.events.contains(&AppEvent::OverrideReceived { on: false, at_ms: 0 }));
}

#[test]
fn later_command_replaces_earlier_one() {
    let mut rig = Rig::new();
    rig.command(true);
    rig.step(0);
    rig.command(false);
    rig.step(5_000);
    assert!(!rig.hw.indicator);
    assert_eq!(rig.control.metrics().overrides_received, 2);
}

// ── Offline queue ─────────────────────────────────────────────

#[test]
fn outage_is_buffered_and_replayed_in_order() {
    let mut rig = Rig::new();
    rig.link = MockLink::down();

    for (i, t) in [0, 5_000, 10_000].into_iter().enumerate() {
        rig.hw.set_climate(21.0 + i as f32, 45.0);
        rig.step(t);
    }
    assert!(rig.link.published.is_empty());
    assert_eq!(rig.control.queue().len(), 15);

    rig.link.connected = true;
    rig.hw.set_climate(24.0, 45.0);
    rig.step(15_000);

    assert!(rig.control.queue().is_empty());
    assert_eq!(rig.link.published.len(), 20);
    assert_eq!(
        rig.link.payloads_on("sensor/temperature"),
        ["21.00", "22.00", "23.00", "24.00"]
    );
    let expected: Vec<&str> = TICK_TOPICS.iter().copied().cycle().take(20).collect();
    assert_eq!(rig.link.topics(), expected);
    assert!(rig.sink.events.contains(&AppEvent::QueueDrained {
        delivered: 20,
        remaining: 0
    }));
}

#[test]
fn failed_drain_keeps_remainder_for_next_tick() {
    let mut rig = Rig::new();
    rig.link = MockLink::down();
    rig.step(0);

    rig.link.connected = true;
    rig.link.fail_next = 1;
    rig.hw.set_climate(22.0, 45.0);
    rig.step(5_000);
    assert!(rig.link.published.is_empty());
    assert_eq!(rig.control.queue().len(), 10);
    assert_eq!(rig.control.metrics().publish_failures, 1);

    rig.hw.set_climate(23.0, 45.0);
    rig.step(10_000);
    assert!(rig.control.queue().is_empty());
    assert_eq!(
        rig.link.payloads_on("sensor/temperature"),
        ["21.00", "22.00", "23.00"]
    );
}

#[test]
fn failed_direct_publish_goes_behind_and_keeps_order() {
    let mut rig = Rig::new();
    rig.link.fail_next = 1;
    rig.step(0);

    // Temperature bounced, the rest queued behind it, drain flushed all.
    assert_eq!(rig.link.topics(), TICK_TOPICS);
    assert!(rig.control.queue().is_empty());
    assert_eq!(rig.control.metrics().publish_failures, 1);
    assert_eq!(rig.control.metrics().published, 5);
}

#[test]
fn full_queue_evicts_oldest() {
    let config = SystemConfig {
        queue_capacity: 4,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.link = MockLink::down();
    rig.step(0);

    assert_eq!(rig.control.queue().len(), 4);
    let topics: Vec<Topic> = rig.control.queue().iter().map(|m| m.topic).collect();
    assert_eq!(
        topics,
        [Topic::Humidity, Topic::Motion, Topic::AlertMotion, Topic::AlertClimate]
    );
    assert_eq!(rig.control.metrics().queue_dropped, 1);
    assert!(rig.sink.events.contains(&AppEvent::QueueOverflow {
        dropped_topic: Topic::Temperature,
        total_dropped: 1
    }));
}

// ── Button / pause ────────────────────────────────────────────

#[test]
fn button_pauses_and_resumes_sampling() {
    let mut rig = Rig::new();
    rig.hw.set_climate(30.0, 40.0);
    rig.step(0);
    assert!(rig.hw.indicator);

    rig.click(1_000);
    assert_eq!(rig.control.mode(), Mode::Paused);
    assert!(!rig.hw.indicator, "pausing switches the output off");
    assert_eq!(rig.link.payloads_on("alert/button"), [STATUS_PAUSED]);

    rig.step(5_000);
    rig.step(10_000);
    assert_eq!(rig.hw.climate_reads, 1, "no sampling while paused");
    assert_eq!(rig.link.payloads_on("sensor/temperature").len(), 1);

    rig.click(12_000);
    assert_eq!(rig.control.mode(), Mode::Active);
    assert_eq!(rig.link.payloads_on("alert/button"), [STATUS_PAUSED, STATUS_RESUMED]);
    // The resume pass itself was already past the interval.
    assert_eq!(rig.hw.climate_reads, 2);
    assert!(rig.hw.indicator);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ModeChanged { .. })),
        2
    );
}

#[test]
fn commands_are_accepted_while_paused_but_output_stays_off() {
    let mut rig = Rig::new();
    rig.step(0);
    rig.click(100);
    assert_eq!(rig.control.mode(), Mode::Paused);

    rig.command(true);
    rig.step(400);
    assert!(!rig.hw.indicator);
    assert_eq!(rig.control.metrics().overrides_received, 1);

    // Resume inside the override window: the command now applies.
    rig.click(1_000);
    rig.step(5_000);
    assert!(rig.hw.indicator);
}

#[test]
fn held_button_at_boot_is_one_press() {
    let mut rig = Rig::new();
    rig.hw.press();
    for t in (0..2_000).step_by(10) {
        rig.step(t);
    }
    assert_eq!(rig.control.mode(), Mode::Paused);
    assert_eq!(rig.control.metrics().button_presses, 1);
}

#[test]
fn bounce_shorter_than_window_is_ignored() {
    let mut rig = Rig::new();
    for (i, t) in (0..400).step_by(10).enumerate() {
        if i % 2 == 0 {
            rig.hw.press();
        } else {
            rig.hw.release();
        }
        rig.step(t);
    }
    assert_eq!(rig.control.mode(), Mode::Active);
    assert_eq!(rig.control.metrics().button_presses, 0);
}

#[test]
fn status_text_is_buffered_while_offline() {
    let mut rig = Rig::new();
    rig.link = MockLink::down();
    rig.step(0);
    rig.click(100);

    let last = rig.control.queue().iter().last().map(|m| m.topic);
    assert_eq!(last, Some(Topic::AlertButton));
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn inverted_temperature_bounds_are_rejected() {
    let config = SystemConfig {
        temp_min_c: 30.0,
        temp_max_c: 20.0,
        ..SystemConfig::default()
    };
    assert!(ControlLoop::new(config).is_err());
}
