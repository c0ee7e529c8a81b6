//! End-to-end tests of the control loop over the simulated WiFi + MQTT
//! stack instead of a mock link.

use super::mock_hw::{FakeClock, MockHardware, RecordingSink};

use envwatch::adapters::mqtt::MqttLink;
use envwatch::adapters::wifi::{ConnectivityPort, WifiAdapter};
use envwatch::app::inbox::CommandInbox;
use envwatch::app::ports::{Clock, LinkPort};
use envwatch::app::service::ControlLoop;
use envwatch::config::{NetworkConfig, SystemConfig};

struct Node {
    control: ControlLoop,
    hw: MockHardware,
    link: MqttLink<WifiAdapter>,
    inbox: &'static CommandInbox,
    sink: RecordingSink,
    clock: FakeClock,
}

impl Node {
    fn boot() -> Self {
        let config = SystemConfig::default();
        let network =
            NetworkConfig::new("FieldNet", "hunter2hunter2", "mqtt://10.0.0.2:1883", "EnvWatch")
                .unwrap();
        let inbox: &'static CommandInbox = Box::leak(Box::new(CommandInbox::new()));
        let clock = FakeClock::at(0);

        let mut wifi = WifiAdapter::new(config.reconnect_delay_ms);
        wifi.set_credentials(&network.wifi_ssid, &network.wifi_password)
            .unwrap();
        wifi.connect(clock.now_ms()).unwrap();
        let link = MqttLink::new(wifi, &network, config.reconnect_delay_ms, inbox);

        let mut control = ControlLoop::new(config).unwrap();
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        control.start(&mut hw, &mut sink);

        Self {
            control,
            hw,
            link,
            inbox,
            sink,
            clock,
        }
    }

    /// Run passes every 10 ms for `ms` milliseconds.
    fn run_for(&mut self, ms: u64) {
        let end = self.clock.now_ms() + ms;
        while self.clock.now_ms() < end {
            self.control.run_iteration(
                self.clock.now_ms(),
                &mut self.hw,
                &mut self.link,
                self.inbox,
                &mut self.sink,
            );
            self.clock.advance(10);
        }
    }

    fn temperatures(&self) -> Vec<String> {
        self.link
            .sim_published()
            .iter()
            .filter(|(t, _)| t == "sensor/temperature")
            .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}

#[test]
fn boots_connects_and_subscribes() {
    let mut node = Node::boot();
    node.run_for(10);

    assert!(node.link.is_connected());
    assert_eq!(node.link.sim_subscriptions(), 1);
    assert_eq!(node.link.sim_published().len(), 5);
}

#[test]
fn wifi_drop_is_ridden_out_without_loss() {
    let mut node = Node::boot();
    node.run_for(100);

    node.link.wifi_mut().sim_fail_next(1);
    node.link.wifi_mut().sim_drop_link();
    node.hw.set_climate(22.0, 45.0);
    // Loss at 100ms, failed retry, next attempt 5s later.
    node.run_for(5_000);
    assert!(!node.link.is_connected());
    assert_eq!(node.control.queue().len(), 5);

    node.hw.set_climate(23.0, 45.0);
    node.run_for(5_100);
    assert!(node.link.is_connected());
    assert!(node.control.queue().is_empty());
    assert_eq!(node.temperatures(), ["21.00", "22.00", "23.00"]);
}

#[test]
fn broker_outage_buffers_until_session_returns() {
    let mut node = Node::boot();
    node.run_for(100);

    node.link.sim_set_broker_up(false);
    node.run_for(5_000);
    assert_eq!(node.control.queue().len(), 5);

    node.link.sim_set_broker_up(true);
    node.run_for(5_000);
    assert!(node.control.queue().is_empty());
    assert_eq!(node.link.sim_published().len(), 15);
    assert_eq!(node.link.sim_subscriptions(), 2);
}

#[test]
fn inbound_command_reaches_indicator() {
    let mut node = Node::boot();
    node.run_for(10);
    assert!(!node.hw.indicator);

    node.link.sim_receive("actuator/led", b"1");
    node.run_for(5_000);
    assert!(node.hw.indicator);

    node.link.sim_receive("actuator/led", b"toggle");
    node.run_for(10_000);
    assert!(!node.hw.indicator, "bad payload does not extend the window");
}

#[test]
fn wifi_reports_state_through_link() {
    let mut node = Node::boot();
    node.run_for(10);
    assert!(node.link.wifi().is_connected());
    node.link.wifi_mut().disconnect();
    node.run_for(10);
    assert!(!node.link.is_connected());
}
