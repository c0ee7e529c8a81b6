//! MQTT broker link.
//!
//! Implements [`LinkPort`] on top of a [`ConnectivityPort`]. The link is up
//! only when both WiFi and the broker session are.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//!   The client runs on its own task and reconnects by itself every
//!   `reconnect_delay_ms`; its callback only flips flags and hands inbound
//!   messages to the [`CommandInbox`].
//! - **all other targets**: an in-memory broker for host-side tests.
//!
//! ## Subscriptions
//!
//! `actuator/led` is (re)subscribed from [`LinkPort::maintain`] after every
//! broker `Connected` event, since a clean session forgets it.

use log::{info, warn};

#[cfg(target_os = "espidf")]
use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::inbox::CommandInbox;
use crate::app::ports::LinkPort;
use crate::config::NetworkConfig;
use crate::error::CommsError;
use crate::telemetry::{MAX_PAYLOAD_LEN, Topic};

use super::device_id::{self, ClientId};
use super::wifi::ConnectivityPort;

/// Hand one inbound broker message to the control loop.
fn on_inbound(inbox: &CommandInbox, topic: Option<&str>, data: &[u8]) {
    match topic {
        Some(topic) => {
            if !inbox.deliver(topic, data) {
                warn!("MQTT: message on '{}' not queued", topic);
            }
        }
        None => warn!("MQTT: message without topic ({} bytes) ignored", data.len()),
    }
}

// ───────────────────────────────────────────────────────────────
// Broker session (platform)
// ───────────────────────────────────────────────────────────────

/// Flags written by the client task, read by the loop.
#[cfg(target_os = "espidf")]
#[derive(Default)]
struct SessionFlags {
    connected: AtomicBool,
    resubscribe: AtomicBool,
}

#[cfg(target_os = "espidf")]
struct Session {
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    flags: Arc<SessionFlags>,
}

#[cfg(target_os = "espidf")]
impl Session {
    fn new() -> Self {
        Self {
            client: None,
            flags: Arc::new(SessionFlags::default()),
        }
    }
}

/// Host-side broker: records publishes, can be taken down.
#[cfg(not(target_os = "espidf"))]
struct Session {
    started: bool,
    broker_up: bool,
    resubscribe: bool,
    fail_next: u32,
    fail_starts: u32,
    start_attempts: u32,
    subscriptions: u32,
    published: Vec<(String, Vec<u8>)>,
}

#[cfg(not(target_os = "espidf"))]
impl Session {
    fn new() -> Self {
        Self {
            started: false,
            broker_up: true,
            resubscribe: false,
            fail_next: 0,
            fail_starts: 0,
            start_attempts: 0,
            subscriptions: 0,
            published: Vec::new(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// MqttLink
// ───────────────────────────────────────────────────────────────

pub struct MqttLink<W> {
    wifi: W,
    broker_url: heapless::String<96>,
    client_id: ClientId,
    reconnect_delay_ms: u32,
    inbox: &'static CommandInbox,
    session: Session,
    /// Earliest time a failed session start may be attempted again.
    session_retry_at_ms: Option<u64>,
}

impl<W: ConnectivityPort> MqttLink<W> {
    /// The broker session is opened lazily, the first time WiFi is up.
    pub fn new(
        wifi: W,
        network: &NetworkConfig,
        reconnect_delay_ms: u32,
        inbox: &'static CommandInbox,
    ) -> Self {
        let client_id = device_id::client_id(&network.client_id_prefix, &device_id::read_mac());
        info!("MQTT: client id '{}', broker {}", client_id, network.broker_url);
        Self {
            wifi,
            broker_url: network.broker_url.clone(),
            client_id,
            reconnect_delay_ms,
            inbox,
            session: Session::new(),
            session_retry_at_ms: None,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn session_started(&self) -> bool {
        self.session.client.is_some()
    }

    #[cfg(target_os = "espidf")]
    fn start_session(&mut self) -> Result<(), CommsError> {
        use core::time::Duration;
        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            reconnect_timeout: Some(Duration::from_millis(u64::from(self.reconnect_delay_ms))),
            ..Default::default()
        };
        let flags = Arc::clone(&self.session.flags);
        let inbox = self.inbox;
        let client = EspMqttClient::new_cb(self.broker_url.as_str(), &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    flags.connected.store(true, Ordering::Release);
                    flags.resubscribe.store(true, Ordering::Release);
                    info!("MQTT: connected");
                }
                EventPayload::Disconnected => {
                    flags.connected.store(false, Ordering::Release);
                    warn!("MQTT: disconnected, client will retry");
                }
                EventPayload::Received { topic, data, .. } => on_inbound(inbox, topic, data),
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            CommsError::NotConnected
        })?;
        self.session.client = Some(client);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn session_connected(&self) -> bool {
        self.session.flags.connected.load(Ordering::Acquire)
    }

    #[cfg(target_os = "espidf")]
    fn take_resubscribe(&mut self) -> bool {
        self.session.flags.resubscribe.swap(false, Ordering::AcqRel)
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.session.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe '{}' failed: {}", topic, e);
                CommsError::SubscribeFailed
            })
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.session.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish '{}' failed: {}", topic, e);
                CommsError::PublishFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn session_started(&self) -> bool {
        self.session.started
    }

    #[cfg(not(target_os = "espidf"))]
    fn start_session(&mut self) -> Result<(), CommsError> {
        info!(
            "MQTT(sim): session to {} as '{}' (retry {}ms)",
            self.broker_url, self.client_id, self.reconnect_delay_ms
        );
        self.session.start_attempts += 1;
        if self.session.fail_starts > 0 {
            self.session.fail_starts -= 1;
            return Err(CommsError::NotConnected);
        }
        self.session.started = true;
        self.session.resubscribe = self.session.broker_up;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn session_connected(&self) -> bool {
        self.session.started && self.session.broker_up
    }

    #[cfg(not(target_os = "espidf"))]
    fn take_resubscribe(&mut self) -> bool {
        core::mem::take(&mut self.session.resubscribe)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, _topic: &str) -> Result<(), CommsError> {
        self.session.subscriptions += 1;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if self.session.fail_next > 0 {
            self.session.fail_next -= 1;
            return Err(CommsError::PublishFailed);
        }
        self.session.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Take the simulated broker down or bring it back. Coming back
    /// behaves like a `Connected` event.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_broker_up(&mut self, up: bool) {
        if up && !self.session.broker_up {
            self.session.resubscribe = true;
        }
        self.session.broker_up = up;
    }

    /// Make the next `n` publishes fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_publishes(&mut self, n: u32) {
        self.session.fail_next = n;
    }

    /// Make the next `n` session starts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_session_starts(&mut self, n: u32) {
        self.session.fail_starts = n;
    }

    /// Session starts attempted so far, failed ones included.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_session_attempts(&self) -> u32 {
        self.session.start_attempts
    }

    /// Everything the simulated broker accepted, in order.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.session.published
    }

    /// How many times `actuator/led` was subscribed.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_subscriptions(&self) -> u32 {
        self.session.subscriptions
    }

    /// Inject a message as if the broker had delivered it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_receive(&self, topic: &str, payload: &[u8]) {
        on_inbound(self.inbox, Some(topic), payload);
    }
}

impl<W: ConnectivityPort> LinkPort for MqttLink<W> {
    fn is_connected(&self) -> bool {
        self.wifi.is_connected() && self.session_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(CommsError::PayloadTooLarge);
        }
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        self.platform_publish(topic, payload)
    }

    fn maintain(&mut self, now_ms: u64) {
        self.wifi.maintain(now_ms);
        if !self.wifi.is_connected() {
            return;
        }

        if !self.session_started() {
            if self.session_retry_at_ms.is_some_and(|at| now_ms < at) {
                return;
            }
            if let Err(e) = self.start_session() {
                let retry_at = now_ms + u64::from(self.reconnect_delay_ms);
                warn!("MQTT: {}, next session attempt at {}ms", e, retry_at);
                self.session_retry_at_ms = Some(retry_at);
                return;
            }
            self.session_retry_at_ms = None;
        }

        if self.session_connected() && self.take_resubscribe() {
            let topic = Topic::ActuatorLed.as_str();
            match self.platform_subscribe(topic) {
                Ok(()) => info!("MQTT: subscribed to '{}'", topic),
                // Retry on the next pass.
                Err(_) => self.mark_resubscribe(),
            }
        }
    }
}

impl<W> MqttLink<W> {
    #[cfg(target_os = "espidf")]
    fn mark_resubscribe(&mut self) {
        self.session.flags.resubscribe.store(true, Ordering::Release);
    }

    #[cfg(not(target_os = "espidf"))]
    fn mark_resubscribe(&mut self) {
        self.session.resubscribe = true;
    }
}
