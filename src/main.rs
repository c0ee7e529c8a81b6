//! EnvWatch Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter          LogEventSink    Esp32TimeAdapter     │
//! │  (Sensor+Actuator+Input)  (EventSink)     (Clock)              │
//! │  MqttLink<WifiAdapter>    CommandInbox ◀── MQTT client task    │
//! │  (LinkPort)                                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  Alerts · Override arbiter · Debounce · Offline queue  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Build-time configuration:
//! - `ENVWATCH_CONFIG_JSON`: partial `SystemConfig` JSON over the defaults.
//! - `ENVWATCH_WIFI_SSID`, `ENVWATCH_WIFI_PASSWORD`, `ENVWATCH_BROKER_URL`,
//!   `ENVWATCH_CLIENT_PREFIX`: network deployment settings.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use envwatch::adapters::hardware::HardwareAdapter;
use envwatch::adapters::log_sink::LogEventSink;
use envwatch::adapters::mqtt::MqttLink;
use envwatch::adapters::time::Esp32TimeAdapter;
use envwatch::adapters::wifi::{ConnectivityPort, WifiAdapter};
use envwatch::app::events::AppEvent;
use envwatch::app::inbox::CommandInbox;
use envwatch::app::ports::{Clock, EventSink};
use envwatch::app::service::{CONTROL_TASK_STACK_BYTES, ControlLoop};
use envwatch::config::{NetworkConfig, SystemConfig};
use envwatch::drivers::indicator::Indicator;
use envwatch::drivers::watchdog::Watchdog;
use envwatch::error::Error;
use envwatch::pins;
use envwatch::sensors::SensorHub;
use envwatch::sensors::climate::Dht11;
use envwatch::sensors::motion::{MPU6050_ADDR, Mpu6050};

/// Filled by the MQTT client task, drained by the control loop.
static INBOX: CommandInbox = CommandInbox::new();

/// Sensor ticks between metric snapshots in the log.
const METRICS_EVERY_TICKS: u64 = 60;

fn load_config() -> Result<SystemConfig> {
    match option_env!("ENVWATCH_CONFIG_JSON") {
        Some(json) => {
            let config = SystemConfig::from_json(json).map_err(Error::from)?;
            info!("Config: overrides applied");
            Ok(config)
        }
        None => {
            info!("Config: defaults");
            Ok(SystemConfig::default())
        }
    }
}

fn load_network() -> Result<NetworkConfig> {
    let network = NetworkConfig::new(
        option_env!("ENVWATCH_WIFI_SSID").unwrap_or("EnvWatch"),
        option_env!("ENVWATCH_WIFI_PASSWORD").unwrap_or(""),
        option_env!("ENVWATCH_BROKER_URL").unwrap_or("mqtt://192.168.1.10:1883"),
        option_env!("ENVWATCH_CLIENT_PREFIX").unwrap_or("ESP32Client"),
    )
    .map_err(Error::from)?;
    Ok(network)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  EnvWatch v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;
    let network = load_network()?;

    // The main task stack is too small for the drivers plus the loop.
    info!("Spawning control task (stack={}KB)", CONTROL_TASK_STACK_BYTES / 1024);
    let handle = std::thread::Builder::new()
        .name("control".into())
        .stack_size(CONTROL_TASK_STACK_BYTES)
        .spawn(move || run(config, network))?;
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("control task panicked"))?
}

/// Owns the peripherals and runs the control loop. Returns only on a
/// setup failure.
fn run(config: SystemConfig, network: NetworkConfig) -> Result<()> {
    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
    let (sda, scl, dht, led, button) = unsafe {
        (
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
            AnyIOPin::new(pins::DHT_DATA_GPIO),
            AnyOutputPin::new(pins::INDICATOR_GPIO),
            AnyInputPin::new(pins::BUTTON_GPIO),
        )
    };

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let mut motion = Mpu6050::new(i2c, MPU6050_ADDR);
    if let Err(e) = motion.wake() {
        // Not fatal: reads keep failing and motion alerts hold.
        warn!("MPU-6050 wake failed: {}", e);
    }

    let mut dht_pin = PinDriver::input_output_od(dht)?;
    dht_pin.set_high()?;
    let climate = Dht11::new(dht_pin, Ets);

    let mut button_pin = PinDriver::input(button)?;
    button_pin.set_pull(if config.button_active_low { Pull::Up } else { Pull::Down })?;

    let mut hw = HardwareAdapter::new(
        SensorHub::new(motion, climate),
        Indicator::new(PinDriver::output(led)?),
        button_pin,
        config.button_active_low,
    );

    // ── 4. Network ────────────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let driver = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;
    let mut wifi = WifiAdapter::new(config.reconnect_delay_ms).with_driver(driver);
    wifi.set_credentials(&network.wifi_ssid, &network.wifi_password)
        .map_err(|e| anyhow::anyhow!("WiFi credentials: {}", e))?;
    if let Err(e) = wifi.connect(clock.now_ms()) {
        // The adapter schedules its own retry.
        error!("WiFi: initial connect failed: {}", e);
    }
    let mut link = MqttLink::new(wifi, &network, config.reconnect_delay_ms, &INBOX);

    // ── 5. Control loop ───────────────────────────────────────
    let loop_idle_ms = config.loop_idle_ms;
    let mut sink = LogEventSink::new();
    let mut control = ControlLoop::new(config).map_err(Error::from)?;
    control.start(&mut hw, &mut sink);

    let watchdog = Watchdog::default();
    let mut last_reported_tick = 0;

    info!("System ready. Entering control loop.");

    loop {
        control.run_iteration(clock.now_ms(), &mut hw, &mut link, &INBOX, &mut sink);

        let metrics = control.metrics();
        if metrics.sensor_ticks >= last_reported_tick + METRICS_EVERY_TICKS {
            last_reported_tick = metrics.sensor_ticks;
            sink.emit(&AppEvent::Metrics(metrics));
        }

        watchdog.feed();
        FreeRtos::delay_ms(loop_idle_ms);
    }
}
