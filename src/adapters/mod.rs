//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                 | Connects to                 |
//! |-------------|----------------------------|-----------------------------|
//! | `hardware`  | SensorPort, ActuatorPort,  | MPU-6050, DHT11, LED, button|
//! |             | InputPort                  |                             |
//! | `log_sink`  | EventSink                  | Serial log output           |
//! | `mqtt`      | LinkPort                   | ESP-IDF MQTT client         |
//! | `time`      | Clock                      | ESP32 system timer          |
//! | `wifi`      | ConnectivityPort           | ESP-IDF WiFi STA            |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
