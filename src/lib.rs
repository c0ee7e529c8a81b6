//! EnvWatch firmware library.
//!
//! Environmental monitoring node: climate and motion sampling, threshold
//! alerts, a single indicator output with remote override, and MQTT
//! telemetry with an offline backlog.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod alerts;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod queue;
pub mod telemetry;

pub mod pins;

// Hardware-facing layers. Real implementations are cfg-guarded inside;
// host builds get simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod sensors;
