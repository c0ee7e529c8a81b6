//! Application core: pure domain logic, zero I/O.
//!
//! Business rules for the monitoring node: alert evaluation, override
//! arbitration, button-driven pause, and publish routing through the
//! offline queue. All interaction with hardware and the broker happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod inbox;
pub mod ports;
pub mod service;
