//! Runtime diagnostics.
//!
//! Counters the control loop bumps as it runs. Nothing here is persisted;
//! the snapshot is logged periodically and on demand.

use serde::Serialize;

/// Cumulative counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeMetrics {
    /// Scheduler passes through `ControlLoop::run_iteration`.
    pub iterations: u64,
    /// Sensor ticks executed (Active mode only).
    pub sensor_ticks: u64,
    /// Climate reads that came back invalid.
    pub climate_faults: u32,
    /// Motion reads that came back invalid.
    pub motion_faults: u32,
    /// Messages handed to the broker successfully (direct or drained).
    pub published: u64,
    /// Publish attempts the link rejected.
    pub publish_failures: u32,
    /// Messages routed into the offline queue.
    pub queued: u64,
    /// Messages evicted from a full offline queue.
    pub queue_dropped: u32,
    /// Remote actuator commands applied.
    pub overrides_received: u32,
    /// Debounced button presses.
    pub button_presses: u32,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalid reads per sensor tick, both sensors counted.
    pub fn faults_per_tick(&self) -> f32 {
        if self.sensor_ticks == 0 {
            return 0.0;
        }
        self.climate_faults.saturating_add(self.motion_faults) as f32 / self.sensor_ticks as f32
    }
}
