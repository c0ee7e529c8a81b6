//! Manual override arbitration for the indicator output.
//!
//! A remote command governs the output for a fixed window after it
//! arrives, then control decays back to the computed alert state. The
//! mode is derived from the command age on every query; nothing else
//! is stored.

use log::debug;

use crate::alerts::AlertState;

/// The most recent remote instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideCommand {
    pub desired_on: bool,
    pub received_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterMode {
    /// Output follows `motion || climate`.
    Automatic,
    /// Output follows the last remote command.
    Overridden,
}

pub struct OverrideArbiter {
    window_ms: u64,
    /// `None` until the first command; behaves like a command received
    /// infinitely long ago.
    command: Option<OverrideCommand>,
}

impl OverrideArbiter {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms: u64::from(window_ms),
            command: None,
        }
    }

    /// Store a command unconditionally (last write wins).
    pub fn record(&mut self, desired_on: bool, now_ms: u64) {
        debug!("Override: desired_on={} at {}ms", desired_on, now_ms);
        self.command = Some(OverrideCommand {
            desired_on,
            received_at_ms: now_ms,
        });
    }

    pub fn mode(&self, now_ms: u64) -> ArbiterMode {
        match self.command {
            // A clock reading behind the command stamp counts as zero age.
            Some(cmd) if now_ms.saturating_sub(cmd.received_at_ms) < self.window_ms => {
                ArbiterMode::Overridden
            }
            _ => ArbiterMode::Automatic,
        }
    }

    /// Desired output at `now_ms` given the current alerts.
    pub fn decide(&self, now_ms: u64, alert: AlertState) -> bool {
        match (self.mode(now_ms), self.command) {
            (ArbiterMode::Overridden, Some(cmd)) => cmd.desired_on,
            _ => alert.any(),
        }
    }

    pub fn last_command(&self) -> Option<OverrideCommand> {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALM: AlertState = AlertState {
        motion: false,
        climate: false,
    };
    const ALARM: AlertState = AlertState {
        motion: true,
        climate: false,
    };

    #[test]
    fn no_command_is_automatic() {
        let arb = OverrideArbiter::new(10_000);
        assert_eq!(arb.mode(0), ArbiterMode::Automatic);
        assert!(!arb.decide(0, CALM));
        assert!(arb.decide(0, ALARM));
    }

    #[test]
    fn override_holds_then_decays() {
        let mut arb = OverrideArbiter::new(10_000);
        arb.record(true, 0);
        assert!(arb.decide(5_000, CALM));
        assert_eq!(arb.mode(9_999), ArbiterMode::Overridden);
        assert_eq!(arb.mode(10_000), ArbiterMode::Automatic);
        assert!(!arb.decide(11_000, CALM));
        assert!(arb.decide(11_000, ALARM));
    }

    #[test]
    fn override_off_suppresses_alert_inside_window() {
        let mut arb = OverrideArbiter::new(10_000);
        arb.record(false, 1_000);
        assert!(!arb.decide(2_000, ALARM));
    }

    #[test]
    fn newer_command_replaces_older() {
        let mut arb = OverrideArbiter::new(10_000);
        arb.record(true, 0);
        arb.record(false, 8_000);
        assert!(!arb.decide(12_000, CALM));
        assert!(!arb.decide(12_000, ALARM));
        assert_eq!(
            arb.last_command(),
            Some(OverrideCommand {
                desired_on: false,
                received_at_ms: 8_000
            })
        );
    }

    #[test]
    fn clock_behind_stamp_still_overrides() {
        let mut arb = OverrideArbiter::new(10_000);
        arb.record(true, 5_000);
        assert!(arb.decide(4_000, CALM));
    }
}
