//! Handoff from the broker client's callback to the control loop.
//!
//! The MQTT client invokes its callback on its own task. That callback
//! must not touch control state, so it parses the message and pushes a
//! [`RemoteCommand`] into a bounded `embassy-sync` channel; the loop pulls
//! from it once per pass.
//!
//! ```text
//! ┌───────────────┐  RemoteCommand  ┌──────────────┐
//! │ MQTT callback │───────────────▶│ Control loop │
//! │ (client task) │  try_send       │ try_receive  │
//! └───────────────┘                 └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::commands::{RemoteCommand, parse_inbound};

/// Pending commands the loop has not consumed yet.
const INBOX_DEPTH: usize = 8;

pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, RemoteCommand, INBOX_DEPTH>,
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Producer side. Safe to call from the client task. Returns `false`
    /// if the message was not a command or the inbox was full.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        match parse_inbound(topic, payload) {
            Some(cmd) => self.push(cmd),
            None => false,
        }
    }

    pub fn push(&self, cmd: RemoteCommand) -> bool {
        if self.channel.try_send(cmd).is_err() {
            warn!("Command inbox full, dropping {:?}", cmd);
            return false;
        }
        true
    }

    /// Consumer side: next command in arrival order.
    pub fn pop(&self) -> Option<RemoteCommand> {
        self.channel.try_receive().ok()
    }
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}
