//! Offline telemetry buffer.
//!
//! Messages produced while the broker link is down are held here and
//! replayed in enqueue order once it returns.
//!
//! ```text
//!   enqueue ──▶ ┌───┬───┬───┬───┐ ──▶ drain(publish)
//!   (newest)    │ 4 │ 3 │ 2 │ 1 │     (oldest first, stop on failure)
//!               └───┴───┴───┴───┘
//!   full: evict oldest, admit newest
//! ```
//!
//! Storage is a fixed `heapless::Deque` sized for the largest configurable
//! depth, boxed so the owning `ControlLoop` stays small enough for a task
//! stack; the runtime capacity bounds it further. Delivery is
//! at-least-once: a publish reported as failed may still have reached the
//! broker, and the retry on the next drain duplicates it.

use heapless::Deque;
use log::warn;

use crate::telemetry::{Payload, Topic};

/// Upper bound for `SystemConfig::queue_capacity`.
pub const MAX_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub topic: Topic,
    pub payload: Payload,
    pub enqueued_at_ms: u64,
}

pub struct OfflineQueue {
    buf: Box<Deque<QueuedMessage, MAX_QUEUE_DEPTH>>,
    capacity: usize,
    /// Messages evicted to make room since boot.
    dropped: u32,
}

impl OfflineQueue {
    /// `capacity` is clamped to `1..=MAX_QUEUE_DEPTH`; callers validate
    /// the configured value first.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Box::default(),
            capacity: capacity.clamp(1, MAX_QUEUE_DEPTH),
            dropped: 0,
        }
    }

    /// Append a message. When full, the oldest message is evicted and
    /// returned so the caller can account for it.
    pub fn enqueue(
        &mut self,
        topic: Topic,
        payload: Payload,
        now_ms: u64,
    ) -> Option<QueuedMessage> {
        let evicted = if self.buf.len() >= self.capacity {
            let old = self.buf.pop_front();
            self.dropped = self.dropped.saturating_add(1);
            if let Some(ref m) = old {
                warn!(
                    "Offline queue full ({}), dropped oldest '{}' from {}ms",
                    self.capacity,
                    m.topic.as_str(),
                    m.enqueued_at_ms
                );
            }
            old
        } else {
            None
        };

        // Cannot fail: length is below capacity <= MAX_QUEUE_DEPTH here.
        let _ = self.buf.push_back(QueuedMessage {
            topic,
            payload,
            enqueued_at_ms: now_ms,
        });
        evicted
    }

    /// Publish queued messages oldest first. Stops at the first failed
    /// publish; that message and everything behind it stay queued in order.
    /// Returns the number of messages delivered.
    pub fn drain(&mut self, mut publish: impl FnMut(Topic, &[u8]) -> bool) -> usize {
        let mut delivered = 0;
        while let Some(front) = self.buf.front() {
            if !publish(front.topic, &front.payload) {
                break;
            }
            self.buf.pop_front();
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.buf.iter()
    }
}
