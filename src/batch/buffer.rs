use crate::event::LogEvent;
use std::time::Duration;
use tokio::time::Instant;

/// When a buffer is worth sending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Buffer length that forces a flush. 0 flushes every event.
    pub threshold: usize,
    /// Age of the oldest event that forces a flush. Zero disables.
    pub max_delay: Duration,
}

impl BatchPolicy {
    pub fn new(threshold: usize, max_delay: Duration) -> Self {
        Self {
            threshold,
            max_delay,
        }
    }
}

/// Events waiting to be flushed.
///
/// `buffer_start` is set exactly when the buffer is non-empty.
#[derive(Debug, Default)]
pub struct BufferState {
    events: Vec<LogEvent>,
    buffer_start: Option<Instant>,
}

impl BufferState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: LogEvent, now: Instant) {
        if self.events.is_empty() {
            self.buffer_start = Some(now);
        }
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn buffer_start(&self) -> Option<Instant> {
        self.buffer_start
    }

    /// Whether the buffer should be flushed at `now`.
    ///
    /// The age check is only as fresh as the last call: nothing re-evaluates
    /// it between writes.
    pub fn is_due(&self, policy: &BatchPolicy, now: Instant) -> bool {
        if self.events.len() >= policy.threshold {
            return true;
        }

        if policy.max_delay.is_zero() {
            return false;
        }

        match self.buffer_start {
            Some(start) => now.saturating_duration_since(start) > policy.max_delay,
            None => false,
        }
    }

    /// Swap the contents out, leaving an empty buffer behind
    pub fn take(&mut self) -> Vec<LogEvent> {
        self.buffer_start = None;
        std::mem::take(&mut self.events)
    }
}
