use super::buffer::{BatchPolicy, BufferState};
use crate::event::{EventNormalizer, HostEvent, LogEvent};
use crate::sink::{Sink, Submission, SubmissionError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batcher has been terminated, no further writes are accepted")]
    Terminated,

    #[error("flush failed: {0}")]
    Submission(#[from] SubmissionError),
}

/// Result of a completed flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered, the sink was not called
    Empty,
    Sent { events: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub buffered: usize,
    pub flushes: u64,
    pub events_sent: u64,
    pub failed_flushes: u64,
    pub events_lost: u64,
}

#[derive(Debug, Default)]
struct FlushCounters {
    flushes: AtomicU64,
    events_sent: AtomicU64,
    failed_flushes: AtomicU64,
    events_lost: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    buffer: BufferState,
    terminated: bool,
}

/// Accumulates normalized events and decides when they are sent.
///
/// Appending, evaluating the flush condition and swapping a due buffer out
/// all happen under one lock, so writes never interleave inside the check.
/// The lock is released before the sink is called: writers keep filling a
/// fresh buffer while a previous batch is in flight.
///
/// Delivery is at most once. A failed submission is reported to whoever
/// awaits the flush and the batch is gone.
pub struct Batcher {
    policy: BatchPolicy,
    normalizer: EventNormalizer,
    sink: Arc<dyn Sink>,
    inner: Mutex<Inner>,
    counters: Arc<FlushCounters>,
}

impl Batcher {
    pub fn new(policy: BatchPolicy, normalizer: EventNormalizer, sink: Arc<dyn Sink>) -> Self {
        Self {
            policy,
            normalizer,
            sink,
            inner: Mutex::new(Inner::default()),
            counters: Arc::new(FlushCounters::default()),
        }
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    /// Normalize and buffer an event.
    ///
    /// Returns the swapped-out batch when the event made a flush due. The
    /// caller decides when to await it.
    pub fn append(&self, event: HostEvent) -> Result<Option<PendingFlush>, BatchError> {
        let event = self.normalizer.normalize(event);
        let now = Instant::now();

        let mut inner = self.lock();
        if inner.terminated {
            return Err(BatchError::Terminated);
        }

        inner.buffer.push(event, now);
        if !inner.buffer.is_due(&self.policy, now) {
            return Ok(None);
        }

        Ok(self.take_pending(&mut inner))
    }

    /// Buffer an event and, if that makes a flush due, send it.
    pub async fn write(&self, event: HostEvent) -> Result<(), BatchError> {
        if let Some(pending) = self.append(event)? {
            pending.submit().await?;
        }
        Ok(())
    }

    /// Send whatever is buffered, regardless of the policy.
    ///
    /// An empty buffer still completes asynchronously, after yielding once
    /// to the scheduler, without calling the sink.
    pub async fn flush(&self) -> Result<FlushOutcome, SubmissionError> {
        let pending = {
            let mut inner = self.lock();
            self.take_pending(&mut inner)
        };

        match pending {
            Some(pending) => pending.submit().await,
            None => {
                tokio::task::yield_now().await;
                Ok(FlushOutcome::Empty)
            }
        }
    }

    /// Stop accepting writes and flush the remainder.
    ///
    /// Flushes already in flight are not affected; this only sends what
    /// accumulated after them.
    pub async fn terminate(&self) -> Result<FlushOutcome, SubmissionError> {
        {
            let mut inner = self.lock();
            if !inner.terminated {
                debug!(buffered = inner.buffer.len(), "Terminating batcher");
            }
            inner.terminated = true;
        }
        self.flush().await
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Number of events waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn stats(&self) -> BatcherStats {
        BatcherStats {
            buffered: self.buffered(),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            events_sent: self.counters.events_sent.load(Ordering::Relaxed),
            failed_flushes: self.counters.failed_flushes.load(Ordering::Relaxed),
            events_lost: self.counters.events_lost.load(Ordering::Relaxed),
        }
    }

    fn take_pending(&self, inner: &mut Inner) -> Option<PendingFlush> {
        if inner.buffer.is_empty() {
            return None;
        }

        Some(PendingFlush {
            events: inner.buffer.take(),
            sink: self.sink.clone(),
            counters: self.counters.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A batch already removed from the buffer and waiting to be submitted.
#[must_use = "a pending flush does nothing until submitted"]
pub struct PendingFlush {
    events: Vec<LogEvent>,
    sink: Arc<dyn Sink>,
    counters: Arc<FlushCounters>,
}

impl PendingFlush {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub async fn submit(self) -> Result<FlushOutcome, SubmissionError> {
        let count = self.events.len();
        let submission = into_submission(self.events);

        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        match self.sink.submit(submission).await {
            Ok(()) => {
                self.counters
                    .events_sent
                    .fetch_add(count as u64, Ordering::Relaxed);
                debug!(events = count, "Flushed batch");
                Ok(FlushOutcome::Sent { events: count })
            }
            Err(e) => {
                self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .events_lost
                    .fetch_add(count as u64, Ordering::Relaxed);
                warn!(events = count, error = %e, "Flush failed, batch dropped");
                Err(e)
            }
        }
    }
}

fn into_submission(mut events: Vec<LogEvent>) -> Submission {
    if events.len() == 1 {
        if let Some(event) = events.pop() {
            let tags = event.tags();
            return Submission::Single { event, tags };
        }
    }
    Submission::Batch(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn batcher(threshold: usize, max_delay_ms: u64) -> (Batcher, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let batcher = Batcher::new(
            BatchPolicy::new(threshold, Duration::from_millis(max_delay_ms)),
            EventNormalizer::default(),
            sink.clone(),
        );
        (batcher, sink)
    }

    fn event(tag: &str) -> HostEvent {
        HostEvent::new("log", 1396207735000)
            .with_tags(["info", tag])
            .with_data(tag)
    }

    #[tokio::test]
    async fn test_append_returns_pending_when_due() {
        let (batcher, sink) = batcher(2, 0);

        assert!(batcher.append(event("a")).unwrap().is_none());
        let pending = batcher.append(event("b")).unwrap().expect("flush due");
        assert_eq!(pending.len(), 2);

        // Swapped out before submission
        assert_eq!(batcher.buffered(), 0);
        assert_eq!(sink.calls(), 0);

        assert_eq!(pending.submit().await.unwrap(), FlushOutcome::Sent { events: 2 });
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_event_carries_its_tags() {
        let (batcher, sink) = batcher(0, 0);
        batcher.write(event("server")).await.unwrap();

        match &sink.submissions()[0] {
            Submission::Single { event, tags } => {
                assert_eq!(tags, &vec!["info".to_string(), "server".to_string()]);
                assert_eq!(event.msg, serde_json::json!("server"));
            }
            other => panic!("expected single submission, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flush_of_empty_buffer_skips_sink() {
        let (batcher, sink) = batcher(10, 0);
        assert_eq!(batcher.flush().await.unwrap(), FlushOutcome::Empty);
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_still_clears_buffer() {
        let (batcher, sink) = batcher(2, 0);
        sink.set_failing(true);

        batcher.write(event("a")).await.unwrap();
        let err = batcher.write(event("b")).await.unwrap_err();
        assert!(matches!(err, BatchError::Submission(_)));
        assert_eq!(batcher.buffered(), 0);

        let stats = batcher.stats();
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.failed_flushes, 1);
        assert_eq!(stats.events_lost, 2);
        assert_eq!(stats.events_sent, 0);
    }

    #[tokio::test]
    async fn test_write_after_terminate_is_rejected() {
        let (batcher, _sink) = batcher(10, 0);
        batcher.terminate().await.unwrap();

        assert!(batcher.is_terminated());
        assert!(matches!(
            batcher.write(event("late")).await,
            Err(BatchError::Terminated)
        ));
    }
}
