use super::runner::run_flusher;
use crate::batch::{BatchError, Batcher, FlushOutcome, PendingFlush};
use crate::config::{validate_config, Config, ConfigError};
use crate::event::{EventNormalizer, HostEvent, Subscription};
use crate::sink::{LogglyClient, Sink, SubmissionError};
use crate::source::{create_channel, ChannelSource, EventSource, RecordShape, Sender, SourceError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build Loggly client: {0}")]
    Client(#[source] SubmissionError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("final flush failed: {0}")]
    FinalFlush(#[source] SubmissionError),

    #[error("flusher task stopped unexpectedly")]
    FlusherGone,

    #[error("flusher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Summary of one [`Adapter::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub received: u64,
    pub filtered: u64,
    pub flushes: u64,
    pub events_sent: u64,
    pub failed_flushes: u64,
    pub events_lost: u64,
    pub final_flush: FlushOutcome,
}

/// Connects an event source to a batcher and a sink.
///
/// Every adapter owns its own sink, so differently configured adapters can
/// run side by side in one process.
pub struct Adapter {
    batcher: Arc<Batcher>,
    subscription: Subscription,
    queue_size: usize,
}

impl Adapter {
    /// Validate `config` and build an adapter that submits to `sink`.
    pub fn new(config: &Config, sink: Arc<dyn Sink>) -> Result<Self, ConfigError> {
        validate_config(config)?;

        let subscription = Subscription::new(config.events.as_deref())?;
        let normalizer = EventNormalizer::new(config.name.clone(), config.hostname.clone());
        let batcher = Batcher::new(config.batch_policy(), normalizer, sink);

        Ok(Self {
            batcher: Arc::new(batcher),
            subscription,
            queue_size: config.max_in_flight,
        })
    }

    /// Build an adapter backed by the Loggly HTTP API.
    pub fn from_config(config: &Config) -> Result<Self, AdapterError> {
        validate_config(config)?;
        let client = LogglyClient::from_config(config).map_err(AdapterError::Client)?;
        Ok(Self::new(config, Arc::new(client))?)
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    /// Refuse sources that do not hand out object-shaped records.
    pub fn attach<S>(&self, source: &S) -> Result<(), ConfigError>
    where
        S: EventSource + ?Sized,
    {
        match source.shape() {
            RecordShape::Structured => Ok(()),
            RecordShape::Raw => Err(ConfigError::IncompatibleSource(
                "raw byte/text streams cannot be reported; records must be objects".to_string(),
            )),
        }
    }

    /// Push one event. Resolves once any flush it triggered has completed.
    pub async fn write(&self, event: HostEvent) -> Result<(), BatchError> {
        if !self.subscription.accepts(&event) {
            return Ok(());
        }
        self.batcher.write(event).await
    }

    /// Signal end of stream: no more writes, flush the remainder.
    pub async fn finish(&self) -> Result<FlushOutcome, SubmissionError> {
        self.batcher.terminate().await
    }

    /// Drain `source` until it ends, then flush whatever is left.
    ///
    /// Due batches are handed to a flusher task through a bounded queue, so
    /// reading continues while a batch is in flight and batches still reach
    /// the sink in write order. A full queue pauses reading. Failed flushes
    /// are logged and counted; only a failure of the final flush is returned.
    pub async fn run<S>(&self, source: &mut S) -> Result<RunReport, AdapterError>
    where
        S: EventSource + ?Sized,
    {
        self.attach(source)?;

        let (flush_tx, flush_rx) = create_channel::<PendingFlush>(self.queue_size);
        let flusher = tokio::spawn(run_flusher(flush_rx));

        let mut received = 0u64;
        let mut filtered = 0u64;
        let mut failure: Option<AdapterError> = None;

        let policy = self.batcher.policy();
        info!(
            threshold = policy.threshold,
            max_delay = ?policy.max_delay,
            queue = self.queue_size,
            "Reporter started"
        );

        loop {
            let event = match source.next_event().await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!(received, "Input closed, flushing remaining events");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Source failed, flushing remaining events");
                    failure = Some(e.into());
                    break;
                }
            };

            received += 1;
            if !self.subscription.accepts(&event) {
                debug!(kind = ?event.event, "Event kind not subscribed");
                filtered += 1;
                continue;
            }

            if let Some(pending) = self.batcher.append(event)? {
                if flush_tx.send(pending).await.is_err() {
                    failure = Some(AdapterError::FlusherGone);
                    break;
                }
            }
        }

        // Queued batches go out before the remainder so order is kept
        drop(flush_tx);
        flusher.await?;

        let final_flush = self.batcher.terminate().await;

        let stats = self.batcher.stats();
        info!(
            received,
            filtered,
            flushes = stats.flushes,
            events_sent = stats.events_sent,
            failed_flushes = stats.failed_flushes,
            "Reporter finished"
        );

        if let Some(e) = failure {
            return Err(e);
        }
        let final_flush = final_flush.map_err(AdapterError::FinalFlush)?;

        Ok(RunReport {
            received,
            filtered,
            flushes: stats.flushes,
            events_sent: stats.events_sent,
            failed_flushes: stats.failed_flushes,
            events_lost: stats.events_lost,
            final_flush,
        })
    }

    /// Run on a background task fed through a channel. Dropping every
    /// sender ends the stream.
    pub fn spawn(
        self: Arc<Self>,
        buffer_size: usize,
    ) -> (Sender<HostEvent>, JoinHandle<Result<RunReport, AdapterError>>) {
        let (tx, rx) = create_channel(buffer_size);
        let handle = tokio::spawn(async move {
            let mut source = ChannelSource::new(rx);
            self.run(&mut source).await
        });
        (tx, handle)
    }
}
