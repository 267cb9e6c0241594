use crate::config::{load_config, Config, ConfigError};
use crate::event::HostEvent;
use crate::pipeline::{Adapter, AdapterError, RunReport};
use crate::source::{EventSource, ReaderSource, RecordShape, SourceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/loggly-reporter/config.yml");
            eprintln!("  /etc/loggly-reporter/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'loggly-reporter config init' to generate one.");
            std::process::exit(1);
        }
    };

    let report = run_reporter(&config_path).await?;
    info!(
        received = report.received,
        sent = report.events_sent,
        lost = report.events_lost,
        "Done"
    );
    Ok(())
}

async fn run_reporter(config_path: &Path) -> Result<RunReport, RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let adapter = Adapter::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = match &config.input.path {
        Some(path) => {
            info!(path = %path.display(), "Reading events from file");
            let source = open_file(&config, path).await?;
            let mut source = UntilShutdown::new(source, shutdown_rx);
            adapter.run(&mut source).await?
        }
        None => {
            info!("Reading events from stdin");
            let source = ReaderSource::new(
                BufReader::new(tokio::io::stdin()),
                config.input.format,
                config.input.on_parse_error,
            );
            let mut source = UntilShutdown::new(source, shutdown_rx);
            adapter.run(&mut source).await?
        }
    };

    Ok(report)
}

async fn open_file(
    config: &Config,
    path: &Path,
) -> Result<ReaderSource<BufReader<tokio::fs::File>>, SourceError> {
    ReaderSource::open(path, config.input.format, config.input.on_parse_error).await
}

/// Ends the wrapped source early once shutdown is signalled, so the
/// adapter still gets to flush what it buffered.
struct UntilShutdown<S> {
    inner: S,
    shutdown: watch::Receiver<bool>,
}

impl<S> UntilShutdown<S> {
    fn new(inner: S, shutdown: watch::Receiver<bool>) -> Self {
        Self { inner, shutdown }
    }
}

#[async_trait]
impl<S: EventSource> EventSource for UntilShutdown<S> {
    fn shape(&self) -> RecordShape {
        self.inner.shape()
    }

    async fn next_event(&mut self) -> Result<Option<HostEvent>, SourceError> {
        let stopped = *self.shutdown.borrow();
        if stopped {
            return Ok(None);
        }

        tokio::select! {
            event = self.inner.next_event() => event,
            Ok(()) = self.shutdown.changed() => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StreamSource;

    #[tokio::test]
    async fn test_until_shutdown_stops_reading() {
        let (tx, rx) = watch::channel(false);
        let events = futures::stream::iter(vec![HostEvent::new("log", 1), HostEvent::new("log", 2)]);
        let mut source = UntilShutdown::new(StreamSource::new(events), rx);

        assert!(source.next_event().await.unwrap().is_some());
        tx.send(true).unwrap();
        assert!(source.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_until_shutdown_passes_end_of_stream() {
        let (_tx, rx) = watch::channel(false);
        let mut source = UntilShutdown::new(StreamSource::new(futures::stream::empty::<HostEvent>()), rx);

        assert!(source.next_event().await.unwrap().is_none());
    }
}
