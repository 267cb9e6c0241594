use super::{EventSource, SourceError};
use crate::event::HostEvent;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// Create a bounded channel with the specified buffer size
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size)
}

/// Events pushed by the host through a channel. Dropping every sender ends
/// the stream.
pub struct ChannelSource {
    rx: Receiver<HostEvent>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<HostEvent>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Result<Option<HostEvent>, SourceError> {
        Ok(self.rx.recv().await)
    }
}

/// Adapts any `Stream` of host events.
pub struct StreamSource<S> {
    stream: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = HostEvent> + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> EventSource for StreamSource<S>
where
    S: Stream<Item = HostEvent> + Send + Unpin,
{
    async fn next_event(&mut self) -> Result<Option<HostEvent>, SourceError> {
        Ok(self.stream.next().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, rx) = create_channel(4);
        let mut source = ChannelSource::new(rx);

        tx.send(HostEvent::new("log", 1)).await.unwrap();
        drop(tx);

        let first = source.next_event().await.unwrap();
        assert_eq!(first.and_then(|e| e.timestamp), Some(1));
        assert!(source.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_source_preserves_order() {
        let events = vec![HostEvent::new("log", 1), HostEvent::new("log", 2)];
        let mut source = StreamSource::new(futures::stream::iter(events));

        assert_eq!(source.next_event().await.unwrap().unwrap().timestamp, Some(1));
        assert_eq!(source.next_event().await.unwrap().unwrap().timestamp, Some(2));
        assert!(source.next_event().await.unwrap().is_none());
    }
}
