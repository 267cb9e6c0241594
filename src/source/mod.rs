pub mod channel;
pub mod reader;

use crate::event::HostEvent;
use async_trait::async_trait;
use thiserror::Error;

pub use channel::{create_channel, ChannelSource, Receiver, Sender, StreamSource};
pub use reader::ReaderSource;

/// What a source yields per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// One object-shaped event per record
    Structured,
    /// Raw bytes or text lines
    Raw,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read events: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: not a JSON event object: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("source does not produce structured records")]
    Unstructured,
}

/// Pull-based producer of host events, in delivery order.
///
/// `Ok(None)` is the end-of-stream signal and is returned once.
#[async_trait]
pub trait EventSource: Send {
    fn shape(&self) -> RecordShape {
        RecordShape::Structured
    }

    async fn next_event(&mut self) -> Result<Option<HostEvent>, SourceError>;
}
