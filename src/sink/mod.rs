pub mod loggly;
pub mod memory;

use crate::event::LogEvent;
use async_trait::async_trait;
use thiserror::Error;

pub use loggly::LogglyClient;
pub use memory::MemorySink;

/// What a flush hands to the sink.
///
/// A lone event travels with its own tags. A batch carries no tags of its
/// own: the aggregator takes a single tag list per call, so per-event tags
/// are not transmitted separately when batching.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Single { event: LogEvent, tags: Vec<String> },
    Batch(Vec<LogEvent>),
}

impl Submission {
    /// Number of events carried
    pub fn len(&self) -> usize {
        match self {
            Submission::Single { .. } => 1,
            Submission::Batch(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> Vec<&LogEvent> {
        match self {
            Submission::Single { event, .. } => vec![event],
            Submission::Batch(events) => events.iter().collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("aggregator returned error status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Destination for normalized events.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn submit(&self, submission: Submission) -> Result<(), SubmissionError>;
}
