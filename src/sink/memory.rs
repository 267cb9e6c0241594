use super::{Sink, Submission, SubmissionError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Sink that keeps every submission in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    submissions: Mutex<Vec<Submission>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent submissions fail (they are still recorded)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls(&self) -> usize {
        self.submissions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn submit(&self, submission: Submission) -> Result<(), SubmissionError> {
        self.submissions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(submission);

        if self.failing.load(Ordering::SeqCst) {
            return Err(SubmissionError::Rejected("memory sink set to fail".to_string()));
        }
        Ok(())
    }
}
