use crate::batch::PendingFlush;
use crate::source::Receiver;
use tracing::{error, info};

/// Submit queued batches one at a time, in the order they were queued.
///
/// A failed batch is logged and dropped; the next one is still sent.
pub async fn run_flusher(mut input: Receiver<PendingFlush>) {
    info!("Flusher started");

    while let Some(pending) = input.recv().await {
        let events = pending.len();
        if let Err(e) = pending.submit().await {
            error!(events, error = %e, "Failed to submit batch");
        }
    }

    info!("Flusher shutdown complete");
}
