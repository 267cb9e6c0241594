pub mod batcher;
pub mod buffer;

pub use batcher::{BatchError, Batcher, BatcherStats, FlushOutcome, PendingFlush};
pub use buffer::{BatchPolicy, BufferState};
