pub mod batch;
pub mod cli;
pub mod config;
pub mod event;
pub mod pipeline;
pub mod sink;
pub mod source;
