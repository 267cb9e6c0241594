pub mod adapter;
pub mod runner;

pub use adapter::{Adapter, AdapterError, RunReport};
