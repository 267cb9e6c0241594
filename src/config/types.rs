use crate::batch::BatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://logs-01.loggly.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Loggly customer token (required)
    #[serde(default)]
    pub token: Option<String>,

    /// Loggly account subdomain (required)
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Base URL of the input API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Static tags sent with every submission
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub hostname: Option<String>,

    /// Buffer size that forces a flush. 0 flushes every event.
    #[serde(default)]
    pub threshold: usize,

    /// Milliseconds the oldest buffered event may wait. 0 disables.
    #[serde(default)]
    pub max_delay: u64,

    /// Event kinds to forward. Absent forwards everything.
    #[serde(default)]
    pub events: Option<Vec<String>>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Depth of the flush queue. Flushes are sent one at a time; the reader
    /// waits while the queue is full.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default)]
    pub input: InputConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_in_flight() -> usize {
    4
}

impl Config {
    pub fn new(token: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            subdomain: Some(subdomain.into()),
            ..Default::default()
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            threshold: self.threshold,
            max_delay: Duration::from_millis(self.max_delay),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            subdomain: None,
            endpoint: default_endpoint(),
            tags: Vec::new(),
            name: None,
            hostname: None,
            threshold: 0,
            max_delay: 0,
            events: None,
            timeout: default_timeout(),
            max_in_flight: default_max_in_flight(),
            input: InputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub format: InputFormat,

    /// Read from this file instead of stdin
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub on_parse_error: ParseErrorStrategy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One JSON object per line
    #[default]
    Ndjson,
    /// Raw lines. Not accepted by the reporter.
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorStrategy {
    #[default]
    Drop,
    Fail,
}
