use super::types::HostEvent;
use crate::config::ConfigError;
use std::collections::HashSet;

/// Event kind that can never be shipped: process metrics are not log lines.
pub const UNSUPPORTED_KIND: &str = "ops";

/// Which event kinds the reporter forwards.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    kinds: Option<HashSet<String>>,
}

impl Subscription {
    /// Accept every kind
    pub fn all() -> Self {
        Self { kinds: None }
    }

    /// Restrict to the listed kinds. `None` accepts everything.
    pub fn new(kinds: Option<&[String]>) -> Result<Self, ConfigError> {
        let Some(kinds) = kinds else {
            return Ok(Self::all());
        };

        if kinds.iter().any(|k| k == UNSUPPORTED_KIND) {
            return Err(ConfigError::UnsupportedEvent(UNSUPPORTED_KIND.to_string()));
        }

        Ok(Self {
            kinds: Some(kinds.iter().cloned().collect()),
        })
    }

    pub fn accepts(&self, event: &HostEvent) -> bool {
        match (&self.kinds, &event.event) {
            (None, _) => true,
            (Some(kinds), Some(kind)) => kinds.contains(kind),
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_accepts_everything() {
        let subscription = Subscription::all();
        assert!(subscription.accepts(&HostEvent::new("log", 0)));
        assert!(subscription.accepts(&HostEvent::default()));
    }

    #[test]
    fn test_listed_kinds_only() {
        let kinds = vec!["log".to_string(), "error".to_string()];
        let subscription = Subscription::new(Some(&kinds)).unwrap();

        assert!(subscription.accepts(&HostEvent::new("log", 0)));
        assert!(subscription.accepts(&HostEvent::new("error", 0)));
        assert!(!subscription.accepts(&HostEvent::new("response", 0)));
        assert!(!subscription.accepts(&HostEvent::default()));
    }

    #[test]
    fn test_ops_is_rejected() {
        let kinds = vec!["log".to_string(), "ops".to_string()];
        let err = Subscription::new(Some(&kinds)).unwrap_err();
        assert_eq!(err.to_string(), "\"ops\" events are not supported by Loggly");
    }
}
