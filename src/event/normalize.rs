use super::types::{HostEvent, LogEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Reshapes host events into the form the aggregator expects.
///
/// Holds the static fields injected into every event. Normalization never
/// fails: absent or unusable fields fall back to absent values or an empty
/// message.
#[derive(Debug, Clone, Default)]
pub struct EventNormalizer {
    name: Option<String>,
    hostname: Option<String>,
}

impl EventNormalizer {
    pub fn new(name: Option<String>, hostname: Option<String>) -> Self {
        Self { name, hostname }
    }

    pub fn normalize(&self, event: HostEvent) -> LogEvent {
        let msg = get_message(event.data.as_ref());
        let timestamp = event.timestamp.and_then(time_string);

        let mut extra = event.extra;
        extra.remove("msg");
        let name = match &self.name {
            Some(name) => {
                extra.remove("name");
                Some(name.clone())
            }
            None => None,
        };
        let hostname = match &self.hostname {
            Some(hostname) => {
                extra.remove("hostname");
                Some(hostname.clone())
            }
            None => None,
        };

        LogEvent {
            event: event.event,
            timestamp,
            tags: event.tags,
            data: event.data,
            pid: event.pid,
            msg,
            name,
            hostname,
            extra,
        }
    }
}

/// Format epoch milliseconds as an ISO-8601 UTC string, e.g.
/// `2014-03-30T19:28:55.000Z`. Returns None when out of range.
pub fn time_string(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Derive the human readable message of an event.
///
/// First truthy value wins: `data.message`, then `data.error`, then `data`
/// itself, then the empty string.
pub fn get_message(data: Option<&Value>) -> Value {
    let Some(data) = data else {
        return Value::String(String::new());
    };

    if let Value::Object(fields) = data {
        for key in ["message", "error"] {
            if let Some(value) = fields.get(key) {
                if is_truthy(value) {
                    return value.clone();
                }
            }
        }
    }

    if is_truthy(data) {
        data.clone()
    } else {
        Value::String(String::new())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
