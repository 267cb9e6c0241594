/// Starter config written by `config init`. The hostname is taken from the
/// machine when it can be determined.
pub fn generate_starter_config() -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty());

    let hostname_line = match hostname {
        Some(h) => format!("hostname: {}", h),
        None => "# hostname: web-1".to_string(),
    };

    format!(
        r#"# =============================================================================
# LOGGLY REPORTER CONFIGURATION
# =============================================================================
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/loggly-reporter/config.yml
#   3. /etc/loggly-reporter/config.yml

# Loggly customer token and account subdomain (both required).
# Values written as $env followed by a variable name in braces are read
# from the environment.
token: $env{{LOGGLY_TOKEN}}
subdomain: example

# endpoint: https://logs-01.loggly.com

# Tags attached to every submission
tags: []

# Static fields copied onto every event
# name: my-service
{hostname_line}

# =============================================================================
# BATCHING
# =============================================================================
# threshold: buffer size that forces a flush (0 sends every event on its own)
# max_delay: milliseconds the oldest buffered event may wait (0 disables).
#            Checked when the next event arrives, not by a timer.
threshold: 0
max_delay: 0

# Depth of the flush queue. Flushes are sent one at a time, in order;
# reading pauses while this many are waiting.
max_in_flight: 4

# HTTP request timeout
timeout: 30s

# Event kinds to forward (omit to forward all). "ops" is not supported.
# events: [log, error, request, response]

# =============================================================================
# INPUT
# =============================================================================
input:
  # ndjson: one JSON object per line
  format: ndjson
  # Read from a file instead of stdin
  # path: ~/events.ndjson
  # What to do with lines that are not JSON objects: 'drop' or 'fail'
  on_parse_error: drop
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_VAR_PATTERN;
    use regex::Regex;

    #[test]
    fn test_only_token_references_env() {
        let config = generate_starter_config();
        let re = Regex::new(ENV_VAR_PATTERN).unwrap();

        let vars: Vec<&str> = re
            .captures_iter(&config)
            .map(|cap| cap.get(1).map_or("", |m| m.as_str()))
            .collect();
        assert_eq!(vars, ["LOGGLY_TOKEN"]);
    }
}
