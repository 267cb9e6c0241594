use super::{Sink, Submission, SubmissionError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, SubmissionError>;

/// HTTP client for the Loggly input API.
///
/// Tags always travel in the URL path, never in the `X-LOGGLY-TAG` header:
/// tags sent via the header do not show up on JSON events.
#[derive(Debug, Clone)]
pub struct LogglyClient {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    tags: Vec<String>,
}

impl LogglyClient {
    pub fn new(
        endpoint: &str,
        token: impl Into<String>,
        tags: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = Url::parse(endpoint)
            .map_err(|err| SubmissionError::InvalidEndpoint(err.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(SubmissionError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            client,
            endpoint,
            token: token.into(),
            tags,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.token.clone().unwrap_or_default();
        Self::new(&config.endpoint, token, config.tags.clone(), config.timeout)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// URL for a single event: static tags followed by the event's own
    pub fn input_url(&self, event_tags: &[String]) -> Url {
        let tags: Vec<&str> = self
            .tags
            .iter()
            .chain(event_tags.iter())
            .map(String::as_str)
            .collect();
        self.url("inputs", &tags)
    }

    /// URL for a batch: static tags only
    pub fn bulk_url(&self) -> Url {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        self.url("bulk", &tags)
    }

    // Each piece is pushed as its own path segment so that `/`, `#`, `?` and
    // spaces inside a tag are percent-encoded instead of reshaping the path.
    fn url(&self, input: &str, tags: &[&str]) -> Url {
        let tags = tag_list(tags);
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(input).push(&self.token);
            if !tags.is_empty() {
                segments.push("tag").push(&tags.join(",")).push("");
            }
        }
        url
    }

    async fn post(&self, url: Url, content_type: &str, body: String) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubmissionError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Sink for LogglyClient {
    async fn submit(&self, submission: Submission) -> Result<()> {
        match submission {
            Submission::Single { event, tags } => {
                let body = serde_json::to_string(&event)?;
                let url = self.input_url(&tags);
                tracing::debug!(url = %url, "Sending event");
                self.post(url, "application/json", body).await
            }
            Submission::Batch(events) => {
                let lines = events
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let url = self.bulk_url();
                tracing::debug!(url = %url, events = lines.len(), "Sending batch");
                self.post(url, "text/plain", lines.join("\n")).await
            }
        }
    }
}

// Loggly separates tags with commas, so a comma inside a tag splits it.
fn tag_list<'a>(tags: &[&'a str]) -> Vec<&'a str> {
    tags.iter()
        .flat_map(|t| t.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(tags: &[&str]) -> LogglyClient {
        LogglyClient::new(
            "https://logs-01.loggly.com/",
            "TOKEN",
            tags.iter().map(|t| t.to_string()).collect(),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_input_url_combines_tags() {
        let client = client(&["foo"]);
        let url = client.input_url(&["info".to_string(), "server".to_string()]);
        assert_eq!(
            url.as_str(),
            "https://logs-01.loggly.com/inputs/TOKEN/tag/foo,info,server/"
        );
    }

    #[test]
    fn test_input_url_without_tags() {
        let url = client(&[]).input_url(&[]);
        assert_eq!(url.as_str(), "https://logs-01.loggly.com/inputs/TOKEN");
    }

    #[test]
    fn test_bulk_url_uses_static_tags_only() {
        let client = client(&["foo", "bar"]);
        assert_eq!(
            client.bulk_url().as_str(),
            "https://logs-01.loggly.com/bulk/TOKEN/tag/foo,bar/"
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::new("TOKEN", "SUBDOMAIN");
        config.tags = vec!["foo".to_string()];

        let client = LogglyClient::from_config(&config).unwrap();
        assert_eq!(client.tags(), ["foo".to_string()]);
        assert_eq!(
            client.bulk_url().as_str(),
            "https://logs-01.loggly.com/bulk/TOKEN/tag/foo/"
        );
    }

    #[test]
    fn test_input_url_escapes_tags() {
        let url = client(&[]).input_url(&["a/b".to_string(), "x#y".to_string()]);

        assert_eq!(url.path(), "/inputs/TOKEN/tag/a%2Fb,x%23y/");
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_input_url_escapes_query_and_spaces() {
        let url = client(&["static"]).input_url(&["what?".to_string(), "two words".to_string()]);

        assert_eq!(url.path(), "/inputs/TOKEN/tag/static,what%3F,two%20words/");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_comma_splits_tag() {
        let url = client(&[]).input_url(&["a,b".to_string(), " ".to_string()]);
        assert_eq!(url.path(), "/inputs/TOKEN/tag/a,b/");
    }

    #[test]
    fn test_endpoint_with_base_path() {
        let client = LogglyClient::new(
            "http://127.0.0.1:8080/proxy/",
            "TOKEN",
            vec![],
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.bulk_url().as_str(), "http://127.0.0.1:8080/proxy/bulk/TOKEN");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = LogglyClient::new("not a url", "TOKEN", vec![], Duration::from_secs(30));
        assert!(matches!(result, Err(SubmissionError::InvalidEndpoint(_))));
    }
}
