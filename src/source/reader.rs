use super::{EventSource, RecordShape, SourceError};
use crate::config::types::{InputFormat, ParseErrorStrategy};
use crate::event::HostEvent;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

/// Reads events from a line-oriented reader such as stdin or a file.
///
/// In `ndjson` format each non-blank line must be a JSON object. In `text`
/// format the lines are raw text; such a source reports
/// [`RecordShape::Raw`] and is refused by the adapter.
pub struct ReaderSource<R> {
    lines: Lines<R>,
    format: InputFormat,
    parse_error_strategy: ParseErrorStrategy,
    line_number: usize,
    dropped: usize,
}

impl<R> ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, format: InputFormat, parse_error_strategy: ParseErrorStrategy) -> Self {
        Self {
            lines: reader.lines(),
            format,
            parse_error_strategy,
            line_number: 0,
            dropped: 0,
        }
    }

    /// Lines skipped because they did not parse
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl ReaderSource<BufReader<File>> {
    pub async fn open(
        path: &Path,
        format: InputFormat,
        parse_error_strategy: ParseErrorStrategy,
    ) -> Result<Self, SourceError> {
        let file = File::open(path).await?;
        Ok(Self::new(BufReader::new(file), format, parse_error_strategy))
    }
}

#[async_trait]
impl<R> EventSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn shape(&self) -> RecordShape {
        match self.format {
            InputFormat::Ndjson => RecordShape::Structured,
            InputFormat::Text => RecordShape::Raw,
        }
    }

    async fn next_event(&mut self) -> Result<Option<HostEvent>, SourceError> {
        if self.format == InputFormat::Text {
            return Err(SourceError::Unstructured);
        }

        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<HostEvent>(&line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => match self.parse_error_strategy {
                    ParseErrorStrategy::Drop => {
                        warn!(line = self.line_number, error = %e, "Dropping unparseable event");
                        self.dropped += 1;
                        continue;
                    }
                    ParseErrorStrategy::Fail => {
                        return Err(SourceError::Parse {
                            line: self.line_number,
                            source: e,
                        });
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source(input: &'static str, strategy: ParseErrorStrategy) -> ReaderSource<&'static [u8]> {
        ReaderSource::new(input.as_bytes(), InputFormat::Ndjson, strategy)
    }

    #[tokio::test]
    async fn test_reads_ndjson_events() {
        let mut source = source(
            "{\"event\":\"log\",\"timestamp\":1,\"data\":\"a\"}\n\n{\"event\":\"error\",\"timestamp\":2}\n",
            ParseErrorStrategy::Fail,
        );

        let first = source.next_event().await.unwrap().unwrap();
        assert_eq!(first.event.as_deref(), Some("log"));
        let second = source.next_event().await.unwrap().unwrap();
        assert_eq!(second.event.as_deref(), Some("error"));
        assert!(source.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_skips_bad_lines() {
        let mut source = source(
            "not json\n[1,2]\n{\"event\":\"log\"}\n",
            ParseErrorStrategy::Drop,
        );

        let event = source.next_event().await.unwrap().unwrap();
        assert_eq!(event.event.as_deref(), Some("log"));
        assert_eq!(source.dropped(), 2);
    }

    #[tokio::test]
    async fn test_mistyped_fields_keep_the_event() {
        let mut source = source(
            "{\"event\":\"log\",\"timestamp\":1,\"pid\":\"1234\",\"data\":\"x\"}\n\
             {\"event\":\"log\",\"timestamp\":1,\"tags\":\"info\",\"data\":\"y\"}\n",
            ParseErrorStrategy::Fail,
        );

        let first = source.next_event().await.unwrap().unwrap();
        assert_eq!(first.pid, Some(1234));
        let second = source.next_event().await.unwrap().unwrap();
        assert_eq!(second.tags, Some(vec!["info".to_string()]));
        assert!(source.next_event().await.unwrap().is_none());
        assert_eq!(source.dropped(), 0);
    }

    #[tokio::test]
    async fn test_fail_reports_line_number() {
        let mut source = source("{\"event\":\"log\"}\nnot json\n", ParseErrorStrategy::Fail);

        source.next_event().await.unwrap();
        let err = source.next_event().await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_text_format_is_raw() {
        let mut source =
            ReaderSource::new(&b"plain line\n"[..], InputFormat::Text, ParseErrorStrategy::Drop);

        assert_eq!(source.shape(), RecordShape::Raw);
        assert!(matches!(
            source.next_event().await,
            Err(SourceError::Unstructured)
        ));
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"event\":\"request\",\"timestamp\":5}}").unwrap();

        let mut source =
            ReaderSource::open(file.path(), InputFormat::Ndjson, ParseErrorStrategy::Fail)
                .await
                .unwrap();
        let event = source.next_event().await.unwrap().unwrap();
        assert_eq!(event.timestamp, Some(5));
    }
}
