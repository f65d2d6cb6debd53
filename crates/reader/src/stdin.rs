//! A reader that decodes newline-delimited JSON messages from any
//! `AsyncBufRead`, most commonly process stdin.

use async_trait::async_trait;
use chrono::Utc;
use model::{Event, EventInfo, Level, Message};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{Reader, ReaderError};

/// Decodes one JSON object per line into a [`Message`], applying the
/// acceptance defaults: a missing `time` becomes "now", a missing
/// `info.host` becomes the local hostname, and a missing `group` or
/// `stream` causes the line to be dropped with a warning rather than
/// rejected outright.
pub struct StdinReader<R> {
    lines: tokio::io::Lines<BufReader<R>>,
    hostname: String,
}

impl StdinReader<tokio::io::Stdin> {
    /// Reads from process stdin.
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin())
    }
}

impl Default for StdinReader<tokio::io::Stdin> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: tokio::io::AsyncRead + Unpin> StdinReader<R> {
    /// Reads newline-delimited JSON from any async reader (used in tests
    /// to feed canned input without touching real stdin).
    pub fn from_reader(inner: R) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl<R: tokio::io::AsyncRead + Unpin + Send> Reader for StdinReader<R> {
    async fn read_message(&mut self) -> Result<Option<Message>, ReaderError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            let raw: RawMessage = match serde_json::from_str(&line) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(error = %err, line, "dropping malformed input line");
                    continue;
                }
            };

            match self.into_message(raw) {
                Some(msg) => return Ok(Some(msg)),
                None => continue,
            }
        }
    }
}

impl<R> StdinReader<R> {
    fn into_message(&self, raw: RawMessage) -> Option<Message> {
        if raw.group.is_empty() {
            tracing::warn!("dropping message with empty group");
            return None;
        }
        if raw.stream.is_empty() {
            tracing::warn!(group = raw.group, "dropping message with empty stream");
            return None;
        }

        let mut info = raw.event.info;
        if info.host.is_empty() {
            info.host = self.hostname.clone();
        }

        let event = Event {
            level: raw.event.level,
            time: raw.event.time.unwrap_or_else(Utc::now),
            info,
            data: raw.event.data,
            message: raw.event.message,
        };

        Message::new(raw.group, raw.stream, event).ok()
    }
}

/// The on-wire shape read from a line of input.
#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    group: String,
    #[serde(default)]
    stream: String,
    event: RawEvent,
}

/// Mirrors [`Event`], except `time` is optional on the wire — a reader,
/// not the model, is responsible for defaulting an absent timestamp to
/// "now", since "now" is not a value the model crate should manufacture.
#[derive(Deserialize)]
struct RawEvent {
    level: Level,
    #[serde(default)]
    time: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    info: EventInfo,
    #[serde(default)]
    data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn decodes_well_formed_lines() {
        let input = r#"{"group":"g","stream":"s","event":{"level":"INFO","time":"2024-01-01T00:00:00Z","message":"hi"}}"#;
        let mut reader = StdinReader::from_reader(Cursor::new(input.as_bytes().to_vec()));
        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.group, "g");
        assert_eq!(msg.stream, "s");
        assert_eq!(msg.event.message, "hi");
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn drops_lines_with_empty_group_or_stream() {
        let input = concat!(
            r#"{"group":"","stream":"s","event":{"level":"INFO","time":"2024-01-01T00:00:00Z"}}"#,
            "\n",
            r#"{"group":"g","stream":"","event":{"level":"INFO","time":"2024-01-01T00:00:00Z"}}"#,
            "\n",
            r#"{"group":"g","stream":"s","event":{"level":"INFO","time":"2024-01-01T00:00:00Z"}}"#,
        );
        let mut reader = StdinReader::from_reader(Cursor::new(input.as_bytes().to_vec()));
        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.group, "g");
        assert_eq!(msg.stream, "s");
    }

    #[tokio::test]
    async fn defaults_missing_host_to_local_hostname() {
        let input = r#"{"group":"g","stream":"s","event":{"level":"INFO","time":"2024-01-01T00:00:00Z"}}"#;
        let mut reader = StdinReader::from_reader(Cursor::new(input.as_bytes().to_vec()));
        let expected_host = reader.hostname.clone();
        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.event.info.host, expected_host);
    }

    #[tokio::test]
    async fn skips_malformed_json_lines() {
        let input = "not json\n{\"group\":\"g\",\"stream\":\"s\",\"event\":{\"level\":\"INFO\",\"time\":\"2024-01-01T00:00:00Z\"}}";
        let mut reader = StdinReader::from_reader(Cursor::new(input.as_bytes().to_vec()));
        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.group, "g");
    }
}
