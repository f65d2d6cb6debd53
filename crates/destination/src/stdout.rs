//! The stdout destination: writes each message as a JSON line.

use async_trait::async_trait;
use model::Message;
use tokio::io::{AsyncWriteExt, Stdout};

use crate::traits::{Destination, DestinationError, Writer};

/// Writes messages to process stdout, one JSON object per line. Stateless:
/// a fresh writer is handed out on every [`StdoutDestination::open`] call.
pub struct StdoutDestination;

#[async_trait]
impl Destination for StdoutDestination {
    async fn open(&self, _group: &str, _stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        Ok(Box::new(StdoutWriter { out: tokio::io::stdout() }))
    }
}

struct StdoutWriter {
    out: Stdout,
}

#[async_trait]
impl Writer for StdoutWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        let mut line = serde_json::to_vec(&WireMessage::from(msg)).map_err(|e| DestinationError::Write(Box::new(e)))?;
        line.push(b'\n');
        self.out.write_all(&line).await.map_err(|e| DestinationError::Write(Box::new(e)))?;
        self.out.flush().await.map_err(|e| DestinationError::Write(Box::new(e)))
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        Ok(())
    }
}

/// The on-wire shape of a message: `{"group", "stream", "event"}`, matching
/// the historical encoding.
#[derive(serde::Serialize)]
struct WireMessage<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    group: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    stream: &'a str,
    event: &'a model::Event,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self { group: &msg.group, stream: &msg.stream, event: &msg.event }
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use model::{Event, Level};

    use super::*;

    #[tokio::test]
    async fn open_yields_a_working_writer() {
        let destination = StdoutDestination;
        let mut writer = destination.open("group", "stream").await.unwrap();
        let event = Event::new(Level::Info, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let msg = Message::new("group", "stream", event).unwrap();
        writer.write_message(&msg).await.unwrap();
        writer.close().await.unwrap();
    }
}
