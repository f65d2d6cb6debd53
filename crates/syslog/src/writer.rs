//! Renders messages into syslog lines and writes them to a [`Transport`].

use model::Message;

use crate::template::{RenderFields, Template};
use crate::transport::{Transport, TransportError};

/// Writes batches of messages as syslog-framed lines over a [`Transport`].
///
/// A batch write aborts at the first error rather than retrying or
/// skipping the offending message: a write failure almost always means the
/// connection itself is bad, and the caller is expected to mark the
/// connection dead and let the pool dial a replacement.
pub struct SyslogWriter {
    transport: Transport,
    template: Template,
    time_format: String,
    line: String,
}

impl SyslogWriter {
    /// Wraps `transport`, rendering with `template` (or the default when
    /// `None`) and `time_format` (or `"%b %e %T"`, matching the historical
    /// `time.Stamp` format, when `None`).
    pub fn new(transport: Transport, template: Option<&str>, time_format: Option<&str>) -> Result<Self, crate::template::TemplateError> {
        let template = Template::parse(template.unwrap_or(crate::template::DEFAULT_TEMPLATE))?;
        Ok(Self {
            transport,
            template,
            time_format: time_format.unwrap_or("%b %e %T").to_string(),
            line: String::new(),
        })
    }

    /// Writes every message in `batch`, stopping at the first error.
    pub async fn write_message_batch(&mut self, batch: &[Message]) -> Result<(), TransportError> {
        for msg in batch {
            self.write_message(msg).await?;
        }
        Ok(())
    }

    /// Renders and writes a single message, flushing immediately. The MSG
    /// field carries the full JSON serialization of the event (not just its
    /// human-readable message), so the original level/time/data survive a
    /// round trip through the rendered line.
    pub async fn write_message(&mut self, msg: &Message) -> Result<(), TransportError> {
        let timestamp = msg.event.time.format(&self.time_format).to_string();
        let source = if msg.event.info.source.is_empty() {
            String::new()
        } else {
            msg.event.info.source.clone()
        };
        let encoded_event = serde_json::to_string(&msg.event).map_err(TransportError::Encode)?;

        self.line.clear();
        self.template.render(
            &mut self.line,
            &RenderFields {
                prival: msg.event.level.prival(),
                hostname: &msg.event.info.host,
                procid: msg.event.info.pid,
                msgid: &msg.event.info.id,
                group: &msg.group,
                stream: &msg.stream,
                tag: &msg.group,
                msg: &encoded_event,
                timestamp: &timestamp,
                source: &source,
            },
        );

        self.transport.write_line(&self.line).await?;
        self.transport.flush().await
    }

    /// Flushes any buffered bytes without releasing the transport. Used
    /// when the writer is cached and reused across batches.
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        self.transport.flush().await
    }

    /// Flushes and consumes the writer, releasing the transport.
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.transport.flush().await
    }

    /// Tears down the writer and hands back the underlying transport, so
    /// it can be returned to a [`pool::ConnectionPool`].
    pub fn into_transport(self) -> Transport {
        self.transport
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use model::{Event, Level};
    use tokio::net::UnixDatagram;

    use super::*;

    #[tokio::test]
    async fn writes_default_framed_line_over_a_datagram_pair() {
        let dir = tempdir();
        let server_path = dir.join("server.sock");
        let server = UnixDatagram::bind(&server_path).unwrap();

        let client = UnixDatagram::unbound().unwrap();
        client.connect(&server_path).unwrap();

        let mut writer = SyslogWriter::new(Transport::Datagram(client), None, None).unwrap();
        let event = Event::new(Level::Error, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let msg = Message::new("billing", "worker-1", event).unwrap();

        writer.write_message(&msg).await.unwrap();

        let mut buf = [0u8; 512];
        let n = server.recv(&mut buf).await.unwrap();
        let line = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(line.starts_with("<"), "line should start with a PRIVAL: {line}");
        assert!(line.contains("billing[worker-1]:"), "line should carry group/stream: {line}");
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("syslog-writer-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }
}
