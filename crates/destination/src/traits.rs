//! The plugin contract every destination backend implements.

use async_trait::async_trait;
use model::Message;

/// Error surfaced by a destination or its writers.
#[derive(thiserror::Error, Debug)]
pub enum DestinationError {
    /// Opening a writer for `(group, stream)` failed.
    #[error("failed to open writer for group {group:?} stream {stream:?}: {source}")]
    Open {
        group: String,
        stream: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Writing to an open writer failed.
    #[error("write failed: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// No destination is registered under the requested name.
    #[error("unknown destination {0:?}")]
    Unknown(String),
}

/// A live, per-`(group, stream)` sink for message batches.
///
/// A [`Destination`] hands one of these back from [`Destination::open`];
/// the scheduler writes batches to it and, when told to close the stream,
/// calls [`Writer::close`] and drops it.
#[async_trait]
pub trait Writer: Send {
    /// Writes a single message.
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError>;

    /// Writes a batch of messages, in order.
    async fn write_message_batch(&mut self, batch: &[Message]) -> Result<(), DestinationError> {
        for msg in batch {
            self.write_message(msg).await?;
        }
        Ok(())
    }

    /// Flushes and releases any resources held by this writer.
    async fn close(self: Box<Self>) -> Result<(), DestinationError>;
}

/// A named backend capable of producing [`Writer`]s for individual
/// `(group, stream)` pairs.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Opens (or returns a cached) writer for `(group, stream)`.
    async fn open(&self, group: &str, stream: &str) -> Result<Box<dyn Writer>, DestinationError>;

    /// Tears down any writer cached for `(group, stream)`, if this
    /// destination caches writers. A no-op for stateless destinations.
    async fn close(&self, _group: &str, _stream: &str) {}
}
