//! A destination that forwards batches to Amazon CloudWatch Logs via a
//! caller-supplied [`BatchShipper`].
//!
//! Sequence-token handshaking and log-group/stream creation are service
//! bookkeeping owned by the shipper's client, not this plugin; throttling
//! is likewise left to the shipper (retried or not, at its discretion) —
//! this destination only batches and hands off. What this plugin does own
//! is serialization: CloudWatch's `PutLogEvents` sequence-token protocol
//! requires that writes to the same stream never run concurrently, so one
//! writer is cached and lock-guarded per `(group, stream)`, the same as
//! [`crate::syslog_dest::PooledSyslogDestination`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use model::Message;
use tokio::sync::Mutex;

use crate::ship::BatchShipper;
use crate::traits::{Destination, DestinationError, Writer};

type CacheKey = (String, String);

/// Forwards every batch written to it to a [`BatchShipper`], unmodified,
/// serializing writes per `(group, stream)`.
pub struct CloudWatchLogsDestination {
    shipper: Arc<dyn BatchShipper>,
    cache: Mutex<HashMap<CacheKey, Arc<Mutex<CloudWatchLogsWriter>>>>,
}

impl CloudWatchLogsDestination {
    /// Wraps a shipper responsible for the CloudWatch Logs `PutLogEvents`
    /// protocol.
    pub fn new(shipper: Arc<dyn BatchShipper>) -> Self {
        Self { shipper, cache: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl Destination for CloudWatchLogsDestination {
    async fn open(&self, group: &str, stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        let key = (group.to_string(), stream.to_string());

        let mut cache = self.cache.lock().await;
        let writer = cache
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(CloudWatchLogsWriter {
                    shipper: self.shipper.clone(),
                    group: group.to_string(),
                    stream: stream.to_string(),
                }))
            })
            .clone();

        Ok(Box::new(CachedCloudWatchWriter { inner: writer }))
    }

    async fn close(&self, group: &str, stream: &str) {
        let mut cache = self.cache.lock().await;
        let _ = cache.remove(&(group.to_string(), stream.to_string()));
    }
}

struct CloudWatchLogsWriter {
    shipper: Arc<dyn BatchShipper>,
    group: String,
    stream: String,
}

impl CloudWatchLogsWriter {
    async fn write_message_batch(&mut self, batch: &[Message]) -> Result<(), DestinationError> {
        self.shipper
            .ship(&self.group, &self.stream, batch)
            .await
            .map_err(|err| DestinationError::Write(Box::new(err)))
    }
}

struct CachedCloudWatchWriter {
    inner: Arc<Mutex<CloudWatchLogsWriter>>,
}

#[async_trait]
impl Writer for CachedCloudWatchWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        self.write_message_batch(std::slice::from_ref(msg)).await
    }

    async fn write_message_batch(&mut self, batch: &[Message]) -> Result<(), DestinationError> {
        let mut writer = self.inner.lock().await;
        writer.write_message_batch(batch).await
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        // The writer stays cached for the next batch; teardown happens via
        // `Destination::close`.
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use model::{Event, Level};
    use tokio::sync::Mutex as StdMutex;

    use super::*;

    struct RecordingShipper {
        calls: StdMutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl BatchShipper for RecordingShipper {
        async fn ship(&self, group: &str, stream: &str, batch: &[Message]) -> Result<(), crate::ship::ShipError> {
            self.calls.lock().await.push((group.to_string(), stream.to_string(), batch.len()));
            Ok(())
        }
    }

    fn sample_message() -> Message {
        let event = Event::new(Level::Info, Utc::now());
        Message::new("group", "stream", event).unwrap()
    }

    #[tokio::test]
    async fn open_caches_writer_across_calls_until_closed() {
        let shipper = Arc::new(RecordingShipper { calls: StdMutex::new(Vec::new()) });
        let destination = CloudWatchLogsDestination::new(shipper);

        let _first = destination.open("group", "stream").await.unwrap();
        assert_eq!(destination.cache.lock().await.len(), 1);

        let _second = destination.open("group", "stream").await.unwrap();
        assert_eq!(destination.cache.lock().await.len(), 1, "second open should reuse the cached writer");

        destination.close("group", "stream").await;
        assert!(destination.cache.lock().await.is_empty());
    }

    #[tokio::test]
    async fn write_message_forwards_a_single_message_batch() {
        let shipper = Arc::new(RecordingShipper { calls: StdMutex::new(Vec::new()) });
        let destination = CloudWatchLogsDestination::new(shipper.clone());

        let mut writer = destination.open("group", "stream").await.unwrap();
        writer.write_message(&sample_message()).await.unwrap();

        let calls = shipper.calls.lock().await;
        assert_eq!(calls.as_slice(), &[("group".to_string(), "stream".to_string(), 1)]);
    }
}
