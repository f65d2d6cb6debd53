//! A destination that forwards batches to Amazon Kinesis via a
//! caller-supplied [`BatchShipper`].
//!
//! Partition-key selection and `PutRecords` batching/backoff are owned by
//! the shipper's client, matching the CloudWatch Logs split in
//! [`crate::cloudwatch`].

use std::sync::Arc;

use async_trait::async_trait;
use model::Message;

use crate::ship::BatchShipper;
use crate::traits::{Destination, DestinationError, Writer};

/// Forwards every batch written to it to a [`BatchShipper`], unmodified.
pub struct KinesisDestination {
    shipper: Arc<dyn BatchShipper>,
}

impl KinesisDestination {
    /// Wraps a shipper responsible for the Kinesis `PutRecords` protocol.
    pub fn new(shipper: Arc<dyn BatchShipper>) -> Self {
        Self { shipper }
    }
}

#[async_trait]
impl Destination for KinesisDestination {
    async fn open(&self, group: &str, stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        Ok(Box::new(KinesisWriter { shipper: self.shipper.clone(), group: group.to_string(), stream: stream.to_string() }))
    }
}

struct KinesisWriter {
    shipper: Arc<dyn BatchShipper>,
    group: String,
    stream: String,
}

#[async_trait]
impl Writer for KinesisWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        self.write_message_batch(std::slice::from_ref(msg)).await
    }

    async fn write_message_batch(&mut self, batch: &[Message]) -> Result<(), DestinationError> {
        self.shipper
            .ship(&self.group, &self.stream, batch)
            .await
            .map_err(|err| DestinationError::Write(Box::new(err)))
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        Ok(())
    }
}
