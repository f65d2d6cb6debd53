//! The boundary between this crate and a managed-service wire client.
//!
//! CloudWatch Logs and Kinesis both require service-specific request
//! shapes, auth, sequence-token/partition-key bookkeeping, and retry/
//! throttling policy that belong to an AWS SDK client, not to this
//! destination plugin. [`BatchShipper`] is that boundary: a destination
//! backed by a managed service batches and retries at the
//! [`crate::Writer`] level, then hands the batch to whatever
//! [`BatchShipper`] the caller configured.

use async_trait::async_trait;
use model::Message;

/// Ships a batch of messages for one `(group, stream)` to a managed
/// service. Implementations own their own client, auth, and wire encoding.
#[async_trait]
pub trait BatchShipper: Send + Sync {
    /// Ships `batch`, returning an error if the service rejected it.
    async fn ship(&self, group: &str, stream: &str, batch: &[Message]) -> Result<(), ShipError>;
}

/// Error returned by a [`BatchShipper`].
#[derive(thiserror::Error, Debug)]
#[error("failed to ship batch: {0}")]
pub struct ShipError(#[source] pub Box<dyn std::error::Error + Send + Sync>);
