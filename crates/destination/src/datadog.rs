//! A destination that reports one StatsD counter increment per message,
//! tagged by level, to a local or remote Datadog agent.

use async_trait::async_trait;
use model::Message;
use tokio::net::UdpSocket;

use crate::traits::{Destination, DestinationError, Writer};

/// Sends `logrelay.<group>.<level>:1|c` counters over UDP for every
/// message written.
pub struct DatadogStatsdDestination {
    address: String,
}

impl DatadogStatsdDestination {
    /// Targets `address` (`host:port`), defaulting to `localhost:8125` —
    /// the conventional local Datadog agent StatsD port — when empty.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self { address: if address.is_empty() { "localhost:8125".to_string() } else { address } }
    }
}

#[async_trait]
impl Destination for DatadogStatsdDestination {
    async fn open(&self, group: &str, _stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|err| DestinationError::Open {
            group: group.to_string(),
            stream: _stream.to_string(),
            source: Box::new(err),
        })?;
        socket.connect(&self.address).await.map_err(|err| DestinationError::Open {
            group: group.to_string(),
            stream: _stream.to_string(),
            source: Box::new(err),
        })?;

        Ok(Box::new(StatsdWriter { socket, prefix: format!("logrelay.{group}.") }))
    }
}

struct StatsdWriter {
    socket: UdpSocket,
    prefix: String,
}

#[async_trait]
impl Writer for StatsdWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        let metric = format!("{}{}:1|c", self.prefix, msg.event.level.to_string().to_lowercase());
        self.socket.send(metric.as_bytes()).await.map_err(|err| DestinationError::Write(Box::new(err)))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        Ok(())
    }
}
