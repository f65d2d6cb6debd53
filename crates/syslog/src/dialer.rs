//! [`pool::Dial`] implementations used to back a [`pool::ConnectionPool`]
//! of syslog [`Transport`]s.

use async_trait::async_trait;
use pool::PoolError;

use crate::transport::{self, Transport};

impl From<crate::transport::TransportError> for PoolError {
    fn from(err: crate::transport::TransportError) -> Self {
        PoolError::Dial(Box::new(err))
    }
}

/// Dials the local syslog socket (`/dev/log` and friends) on every call.
pub struct LocalDialer;

#[async_trait]
impl pool::Dial for LocalDialer {
    type Connection = Transport;

    async fn dial(&self) -> Result<Transport, PoolError> {
        Ok(transport::dial_local().await?)
    }
}

/// Dials a remote `host:port` over plain TCP on every call.
pub struct RemoteDialer {
    pub address: String,
}

#[async_trait]
impl pool::Dial for RemoteDialer {
    type Connection = Transport;

    async fn dial(&self) -> Result<Transport, PoolError> {
        Ok(transport::dial_remote(&self.address).await?)
    }
}

/// Dials a remote `host:port` over TLS-wrapped TCP on every call.
pub struct RemoteTlsDialer {
    pub address: String,
    pub connector: tokio_rustls::TlsConnector,
    pub server_name: tokio_rustls::rustls::pki_types::ServerName<'static>,
}

#[async_trait]
impl pool::Dial for RemoteTlsDialer {
    type Connection = Transport;

    async fn dial(&self) -> Result<Transport, PoolError> {
        Ok(transport::dial_remote_tls(&self.address, &self.connector, self.server_name.clone()).await?)
    }
}
