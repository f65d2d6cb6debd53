//! Connection establishment and framing for a syslog destination.
//!
//! Datagram and stream transports are distinguished at construction time
//! rather than by probing the connection's behavior at write time: the
//! original implementation accepted any `io.Writer` and flushed
//! unconditionally, which papered over the fact that a datagram socket
//! needs one send per message while a stream socket can be buffered and
//! flushed in bulk.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixDatagram, UnixStream};

const LOCAL_UNIXGRAM_ADDRS: &[&str] = &["/dev/log", "/var/run/syslog", "/var/run/log"];
const REMOTE_DIAL_RETRIES: u32 = 3;
const REMOTE_DIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Error establishing or writing to a syslog transport.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// None of the local syslog socket candidates could be reached.
    #[error("no local syslog socket found among {0:?}")]
    NoLocalSocket(Vec<&'static str>),
    /// A TCP dial to a remote destination failed after all retries.
    #[error("failed to connect to {address} after {attempts} attempts: {source}")]
    RemoteDial {
        address: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
    /// A TLS handshake with a remote destination failed.
    #[error("tls handshake with {address} failed: {source}")]
    TlsHandshake {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// A write to an established transport failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
    /// The event could not be JSON-encoded for the MSG field.
    #[error("failed to encode event as json: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A live connection to a syslog destination, framed according to whether
/// the underlying socket is datagram- or stream-oriented.
pub enum Transport {
    /// A local `AF_UNIX` datagram socket (the common `/dev/log` case): one
    /// `send` per rendered line.
    Datagram(UnixDatagram),
    /// Any stream-oriented transport (unix stream, TCP, or TLS-over-TCP):
    /// buffered, flushed once per batch.
    Stream(Box<dyn AsyncWrite + Unpin + Send>),
}

impl Transport {
    /// Writes one already-rendered, newline-terminated line.
    pub async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        match self {
            Transport::Datagram(sock) => {
                sock.send(line.as_bytes()).await.map_err(TransportError::Write)?;
            }
            Transport::Stream(stream) => {
                stream.write_all(line.as_bytes()).await.map_err(TransportError::Write)?;
            }
        }
        Ok(())
    }

    /// Flushes any buffered bytes. A no-op for datagram sockets, which have
    /// nothing to buffer.
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        if let Transport::Stream(stream) = self {
            stream.flush().await.map_err(TransportError::Write)?;
        }
        Ok(())
    }
}

/// Dials the local syslog socket, trying `unixgram` candidates first (the
/// common case) and falling back to `unix` stream sockets at the same
/// paths.
pub async fn dial_local() -> Result<Transport, TransportError> {
    for addr in LOCAL_UNIXGRAM_ADDRS {
        if let Ok(sock) = dial_unixgram(addr).await {
            return Ok(Transport::Datagram(sock));
        }
    }

    for addr in LOCAL_UNIXGRAM_ADDRS {
        if let Ok(stream) = UnixStream::connect(addr).await {
            return Ok(Transport::Stream(Box::new(stream)));
        }
    }

    Err(TransportError::NoLocalSocket(LOCAL_UNIXGRAM_ADDRS.to_vec()))
}

async fn dial_unixgram(addr: &str) -> std::io::Result<UnixDatagram> {
    if !Path::new(addr).exists() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
    }
    let sock = UnixDatagram::unbound()?;
    sock.connect(addr)?;
    Ok(sock)
}

/// Dials a remote TCP destination, retrying up to [`REMOTE_DIAL_RETRIES`]
/// times with a fixed delay between attempts.
pub async fn dial_remote(address: &str) -> Result<Transport, TransportError> {
    let stream = dial_tcp_with_retry(address).await?;
    Ok(Transport::Stream(Box::new(stream)))
}

/// Dials a remote TCP destination and wraps it in a TLS session, used for
/// destinations that require an encrypted transport (e.g. hosted syslog
/// intake over the public internet).
pub async fn dial_remote_tls(
    address: &str,
    connector: &tokio_rustls::TlsConnector,
    server_name: tokio_rustls::rustls::pki_types::ServerName<'static>,
) -> Result<Transport, TransportError> {
    let stream = dial_tcp_with_retry(address).await?;
    let tls = connector
        .connect(server_name, stream)
        .await
        .map_err(|source| TransportError::TlsHandshake { address: address.to_string(), source })?;
    Ok(Transport::Stream(Box::new(tls)))
}

async fn dial_tcp_with_retry(address: &str) -> Result<TcpStream, TransportError> {
    let mut last_err = None;

    for attempt in 1..=REMOTE_DIAL_RETRIES {
        match TcpStream::connect(address).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                tracing::warn!(address, attempt, error = %err, "syslog dial attempt failed");
                last_err = Some(err);
                if attempt < REMOTE_DIAL_RETRIES {
                    tokio::time::sleep(REMOTE_DIAL_RETRY_DELAY).await;
                }
            }
        }
    }

    Err(TransportError::RemoteDial {
        address: address.to_string(),
        attempts: REMOTE_DIAL_RETRIES,
        source: last_err.expect("loop runs at least once"),
    })
}
