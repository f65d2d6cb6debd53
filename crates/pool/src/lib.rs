//! A bounded pool of live connections, replenished by a background dialer
//! task with exponential backoff on dial failure.
//!
//! Grounded on the original `LimitedConnPool`: the total number of live
//! connections never exceeds the configured size, and callers are expected
//! to return every connection obtained via [`ConnectionPool::get`] through
//! [`ConnectionPool::put`], dead or not.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;

const MIN_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Error surfaced when dialing a new connection fails, or when the pool has
/// been shut down.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// The dialer could not produce a connection.
    #[error("dial failed: {0}")]
    Dial(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The pool has been shut down and can no longer hand out connections.
    #[error("connection pool is shut down")]
    Closed,
}

/// Produces new connections on demand.
#[async_trait]
pub trait Dial: Send + Sync + 'static {
    /// The connection type this dialer produces.
    type Connection: Send + 'static;

    /// Dials a new connection.
    async fn dial(&self) -> Result<Self::Connection, PoolError>;
}

/// A pool of at most `size` live connections of type `C`.
pub struct ConnectionPool<C: Send + 'static> {
    size: usize,
    conns_tx: flume::Sender<C>,
    conns_rx: flume::Receiver<C>,
    live: Arc<AtomicUsize>,
    signal: Arc<tokio::sync::Notify>,
    errors_rx: flume::Receiver<PoolError>,
    dialer_task: tokio::task::JoinHandle<()>,
}

impl<C: Send + 'static> ConnectionPool<C> {
    /// Creates a pool with room for `size` live connections, dialing one
    /// connection eagerly to fail fast if the destination is unreachable.
    pub async fn new<D>(size: usize, dialer: D) -> Result<Self, PoolError>
    where
        D: Dial<Connection = C>,
    {
        let conn = dialer.dial().await?;

        let (conns_tx, conns_rx) = flume::bounded(size);
        let (errors_tx, errors_rx) = flume::bounded(size);
        let live = Arc::new(AtomicUsize::new(1));
        let signal = Arc::new(tokio::sync::Notify::new());

        conns_tx
            .send_async(conn)
            .await
            .map_err(|_| PoolError::Closed)?;

        let dialer = Arc::new(dialer);
        let dialer_task = tokio::spawn(run_dialer(
            dialer,
            conns_tx.clone(),
            live.clone(),
            signal.clone(),
            errors_tx,
            size,
        ));

        // Kick off the dialer in case more room opened up while the
        // tentative connection above was in flight.
        signal.notify_one();

        Ok(Self {
            size,
            conns_tx,
            conns_rx,
            live,
            signal,
            errors_rx,
            dialer_task,
        })
    }

    /// Retrieves a connection from the pool, waiting for one to become
    /// available if none is ready.
    pub async fn get(&self) -> Result<C, PoolError> {
        self.conns_rx.recv_async().await.map_err(|_| PoolError::Closed)
    }

    /// Returns a connection to the pool. When `dead` is set, the connection
    /// is dropped instead and the dialer is woken to replace it.
    pub async fn put(&self, conn: C, dead: bool) -> Result<(), PoolError> {
        if dead {
            self.live.fetch_sub(1, Ordering::AcqRel);
            self.signal.notify_one();
            drop(conn);
            return Ok(());
        }

        self.conns_tx.send_async(conn).await.map_err(|_| PoolError::Closed)
    }

    /// A receiver of dial errors. Errors are dropped if this channel is not
    /// drained promptly.
    pub fn errors(&self) -> flume::Receiver<PoolError> {
        self.errors_rx.clone()
    }

    /// The configured maximum number of live connections.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stops the background dialer and closes the pool; outstanding
    /// connections already checked out remain usable but cannot be
    /// returned.
    pub fn shutdown(&self) {
        self.dialer_task.abort();
    }
}

impl<C: Send + 'static> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        self.dialer_task.abort();
    }
}

async fn run_dialer<D>(
    dialer: Arc<D>,
    conns_tx: flume::Sender<D::Connection>,
    live: Arc<AtomicUsize>,
    signal: Arc<tokio::sync::Notify>,
    errors_tx: flume::Sender<PoolError>,
    size: usize,
) where
    D: Dial,
{
    let mut backoff = MIN_BACKOFF;

    loop {
        signal.notified().await;

        while live.load(Ordering::Acquire) < size {
            match dialer.dial().await {
                Ok(conn) => {
                    if conns_tx.send_async(conn).await.is_err() {
                        return;
                    }
                    live.fetch_add(1, Ordering::AcqRel);
                    backoff = MIN_BACKOFF;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to dial replacement connection");
                    let _ = errors_tx.try_send(err);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize as StdAtomicUsize, Ordering as StdOrdering};

    use super::*;

    struct CountingDialer {
        calls: Arc<StdAtomicUsize>,
        fail_first_n: usize,
    }

    #[async_trait]
    impl Dial for CountingDialer {
        type Connection = u64;

        async fn dial(&self) -> Result<u64, PoolError> {
            let n = self.calls.fetch_add(1, StdOrdering::SeqCst);
            if n < self.fail_first_n {
                return Err(PoolError::Dial(Box::from("simulated failure")));
            }
            Ok(n as u64)
        }
    }

    #[tokio::test]
    async fn get_and_put_clean_recycles_the_connection() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let dialer = CountingDialer { calls: calls.clone(), fail_first_n: 0 };
        let pool = ConnectionPool::new(2, dialer).await.unwrap();

        let conn = pool.get().await.unwrap();
        pool.put(conn, false).await.unwrap();

        let again = pool.get().await.unwrap();
        assert_eq!(again, 0);
        // Only the initial tentative dial happened; nothing was dead.
        assert_eq!(calls.load(StdOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn put_dead_triggers_a_replacement_dial() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let dialer = CountingDialer { calls: calls.clone(), fail_first_n: 0 };
        let pool = ConnectionPool::new(1, dialer).await.unwrap();

        let conn = pool.get().await.unwrap();
        pool.put(conn, true).await.unwrap();

        let replacement = tokio::time::timeout(Duration::from_secs(1), pool.get())
            .await
            .expect("dialer should replace the dead connection")
            .unwrap();
        assert_eq!(replacement, 1);
    }

    #[tokio::test]
    async fn never_exceeds_configured_live_count() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let dialer = CountingDialer { calls: calls.clone(), fail_first_n: 0 };
        let pool = ConnectionPool::new(2, dialer).await.unwrap();

        let a = pool.get().await.unwrap();
        let b = pool.get().await.unwrap();
        assert_ne!(a, b);

        // Both live connections are checked out; a third get() has nothing
        // to receive until one is returned.
        let third = tokio::time::timeout(Duration::from_millis(200), pool.get()).await;
        assert!(third.is_err());
        assert_eq!(calls.load(StdOrdering::SeqCst), 2);

        pool.put(a, false).await.unwrap();
    }
}
