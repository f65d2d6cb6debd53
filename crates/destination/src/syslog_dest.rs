//! A destination backed by pooled syslog connections, used directly for
//! the local `syslog` destination and, with a different address/template
//! preset, for hosted-syslog-intake destinations like Loggly and LogDNA.
//!
//! Unlike [`crate::stdout::StdoutDestination`], this destination caches one
//! writer per `(group, stream)` so that repeated batches reuse a live
//! connection instead of dialing one per flush. [`Destination::close`]
//! evicts and tears down that cached entry immediately — there is no lazy
//! or timed eviction, so a caller that calls `close` before the stream is
//! truly done risks a redial on the next batch, and a caller that never
//! calls it leaks one pooled connection per distinct stream ever seen.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use model::Message;
use pool::ConnectionPool;
use syslog::{SyslogWriter, Transport};
use tokio::sync::Mutex;

use crate::traits::{Destination, DestinationError, Writer};

type CacheKey = (String, String);

/// Settings controlling how messages are rendered before being sent to the
/// pooled syslog connection.
#[derive(Clone, Default)]
pub struct SyslogDestinationConfig {
    pub template: Option<String>,
    pub time_format: Option<String>,
}

/// A destination that writes through a pool of syslog connections, caching
/// one writer per `(group, stream)`.
pub struct PooledSyslogDestination {
    pool: Arc<ConnectionPool<Transport>>,
    config: SyslogDestinationConfig,
    cache: Arc<Mutex<HashMap<CacheKey, Arc<Mutex<SyslogWriter>>>>>,
}

impl PooledSyslogDestination {
    /// Wraps an existing pool of syslog transports.
    pub fn new(pool: Arc<ConnectionPool<Transport>>, config: SyslogDestinationConfig) -> Self {
        Self { pool, config, cache: Arc::new(Mutex::new(HashMap::new())) }
    }
}

#[async_trait]
impl Destination for PooledSyslogDestination {
    async fn open(&self, group: &str, stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        let key = (group.to_string(), stream.to_string());

        let mut cache = self.cache.lock().await;
        if let Some(writer) = cache.get(&key) {
            return Ok(Box::new(CachedSyslogWriter {
                inner: writer.clone(),
                cache: self.cache.clone(),
                pool: self.pool.clone(),
                key,
            }));
        }

        let conn = self.pool.get().await.map_err(|err| DestinationError::Open {
            group: group.to_string(),
            stream: stream.to_string(),
            source: Box::new(err),
        })?;

        let writer =
            SyslogWriter::new(conn, self.config.template.as_deref(), self.config.time_format.as_deref()).map_err(|err| {
                DestinationError::Open { group: group.to_string(), stream: stream.to_string(), source: Box::new(err) }
            })?;

        let writer = Arc::new(Mutex::new(writer));
        cache.insert(key.clone(), writer.clone());
        Ok(Box::new(CachedSyslogWriter { inner: writer, cache: self.cache.clone(), pool: self.pool.clone(), key }))
    }

    async fn close(&self, group: &str, stream: &str) {
        let mut cache = self.cache.lock().await;
        if let Some(writer) = cache.remove(&(group.to_string(), stream.to_string())) {
            if let Ok(writer) = Arc::try_unwrap(writer).map(Mutex::into_inner) {
                let conn = writer.into_transport();
                let pool = self.pool.clone();
                tokio::spawn(async move {
                    let _ = pool.put(conn, false).await;
                });
            }
        }
    }
}

struct CachedSyslogWriter {
    inner: Arc<Mutex<SyslogWriter>>,
    cache: Arc<Mutex<HashMap<CacheKey, Arc<Mutex<SyslogWriter>>>>>,
    pool: Arc<ConnectionPool<Transport>>,
    key: CacheKey,
}

impl CachedSyslogWriter {
    /// Evicts this writer from the cache and hands its transport back to the
    /// pool marked dead, so the next `open` for this stream re-dials instead
    /// of reusing a connection a write just failed on.
    fn evict_dead(&self) {
        let cache = self.cache.clone();
        let pool = self.pool.clone();
        let key = self.key.clone();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut cache = cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                if Arc::ptr_eq(cached, &inner) {
                    let _ = cache.remove(&key);
                }
            }
            drop(cache);
            if let Ok(writer) = Arc::try_unwrap(inner).map(Mutex::into_inner) {
                let conn = writer.into_transport();
                let _ = pool.put(conn, true).await;
            }
        });
    }
}

#[async_trait]
impl Writer for CachedSyslogWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        let mut writer = self.inner.lock().await;
        let result = writer.write_message(msg).await;
        drop(writer);
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.evict_dead();
                Err(DestinationError::Write(Box::new(err)))
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        // The connection stays cached for reuse by the next batch; only
        // flush, don't tear down. Eviction happens via `Destination::close`.
        let mut writer = self.inner.lock().await;
        let result = writer.flush().await;
        drop(writer);
        if let Err(err) = result {
            self.evict_dead();
            return Err(DestinationError::Write(Box::new(err)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use pool::{Dial, PoolError};

    use super::*;

    struct PairDialer;

    #[async_trait]
    impl Dial for PairDialer {
        type Connection = Transport;

        async fn dial(&self) -> Result<Transport, PoolError> {
            let (a, _b) = tokio::net::UnixDatagram::pair().map_err(|e| PoolError::Dial(Box::new(e)))?;
            Ok(Transport::Datagram(a))
        }
    }

    #[tokio::test]
    async fn open_caches_writer_across_calls_until_closed() {
        let pool = Arc::new(ConnectionPool::new(2, PairDialer).await.unwrap());
        let destination = PooledSyslogDestination::new(pool, SyslogDestinationConfig::default());

        let _first = destination.open("group", "stream").await.unwrap();
        assert_eq!(destination.cache.lock().await.len(), 1);

        let _second = destination.open("group", "stream").await.unwrap();
        assert_eq!(destination.cache.lock().await.len(), 1, "second open should reuse the cached writer");

        destination.close("group", "stream").await;
        assert!(destination.cache.lock().await.is_empty());
    }
}
