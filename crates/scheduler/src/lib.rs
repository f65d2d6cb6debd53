//! The event loop that ties readers, the store, and destinations together:
//! messages flow in from readers, are buffered by `(group, stream)`, and
//! flushed batches are dispatched concurrently to every configured
//! destination.

mod flush;

pub use flush::{drain_flushes, FlushThresholds, FlushedStream};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use destination::Destination;
use reader::Reader;
use store::Store;
use task::labels::TaskLabels;
use task::TaskManager;

/// Error returned by [`Scheduler::run`]. The loop itself does not retry or
/// propagate per-message/per-batch failures — those are logged and
/// dropped — so this only covers setup problems.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// No destinations were configured; there would be nowhere to route
    /// flushed batches.
    #[error("no destinations configured")]
    NoDestinations,
}

/// A named source feeding the scheduler.
pub struct Source {
    pub name: String,
    pub reader: Box<dyn Reader>,
}

/// A named destination batches are fanned out to.
#[derive(Clone)]
pub struct Target {
    pub name: String,
    pub destination: Arc<dyn Destination>,
}

/// Owns the buffering store and drives the main event loop.
pub struct Scheduler {
    store: Store,
    thresholds: FlushThresholds,
    cache_timeout: chrono::Duration,
    flush_tick: Duration,
    targets: Vec<Target>,
    tasks: TaskManager,
}

impl Scheduler {
    /// Builds a scheduler with the given flush thresholds, idle-eviction
    /// timeout, and destinations. `flush_tick` should be about half of
    /// `thresholds.max_time`, so a time-triggered flush fires close to its
    /// deadline without busy-polling.
    pub fn new(thresholds: FlushThresholds, cache_timeout: chrono::Duration, flush_tick: Duration, targets: Vec<Target>) -> Result<Self, SchedulerError> {
        if targets.is_empty() {
            return Err(SchedulerError::NoDestinations);
        }

        Ok(Self {
            store: Store::new(),
            thresholds,
            cache_timeout,
            flush_tick,
            targets,
            tasks: TaskManager::new(),
        })
    }

    /// Runs the scheduler to completion: fans readers in, buffers and
    /// flushes messages, and returns once every reader has reached EOF (or
    /// `shutdown` fired) and every in-flight writer task has finished.
    pub async fn run(mut self, sources: Vec<Source>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let (tx, rx) = flume::bounded(sources.len().max(1) * 64);

        for (index, source) in sources.into_iter().enumerate() {
            let tx = tx.clone();
            let shutdown_rx = shutdown.clone();
            let labels = TaskLabels::new("reader", &index.to_string(), &source.name);
            let handle = tokio::spawn(run_reader(source.reader, source.name, tx, shutdown_rx));
            self.tasks.register(handle, &labels);
        }
        drop(tx);

        let mut tick = tokio::time::interval(self.flush_tick);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = rx.recv_async() => {
                    match received {
                        Ok(msg) => {
                            self.store.add(msg, Utc::now());
                            self.dispatch(Utc::now(), false);
                        }
                        Err(_) => break,
                    }
                }
                _ = tick.tick() => {
                    let now = Utc::now();
                    self.dispatch(now, false);
                    self.evict_expired(now).await;
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        tracing::info!("shutdown requested, waiting for readers to drain");
                    }
                }
            }
        }

        let now = Utc::now();
        self.dispatch(now, true);
        self.evict_expired(now).await;
        self.tasks.join().await;
    }

    /// Evicts idle, empty streams and tears down their cached writers on
    /// every configured target, so a destination's pooled connections are
    /// released instead of held open for a stream that will never flush
    /// again.
    async fn evict_expired(&mut self, now: chrono::DateTime<Utc>) {
        for stream in self.store.remove_expired(self.cache_timeout, now) {
            for target in &self.targets {
                target.destination.close(stream.group(), stream.name()).await;
            }
        }
    }

    fn dispatch(&mut self, now: chrono::DateTime<Utc>, force: bool) {
        for flushed in drain_flushes(&mut self.store, &self.thresholds, force, now) {
            tracing::debug!(
                group = flushed.group,
                stream = flushed.stream,
                reason = flushed.reason,
                count = flushed.batch.len(),
                "flushing batch"
            );

            let batch = Arc::new(flushed.batch);
            for target in &self.targets {
                let target = target.clone();
                let batch = batch.clone();
                let group = flushed.group.clone();
                let stream = flushed.stream.clone();
                let labels = TaskLabels::new("writer", &target.name, &format!("{group}/{stream}"));
                let handle = tokio::spawn(write_batch(target, group, stream, batch));
                self.tasks.register(handle, &labels);
            }
        }
    }
}

async fn run_reader(
    mut reader: Box<dyn Reader>,
    name: String,
    tx: flume::Sender<model::Message>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Box<dyn task::TaskCleaner> {
    loop {
        tokio::select! {
            result = reader.read_message() => {
                match result {
                    Ok(Some(msg)) => {
                        if tx.send_async(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(source = name, error = %err, "reader failed, stopping");
                        break;
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    if let Err(err) = reader.close().await {
        tracing::warn!(source = name, error = %err, "error closing reader");
    }

    Box::new(NoopCleaner)
}

async fn write_batch(target: Target, group: String, stream: String, batch: Arc<Vec<model::Message>>) -> Box<dyn task::TaskCleaner> {
    let result = async {
        let mut writer = target.destination.open(&group, &stream).await?;
        writer.write_message_batch(&batch).await?;
        writer.close().await
    }
    .await;

    if let Err(err) = result {
        tracing::warn!(destination = target.name, group, stream, error = %err, "dropping batch after write failure");
    }

    Box::new(NoopCleaner)
}

#[derive(Debug)]
struct NoopCleaner;

#[async_trait]
impl task::TaskCleaner for NoopCleaner {
    async fn cleanup(&self) {}
}
