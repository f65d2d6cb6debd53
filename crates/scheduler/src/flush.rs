//! Draining due batches out of the store.

use chrono::{DateTime, Utc};
use model::Message;
use store::{Store, StreamLimits};

/// Flush thresholds shared by every stream, without the `force` bit (which
/// varies per call: periodic ticks flush only what's due, shutdown and EOF
/// force-flush everything).
#[derive(Debug, Clone, Copy)]
pub struct FlushThresholds {
    pub max_count: usize,
    pub max_bytes: usize,
    pub max_time: chrono::Duration,
}

impl FlushThresholds {
    fn limits(&self, force: bool) -> StreamLimits {
        StreamLimits { max_count: self.max_count, max_bytes: self.max_bytes, max_time: self.max_time, force }
    }
}

/// One batch drained out of a stream, ready to hand to the destinations.
pub struct FlushedStream {
    pub group: String,
    pub stream: String,
    pub reason: &'static str,
    pub batch: Vec<Message>,
}

/// Drains every stream in `store` of whatever is due under `thresholds`
/// (or everything, if `force`), returning one [`FlushedStream`] per
/// non-empty batch. A single stream can contribute more than one batch per
/// call if it has enough buffered to exceed a threshold multiple times
/// over.
pub fn drain_flushes(store: &mut Store, thresholds: &FlushThresholds, force: bool, now: DateTime<Utc>) -> Vec<FlushedStream> {
    let limits = thresholds.limits(force);
    let mut out = Vec::new();

    store.for_each(|group| {
        group.for_each(|stream| loop {
            let flushed = stream.flush(&limits, now);
            if flushed.batch.is_empty() {
                break;
            }
            let mut batch = flushed.batch;
            store::sort_by_time(&mut batch);
            out.push(FlushedStream {
                group: stream.group().to_string(),
                stream: stream.name().to_string(),
                reason: flushed.reason,
                batch,
            });
        });
    });

    out
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use model::{Event, Level};

    use super::*;

    fn msg(group: &str, stream: &str, secs: i64) -> Message {
        let time = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Message::new(group, stream, Event::new(Level::Info, time)).unwrap()
    }

    #[test]
    fn force_drains_every_buffered_message() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut store = Store::new();
        store.add(msg("g", "a", 0), now);
        store.add(msg("g", "b", 1), now);

        let thresholds = FlushThresholds { max_count: 1_000, max_bytes: 1_000_000, max_time: chrono::Duration::seconds(3600) };
        let flushed = drain_flushes(&mut store, &thresholds, true, now);

        assert_eq!(flushed.len(), 2);
        assert!(flushed.iter().all(|f| f.reason == "forced flushing"));
    }

    #[test]
    fn non_forced_leaves_under_threshold_streams_buffered() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut store = Store::new();
        store.add(msg("g", "a", 0), now);

        let thresholds = FlushThresholds { max_count: 1_000, max_bytes: 1_000_000, max_time: chrono::Duration::seconds(3600) };
        let flushed = drain_flushes(&mut store, &thresholds, false, now);
        assert!(flushed.is_empty());
    }
}
