//! In-memory buffering of messages by `(group, stream)`, and the flush
//! triggers that decide when a buffered batch is due for delivery.

mod group;
mod store;
mod stream;

pub use group::Group;
pub use store::Store;
pub use stream::{Flushed, Stream, StreamLimits};

use model::Message;

/// Stably sorts a batch by event time, ascending. Used before handing a
/// batch to a writer: messages accumulate in arrival order, which need not
/// match event-time order once slow readers interleave with fast ones.
pub fn sort_by_time(batch: &mut [Message]) {
    batch.sort_by_key(|msg| msg.event.time);
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use model::{Event, Level};

    use super::*;

    #[test]
    fn sort_by_time_orders_ascending_and_is_stable() {
        let mut batch = vec![
            Message::new("g", "s", Event::new(Level::Info, Utc.timestamp_opt(300, 0).unwrap())).unwrap(),
            Message::new("g", "s", Event::new(Level::Info, Utc.timestamp_opt(100, 0).unwrap())).unwrap(),
            Message::new("g", "s", Event::new(Level::Info, Utc.timestamp_opt(200, 0).unwrap())).unwrap(),
        ];
        sort_by_time(&mut batch);
        let times: Vec<i64> = batch.iter().map(|m| m.event.time.timestamp()).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }
}
