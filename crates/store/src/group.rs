//! A named collection of [`Stream`]s sharing a group.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use model::Message;

use crate::Stream;

/// All streams currently buffered under one group name.
pub struct Group {
    name: String,
    streams: HashMap<String, Stream>,
    updated_on: DateTime<Utc>,
}

impl Group {
    /// Creates an empty group named `name`, timestamped `now`.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            streams: HashMap::new(),
            updated_on: now,
        }
    }

    /// This group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of streams currently buffered.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether the group currently holds no streams.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Routes `msg` to its stream, creating the stream on first use, and
    /// returns the stream's name so the caller can look it up again without
    /// holding a borrow across the call.
    pub fn add(&mut self, msg: Message, now: DateTime<Utc>) -> String {
        let stream_name = msg.stream.clone();
        let stream = self
            .streams
            .entry(stream_name.clone())
            .or_insert_with(|| Stream::new(self.name.clone(), stream_name.clone(), now));

        stream.add(msg, now);
        self.updated_on = now;
        stream_name
    }

    /// A group has expired once it holds no streams and has been idle for
    /// `timeout`.
    pub fn has_expired(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.streams.is_empty() && now - self.updated_on >= timeout
    }

    /// Removes and returns every stream that has individually expired.
    pub fn remove_expired(&mut self, timeout: chrono::Duration, now: DateTime<Utc>) -> Vec<Stream> {
        let expired: Vec<String> = self
            .streams
            .iter()
            .filter(|(_, stream)| stream.has_expired(timeout, now))
            .map(|(name, _)| name.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|name| self.streams.remove(&name))
            .collect()
    }

    /// Visits every stream, in unspecified order.
    pub fn for_each(&mut self, mut f: impl FnMut(&mut Stream)) {
        for stream in self.streams.values_mut() {
            f(stream);
        }
    }

    /// Looks up a stream by name.
    pub fn stream_mut(&mut self, name: &str) -> Option<&mut Stream> {
        self.streams.get_mut(name)
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use model::{Event, Level};

    use super::*;

    fn msg(stream: &str) -> Message {
        let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Message::new("group", stream, Event::new(Level::Info, time)).unwrap()
    }

    #[test]
    fn add_creates_stream_on_first_use() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut group = Group::new("group", now);
        group.add(msg("a"), now);
        assert_eq!(group.len(), 1);
        assert_eq!(group.stream_mut("a").unwrap().len(), 1);
    }

    #[test]
    fn remove_expired_evicts_only_idle_empty_streams() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut group = Group::new("group", now);
        group.add(msg("a"), now);

        let later = now + chrono::Duration::seconds(120);
        let timeout = chrono::Duration::seconds(60);
        // stream "a" still holds its message until flushed, so it is not idle-empty.
        let expired = group.remove_expired(timeout, later);
        assert!(expired.is_empty());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn has_expired_when_no_streams_and_idle() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let group = Group::new("group", now);
        let timeout = chrono::Duration::seconds(60);
        assert!(group.has_expired(timeout, now + chrono::Duration::seconds(61)));
    }
}
