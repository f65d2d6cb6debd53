//! The top-level `(group, stream)` buffer owned by the scheduler.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use model::Message;

use crate::{Group, Stream};

/// All groups currently buffered, keyed by group name.
pub struct Store {
    groups: HashMap<String, Group>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            groups: HashMap::with_capacity(100),
        }
    }

    /// Routes `msg` to its group and stream, creating either as needed, and
    /// returns the `(group, stream)` names the message landed in.
    pub fn add(&mut self, msg: Message, now: DateTime<Utc>) -> (String, String) {
        let group_name = msg.group.clone();
        let group = self
            .groups
            .entry(group_name.clone())
            .or_insert_with(|| Group::new(group_name.clone(), now));

        let stream_name = group.add(msg, now);
        (group_name, stream_name)
    }

    /// Removes and returns every stream, across every group, that has
    /// individually expired; also drops groups that are themselves empty
    /// and idle.
    pub fn remove_expired(&mut self, timeout: chrono::Duration, now: DateTime<Utc>) -> Vec<Stream> {
        let mut expired = Vec::new();
        let mut empty_groups = Vec::new();

        for (name, group) in self.groups.iter_mut() {
            expired.extend(group.remove_expired(timeout, now));
            if group.has_expired(timeout, now) {
                empty_groups.push(name.clone());
            }
        }

        for name in empty_groups {
            self.groups.remove(&name);
        }

        expired
    }

    /// Visits every group, in unspecified order.
    pub fn for_each(&mut self, mut f: impl FnMut(&mut Group)) {
        for group in self.groups.values_mut() {
            f(group);
        }
    }

    /// Looks up a group by name.
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.get_mut(name)
    }

    /// Number of groups currently buffered.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the store currently holds no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use model::{Event, Level};

    use super::*;

    fn msg(group: &str, stream: &str) -> Message {
        let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Message::new(group, stream, Event::new(Level::Info, time)).unwrap()
    }

    #[test]
    fn add_creates_group_and_stream_on_first_use() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut store = Store::new();
        let (group, stream) = store.add(msg("g", "s"), now);
        assert_eq!(group, "g");
        assert_eq!(stream, "s");
        assert_eq!(store.len(), 1);
        assert_eq!(store.group_mut("g").unwrap().stream_mut("s").unwrap().len(), 1);
    }

    #[test]
    fn remove_expired_drops_empty_idle_groups() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut store = Store::new();
        store.add(msg("g", "s"), now);

        // Drain the stream so the group becomes empty.
        if let Some(group) = store.group_mut("g") {
            if let Some(stream) = group.stream_mut("s") {
                let _ = stream.flush(
                    &crate::StreamLimits {
                        max_count: 0,
                        max_bytes: 0,
                        max_time: chrono::Duration::seconds(3600),
                        force: false,
                    },
                    now,
                );
            }
        }

        let later = now + chrono::Duration::seconds(120);
        let timeout = chrono::Duration::seconds(60);
        let expired = store.remove_expired(timeout, later);
        assert_eq!(expired.len(), 1);
        assert!(store.is_empty());
    }
}
