//! A single `(group, stream)` buffer and its flush-trigger logic.

use chrono::{DateTime, Utc};
use model::Message;

/// Thresholds governing when a [`Stream`] should be flushed.
#[derive(Debug, Clone, Copy)]
pub struct StreamLimits {
    /// Flush once the buffered message count reaches this value.
    pub max_count: usize,
    /// Flush once the buffered byte total reaches this value.
    pub max_bytes: usize,
    /// Flush once this much time has elapsed since the last flush.
    pub max_time: chrono::Duration,
    /// When set, flush everything regardless of the other limits (used to
    /// drain a stream on shutdown or reader EOF).
    pub force: bool,
}

/// A buffered batch of messages plus the reason it was flushed, matching
/// the diagnostic string surfaced to logs.
pub struct Flushed {
    /// The batch to hand to a destination writer. Empty when nothing was
    /// due for flushing.
    pub batch: Vec<Message>,
    /// Human-readable reason, e.g. `"max batch size exceeded"`.
    pub reason: &'static str,
}

/// Buffers messages for one stream within a group, applying the
/// size/count/time/force flush priority in that order.
pub struct Stream {
    group: String,
    name: String,
    bytes: usize,
    messages: Vec<Message>,
    updated_on: DateTime<Utc>,
    flushed_on: DateTime<Utc>,
}

impl Stream {
    /// Creates an empty stream for `(group, name)`, timestamped `now`.
    pub fn new(group: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            bytes: 0,
            messages: Vec::with_capacity(1000),
            updated_on: now,
            flushed_on: now,
        }
    }

    /// The owning group's name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// This stream's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of messages currently buffered.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the stream has no buffered messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends `msg`, updating the buffered byte total and last-touched
    /// timestamp.
    pub fn add(&mut self, msg: Message, now: DateTime<Utc>) {
        self.bytes += msg.content_length();
        self.messages.push(msg);
        self.updated_on = now;
    }

    /// A stream has expired once it is empty and has not been touched for
    /// `timeout`; an idle stream with no backlog is eligible for eviction.
    pub fn has_expired(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.messages.is_empty() && now - self.updated_on >= timeout
    }

    /// Flushes at most one batch according to `limits`, checked in priority
    /// order: byte limit, then count limit, then time limit, then force.
    /// Returns an empty batch when none of the triggers fired.
    pub fn flush(&mut self, limits: &StreamLimits, now: DateTime<Utc>) -> Flushed {
        if self.bytes >= limits.max_bytes {
            return Flushed {
                batch: self.flush_due_to_bytes_limit(limits.max_bytes, now),
                reason: "max batch size exceeded",
            };
        }

        if self.messages.len() >= limits.max_count {
            return Flushed {
                batch: self.flush_count(limits.max_count, now),
                reason: "max message count exceeded",
            };
        }

        if now - self.flushed_on >= limits.max_time {
            return Flushed {
                batch: self.flush_count(self.messages.len(), now),
                reason: "time limit exceeded",
            };
        }

        if limits.force {
            return Flushed {
                batch: self.flush_count(self.messages.len(), now),
                reason: "forced flushing",
            };
        }

        Flushed { batch: Vec::new(), reason: "" }
    }

    /// Selects the longest prefix of messages whose combined content length
    /// does not exceed `max_bytes`, always taking at least one message so a
    /// single oversized message cannot stall the stream forever.
    fn flush_due_to_bytes_limit(&mut self, max_bytes: usize, now: DateTime<Utc>) -> Vec<Message> {
        let mut count = 0;
        let mut bytes = 0;

        for msg in &self.messages {
            let length = msg.content_length();
            if bytes + length > max_bytes {
                break;
            }
            bytes += length;
            count += 1;
        }

        if count == 0 {
            count = 1;
        }

        self.flush_count(count, now)
    }

    fn flush_count(&mut self, count: usize, now: DateTime<Utc>) -> Vec<Message> {
        let count = count.min(self.messages.len());
        let batch: Vec<Message> = self.messages.drain(..count).collect();
        self.bytes -= batch.iter().map(Message::content_length).sum::<usize>();
        self.flushed_on = now;
        batch
    }
}
