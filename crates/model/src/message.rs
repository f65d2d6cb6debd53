//! The unit of routing: a group/stream-addressed event.

use crate::Event;

/// Error returned when a [`Message`] fails validation before entering the
/// store.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    /// The group name was empty.
    #[error("message has an empty group")]
    EmptyGroup,
    /// The stream name was empty.
    #[error("message has an empty stream")]
    EmptyStream,
}

/// A single structured event addressed to a `(group, stream)` pair.
///
/// `group` and `stream` determine which [`crate::Stream`] (via the model
/// crate's sibling `store` crate) the event is buffered under; both must be
/// non-empty for the message to be accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Destination-agnostic routing group (e.g. application name).
    pub group: String,
    /// Sub-stream within the group (e.g. container or task id).
    pub stream: String,
    /// The event payload.
    pub event: Event,
}

impl Message {
    /// Builds a message, rejecting empty `group`/`stream` per the store's
    /// acceptance invariant.
    pub fn new(group: impl Into<String>, stream: impl Into<String>, event: Event) -> Result<Self, MessageError> {
        let group = group.into();
        let stream = stream.into();

        if group.is_empty() {
            return Err(MessageError::EmptyGroup);
        }
        if stream.is_empty() {
            return Err(MessageError::EmptyStream);
        }

        Ok(Self { group, stream, event })
    }

    /// The JSON-encoded byte length of `event`, via the content-length fast
    /// path.
    pub fn content_length(&self) -> usize {
        crate::content_length(&self.event)
    }
}
