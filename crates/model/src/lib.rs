//! Data model shared by every crate in the workspace: the structured
//! [`Event`] payload, its [`Level`], and the [`Message`] that addresses an
//! event to a `(group, stream)` pair.

mod event;
mod level;
mod message;

pub use event::{content_length, Event, EventError, EventInfo};
pub use level::{Level, ParseLevelError};
pub use message::{Message, MessageError};
