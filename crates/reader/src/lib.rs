//! Readers: sources of messages feeding the scheduler.
//!
//! A reader's job ends at producing a validated, defaulted [`model::Message`];
//! decoding whatever wire format the underlying source speaks belongs to the
//! reader implementation, not to the scheduler.

mod journal;
mod stdin;

#[cfg(target_os = "linux")]
pub use journal::JournalReader;
pub use stdin::StdinReader;

use async_trait::async_trait;
use model::Message;

/// Error returned while reading or decoding a message.
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    /// The underlying source returned an I/O error.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    /// A line could not be decoded into a message at all (malformed JSON).
    /// Distinct from a line that decoded but failed validation, which is
    /// dropped with a warning rather than surfaced as an error.
    #[error("malformed input: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A source of messages. Implementations decide their own framing
/// (newline-delimited JSON, a binary journal export, ...); they hand the
/// scheduler fully-formed, validated messages.
#[async_trait]
pub trait Reader: Send {
    /// Reads the next message, or `Ok(None)` at end of input.
    async fn read_message(&mut self) -> Result<Option<Message>, ReaderError>;

    /// Releases any resources held by the reader.
    async fn close(&mut self) -> Result<(), ReaderError> {
        Ok(())
    }
}
