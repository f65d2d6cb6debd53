//! A reader over the systemd journal. Not implemented: journal export-format
//! decoding and the `sd_journal_*` FFI surface are out of scope for this
//! crate — only the output contract (producing validated [`model::Message`]s)
//! is specified, and an implementation would live behind this same trait.

use async_trait::async_trait;
use model::Message;

use crate::{Reader, ReaderError};

/// Placeholder for a systemd-journal-backed reader, gated to Linux since
/// the journal is a Linux-only facility. Constructing one currently
/// always fails; the type exists so callers can wire the `--src journal`
/// config option through the rest of the pipeline ahead of a real
/// implementation.
#[cfg(target_os = "linux")]
pub struct JournalReader {
    _private: (),
}

#[cfg(target_os = "linux")]
impl JournalReader {
    /// Always returns an error: journal export-format decoding is not
    /// implemented.
    pub fn open() -> Result<Self, ReaderError> {
        Err(ReaderError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "journal reader is not implemented",
        )))
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl Reader for JournalReader {
    async fn read_message(&mut self) -> Result<Option<Message>, ReaderError> {
        Ok(None)
    }
}
