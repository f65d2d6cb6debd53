//! Exercises the full scheduler loop end to end with in-memory readers and
//! destinations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use destination::{Destination, DestinationError, Writer};
use model::{Event, Level, Message};
use reader::{Reader, ReaderError};
use scheduler::{FlushThresholds, Scheduler, Source, Target};

struct FixedReader {
    messages: Vec<Message>,
}

#[async_trait]
impl Reader for FixedReader {
    async fn read_message(&mut self) -> Result<Option<Message>, ReaderError> {
        Ok(self.messages.pop())
    }
}

#[derive(Default)]
struct RecordingDestination {
    batches: Arc<Mutex<Vec<Vec<Message>>>>,
}

struct RecordingWriter {
    batches: Arc<Mutex<Vec<Vec<Message>>>>,
    pending: Vec<Message>,
}

#[async_trait]
impl Writer for RecordingWriter {
    async fn write_message(&mut self, msg: &Message) -> Result<(), DestinationError> {
        self.pending.push(msg.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DestinationError> {
        self.batches.lock().expect("lock poisoned").push(self.pending);
        Ok(())
    }
}

#[async_trait]
impl Destination for RecordingDestination {
    async fn open(&self, _group: &str, _stream: &str) -> Result<Box<dyn Writer>, DestinationError> {
        Ok(Box::new(RecordingWriter { batches: self.batches.clone(), pending: Vec::new() }))
    }
}

fn message(group: &str, stream: &str) -> Message {
    Message::new(group, stream, Event::new(Level::Info, Utc::now())).unwrap()
}

#[tokio::test]
async fn drains_readers_and_force_flushes_on_eof() {
    let reader = FixedReader { messages: vec![message("g", "a"), message("g", "a"), message("g", "b")] };

    let destination = Arc::new(RecordingDestination::default());
    let batches = destination.batches.clone();

    let thresholds = FlushThresholds { max_count: 1_000, max_bytes: 1_000_000, max_time: chrono::Duration::seconds(3600) };
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler = Scheduler::new(
        thresholds,
        chrono::Duration::seconds(60),
        std::time::Duration::from_millis(50),
        vec![Target { name: "recording".to_string(), destination: destination.clone() }],
    )
    .expect("at least one destination configured");

    let sources = vec![Source { name: "fixed".to_string(), reader: Box::new(reader) }];

    tokio::time::timeout(std::time::Duration::from_secs(5), scheduler.run(sources, shutdown_rx))
        .await
        .expect("scheduler should finish once the reader hits EOF");

    let batches = batches.lock().expect("lock poisoned");
    let total: usize = batches.iter().map(|b| b.len()).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn rejects_construction_with_no_destinations() {
    let thresholds = FlushThresholds { max_count: 1, max_bytes: 1, max_time: chrono::Duration::seconds(1) };
    let result = Scheduler::new(thresholds, chrono::Duration::seconds(1), std::time::Duration::from_millis(10), vec![]);
    assert!(result.is_err());
}
