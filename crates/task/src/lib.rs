#![deny(
    trivial_numeric_casts,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    unused_results
)]
#![warn(rust_2021_compatibility, unreachable_pub)]

//! A library for tracking spawned reader/writer tasks and joining them on
//! shutdown.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::error;

use crate::labels::TaskLabels;

pub mod labels;

/// A join handle for a task.
pub type JoinHandleTask = JoinHandle<Box<dyn TaskCleaner>>;

/// All the errors of this crate.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {}

/// A trait for tasks that can be cleaned up.
#[async_trait]
pub trait TaskCleaner: std::fmt::Debug + Send {
    /// Method called when the task is cleaned up.
    async fn cleanup(&self);
}

/// Tracks every spawned reader/writer task so the scheduler can join them
/// all on shutdown.
#[derive(Clone, Default)]
#[must_use]
pub struct TaskManager {
    /// All the tasks registered with this manager.
    registered_tasks: Arc<Mutex<FuturesUnordered<JoinHandleTask>>>,
    /// All the pending tasks.
    pending_registrations: Arc<Mutex<Vec<JoinHandleTask>>>,
}

impl TaskManager {
    /// Creates a new task manager.
    pub fn new() -> Self {
        Self {
            registered_tasks: Arc::new(Mutex::new(FuturesUnordered::new())),
            pending_registrations: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Registers a task.
    pub fn register(&mut self, join_handle: JoinHandle<Box<dyn TaskCleaner>>, task_labels: &TaskLabels) {
        // To authorize registration of new tasks after the call to the join method.
        if let Ok(mutex) = self.registered_tasks.try_lock() {
            mutex.push(join_handle);
        } else {
            self.pending_registrations
                .lock()
                .expect("unexpected pending_registrations lock issue")
                .push(join_handle);
        }

        tracing::info!(
            task_id=%task_labels.task_id,
            task_cat=%task_labels.task_cat,
            task_source=%task_labels.task_source,
            "task registered and started");
    }

    /// Joins all the tasks registered with this manager.
    pub async fn join(&self) {
        let mut task_cleaned_up = 0;

        tracing::info!(
            task_count=%self.registered_tasks.lock().expect("registered_tasks lock failed").len(),
            "joining registered tasks");

        #[allow(clippy::await_holding_lock)]
        while let Some(item) = self
            .registered_tasks
            .lock()
            .expect("unexpected tasks lock issue")
            .next()
            .await
        {
            match item {
                Err(err) => error!(error=?err, "join error"),
                Ok(cleaner) => {
                    task_cleaned_up += 1;
                    cleaner.cleanup().await;
                    tracing::trace!(%task_cleaned_up, "cleaned up task");
                }
            }

            tracing::trace!(
                task_count=%self.pending_registrations.lock().expect("pending_registrations lock failed").len(),
                "joining pending registration tasks"
            );

            for join_handle in self
                .pending_registrations
                .lock()
                .expect("unexpected pending_registration lock issue")
                .drain(..)
            {
                self.registered_tasks
                    .lock()
                    .expect("unexpected tasks lock issue")
                    .push(join_handle);
            }
        }
    }
}
