//! Labels identifying a task registered with a [`crate::TaskManager`].

/// Identifies a registered reader/writer task for logging: its category
/// (`"reader"` or `"writer"`), an id (source/destination name), and the
/// stream it's working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLabels {
    /// The task category, e.g. `"reader"` or `"writer"`.
    pub task_cat: String,
    /// The task id, e.g. a source or destination name.
    pub task_id: String,
    /// The source the task is working on, e.g. a `group/stream` pair.
    pub task_source: String,
}

impl TaskLabels {
    /// Create a new `TaskLabels` instance.
    pub fn new(task_cat: &str, task_id: &str, task_source: &str) -> Self {
        Self {
            task_cat: task_cat.into(),
            task_id: task_id.into(),
            task_source: task_source.into(),
        }
    }
}
