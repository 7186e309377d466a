//! Storage backends for the task collection.
//!
//! Both backends speak the same whole-collection [`TaskStore`] contract. The
//! JSON backup is best-effort and is never reconciled with the database
//! implicitly; [`mirror`] copies one into the other on request.

mod json;
mod sqlite;

pub use json::JsonBackup;
pub use sqlite::{SqliteStore, TaskField, TaskUpdate};

use crate::error::StoreError;
use crate::task::Task;

/// Result of a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Tasks(Vec<Task>),
    /// Nothing has been stored yet.
    Missing,
}

impl Loaded {
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Loaded::Tasks(tasks) => tasks,
            Loaded::Missing => Vec::new(),
        }
    }
}

pub trait TaskStore {
    fn load(&self) -> Result<Loaded, StoreError>;

    /// Replaces everything stored with `tasks`.
    fn save(&self, tasks: &[Task]) -> Result<(), StoreError>;
}

impl<T: TaskStore + ?Sized> TaskStore for &T {
    fn load(&self) -> Result<Loaded, StoreError> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        (**self).save(tasks)
    }
}

/// Copies the full collection from `source` into `target`, returning how many
/// tasks were written. A `Missing` source leaves the target untouched.
pub fn mirror(source: &impl TaskStore, target: &impl TaskStore) -> Result<usize, StoreError> {
    match source.load()? {
        Loaded::Missing => {
            tracing::warn!("mirror source is empty; target left unchanged");
            Ok(0)
        }
        Loaded::Tasks(tasks) => {
            target.save(&tasks)?;
            tracing::info!(count = tasks.len(), "mirrored tasks");
            Ok(tasks.len())
        }
    }
}
