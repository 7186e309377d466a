//! Personal task tracking: an in-memory task repository with write-through
//! JSON backup, a SQLite system of record, and query/statistics helpers.

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod repository;
pub mod stats;
pub mod store;
pub mod task;
pub mod ui;
pub mod user;

pub use error::{RepositoryError, StoreError};
pub use repository::TaskRepository;
pub use stats::TaskStats;
pub use store::{JsonBackup, Loaded, SqliteStore, TaskField, TaskStore, TaskUpdate};
pub use task::{Status, Task};
pub use user::User;
