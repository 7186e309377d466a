use super::{Loaded, TaskStore};
use crate::error::StoreError;
use crate::task::{canonical_date, parse_date, Status, Task, DATE_FORMAT};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    description TEXT,
    due_date    TEXT,
    category    TEXT,
    status      TEXT
);";

const SELECT_COLUMNS: &str = "SELECT id, title, description, due_date, category, status FROM tasks";

/// Columns a caller may change through [`SqliteStore::update_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskField {
    Title,
    Description,
    DueDate,
    Category,
    Status,
}

/// A single typed column change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Title(String),
    Description(String),
    DueDate(NaiveDate),
    Category(String),
    Status(Status),
}

impl TaskUpdate {
    /// Builds an update from user-entered text.
    pub fn parse(field: TaskField, raw: &str) -> Result<Self, StoreError> {
        match field {
            TaskField::Title => {
                let title = raw.trim();
                if title.is_empty() {
                    return Err(StoreError::InvalidInput("title must not be empty"));
                }
                Ok(TaskUpdate::Title(title.to_string()))
            }
            TaskField::Description => Ok(TaskUpdate::Description(raw.to_string())),
            TaskField::DueDate => parse_date(raw, DATE_FORMAT)
                .map(TaskUpdate::DueDate)
                .map_err(|_| StoreError::InvalidInput("due date must be yyyy-MM-dd")),
            TaskField::Category => Ok(TaskUpdate::Category(raw.trim().to_string())),
            TaskField::Status => Status::parse_strict(raw)
                .map(TaskUpdate::Status)
                .ok_or(StoreError::InvalidInput("status must be Pending or Completed")),
        }
    }

    pub fn field(&self) -> TaskField {
        match self {
            TaskUpdate::Title(_) => TaskField::Title,
            TaskUpdate::Description(_) => TaskField::Description,
            TaskUpdate::DueDate(_) => TaskField::DueDate,
            TaskUpdate::Category(_) => TaskField::Category,
            TaskUpdate::Status(_) => TaskField::Status,
        }
    }

    fn column(&self) -> &'static str {
        match self.field() {
            TaskField::Title => "title",
            TaskField::Description => "description",
            TaskField::DueDate => "due_date",
            TaskField::Category => "category",
            TaskField::Status => "status",
        }
    }

    fn value(&self) -> String {
        match self {
            TaskUpdate::Title(text)
            | TaskUpdate::Description(text)
            | TaskUpdate::Category(text) => text.clone(),
            TaskUpdate::DueDate(date) => canonical_date(*date),
            TaskUpdate::Status(status) => status.as_str().to_string(),
        }
    }

    /// Applies the same change to an in-memory task.
    pub fn apply_to(&self, task: &mut Task) {
        match self {
            TaskUpdate::Title(title) => task.title = title.clone(),
            TaskUpdate::Description(description) => task.description = description.clone(),
            TaskUpdate::DueDate(date) => task.due_date = Some(*date),
            TaskUpdate::Category(category) => task.category = category.clone(),
            TaskUpdate::Status(status) => task.set_status(*status),
        }
    }
}

/// The relational system of record. Holds only a path; every call opens its
/// own connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let store = Self { path };
        logged("open", || Ok(store.connect()?.execute_batch(SCHEMA)?))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn insert(&self, task: &Task) -> Result<i64, StoreError> {
        logged("insert", || {
            if task.title.trim().is_empty() {
                return Err(StoreError::InvalidInput("title must not be empty"));
            }

            let conn = self.connect()?;
            conn.execute(
                "INSERT INTO tasks (title, description, due_date, category, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    task.title,
                    task.description,
                    task.due_date.map(canonical_date),
                    task.category,
                    task.status.as_str(),
                ],
            )?;

            let id = conn.last_insert_rowid();
            tracing::info!(id, title = %task.title, "task added");
            Ok(id)
        })
    }

    /// Reads every row in id order. Rows that cannot be decoded (wrong column
    /// types, unparseable due date) are skipped and logged; the rest are
    /// still returned.
    pub fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        logged("fetch_all", || {
            let conn = self.connect()?;
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
            let mut rows = stmt.query([])?;

            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                if let Some(task) = decode(row) {
                    tasks.push(task);
                }
            }
            tracing::debug!(count = tasks.len(), "fetched tasks");
            Ok(tasks)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>, StoreError> {
        logged("get", || {
            let conn = self.connect()?;
            let task = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![id],
                    |row| Ok(decode(row)),
                )
                .optional()?;
            Ok(task.flatten())
        })
    }

    pub fn update_field(&self, id: i64, update: &TaskUpdate) -> Result<(), StoreError> {
        logged("update_field", || {
            let sql = format!("UPDATE tasks SET {} = ?1 WHERE id = ?2", update.column());
            let conn = self.connect()?;
            let changed = conn.execute(&sql, params![update.value(), id])?;
            if changed == 0 {
                return Err(StoreError::UnknownId(id));
            }
            tracing::info!(id, field = ?update.field(), "task updated");
            Ok(())
        })
    }

    pub fn update_status(&self, id: i64, status: Status) -> Result<(), StoreError> {
        self.update_field(id, &TaskUpdate::Status(status))
    }

    pub fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        logged("delete_by_id", || {
            let conn = self.connect()?;
            let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(StoreError::UnknownId(id));
            }
            tracing::info!(id, "task deleted");
            Ok(())
        })
    }

    /// Replaces the table contents in one transaction. Non-zero ids are kept;
    /// id 0 tasks get fresh ids.
    fn replace_all(&self, tasks: &[Task]) -> Result<(), StoreError> {
        logged("replace_all", || {
            let mut conn = self.connect()?;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM tasks", [])?;
            {
                let mut with_id = tx.prepare(
                    "INSERT INTO tasks (id, title, description, due_date, category, status) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for task in tasks.iter().filter(|t| t.id > 0) {
                    with_id.execute(params![
                        task.id,
                        task.title,
                        task.description,
                        task.due_date.map(canonical_date),
                        task.category,
                        task.status.as_str(),
                    ])?;
                }

                let mut fresh = tx.prepare(
                    "INSERT INTO tasks (title, description, due_date, category, status) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for task in tasks.iter().filter(|t| t.id <= 0) {
                    fresh.execute(params![
                        task.title,
                        task.description,
                        task.due_date.map(canonical_date),
                        task.category,
                        task.status.as_str(),
                    ])?;
                }
            }
            tx.commit()?;
            tracing::info!(count = tasks.len(), "task table replaced");
            Ok(())
        })
    }
}

/// Runs one store operation and logs its failure.
fn logged<T>(
    operation: &'static str,
    run: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let result = run();
    match &result {
        Err(err @ (StoreError::UnknownId(_) | StoreError::InvalidInput(_))) => {
            tracing::warn!(operation, %err, "task store operation rejected");
        }
        Err(err) => tracing::error!(operation, %err, "task store operation failed"),
        Ok(_) => {}
    }
    result
}

/// Turns one row into a task, or logs why it was skipped.
fn decode(row: &Row<'_>) -> Option<Task> {
    let stored = match StoredRow::from_row(row) {
        Ok(stored) => stored,
        Err(err) => {
            let id = row.get::<_, i64>(0).ok();
            tracing::warn!(?id, %err, "skipping undecodable task row");
            return None;
        }
    };
    match stored.into_task() {
        Ok(task) => Some(task),
        Err(bad) => {
            tracing::warn!(
                id = bad.id,
                due_date = %bad.due_date,
                "skipping task with unparseable due date"
            );
            None
        }
    }
}

impl TaskStore for SqliteStore {
    fn load(&self) -> Result<Loaded, StoreError> {
        self.fetch_all().map(Loaded::Tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.replace_all(tasks)
    }
}

struct StoredRow {
    id: i64,
    title: String,
    description: String,
    due_date: String,
    category: String,
    status: Option<String>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            due_date: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            category: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            status: row.get(5)?,
        })
    }

    fn into_task(self) -> Result<Task, Self> {
        let due_date = if self.due_date.trim().is_empty() {
            None
        } else {
            match parse_date(&self.due_date, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => return Err(self),
            }
        };

        Ok(Task::new(
            self.title,
            self.description,
            due_date,
            self.category,
            self.status.as_deref(),
        )
        .with_id(self.id))
    }
}
