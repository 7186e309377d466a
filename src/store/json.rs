use super::{Loaded, TaskStore};
use crate::error::StoreError;
use crate::task::Task;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Whole-collection JSON backup file, overwritten on every save.
#[derive(Debug, Clone)]
pub struct JsonBackup {
    path: PathBuf,
}

impl JsonBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonBackup {
    fn load(&self) -> Result<Loaded, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no backup file yet");
                return Ok(Loaded::Missing);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let tasks: Vec<Task> =
            serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(count = tasks.len(), path = %self.path.display(), "loaded backup");
        Ok(Loaded::Tasks(tasks))
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(tasks).map_err(StoreError::Encode)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, json).map_err(write_err)?;
        tracing::debug!(count = tasks.len(), path = %self.path.display(), "tasks backed up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn absent_file_is_missing_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backup = JsonBackup::new(dir.path().join("tasks.json"));
        assert_eq!(backup.load().unwrap(), Loaded::Missing);
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonBackup::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backup = JsonBackup::new(dir.path().join("nested/deeper/tasks.json"));
        backup.save(&[]).unwrap();
        assert_eq!(backup.load().unwrap(), Loaded::Tasks(Vec::new()));
    }

    #[test]
    fn dates_are_written_in_canonical_form() {
        let dir = tempfile::tempdir().unwrap();
        let backup = JsonBackup::new(dir.path().join("tasks.json"));
        let due = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        backup
            .save(&[Task::new("Submit", "", Some(due), "Work", None)])
            .unwrap();

        let text = fs::read_to_string(backup.path()).unwrap();
        assert!(text.contains(r#""dueDate": "2025-03-20""#), "{text}");
        assert!(text.contains(r#""status": "Pending""#), "{text}");
    }
}
