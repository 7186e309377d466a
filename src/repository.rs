use crate::error::{RepositoryError, StoreError};
use crate::stats::TaskStats;
use crate::store::{Loaded, TaskStore};
use crate::task::Task;
use chrono::{Local, NaiveDate};

/// In-memory task collection with write-through persistence.
///
/// Every mutation updates memory first and then re-serializes the whole
/// collection into the store. If the store write fails the in-memory change is
/// kept and the error is returned.
#[derive(Debug)]
pub struct TaskRepository<S> {
    store: S,
    tasks: Vec<Task>,
}

impl<S: TaskStore> TaskRepository<S> {
    /// Loads from `store`, starting empty if it cannot be read.
    pub fn open(store: S) -> Self {
        let tasks = match store.load() {
            Ok(Loaded::Tasks(tasks)) => tasks,
            Ok(Loaded::Missing) => Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "could not load tasks; starting with an empty list");
                Vec::new()
            }
        };
        Self { store, tasks }
    }

    pub fn try_open(store: S) -> Result<Self, StoreError> {
        let tasks = store.load()?.into_tasks();
        Ok(Self { store, tasks })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn add(&mut self, task: Task) -> Result<(), RepositoryError> {
        if task.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title must not be empty").into());
        }
        self.tasks.push(task);
        self.save_all()
    }

    /// Removes every task titled exactly `title` and returns how many went.
    pub fn remove_by_title(&mut self, title: &str) -> Result<usize, RepositoryError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.title != title);
        let removed = before - self.tasks.len();
        self.save_all()?;
        Ok(removed)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    /// Applies `edit` to the first task titled `title`. Nothing is written
    /// when no task matches.
    pub fn update_by_title(
        &mut self,
        title: &str,
        edit: impl FnOnce(&mut Task),
    ) -> Result<bool, RepositoryError> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.title == title) else {
            return Ok(false);
        };
        edit(task);
        self.save_all()?;
        Ok(true)
    }

    pub fn mark_completed_by_title(&mut self, title: &str) -> Result<bool, RepositoryError> {
        self.update_by_title(title, Task::mark_completed)
    }

    /// Applies `edit` to the task at `index` in [`tasks`](Self::tasks).
    /// Nothing is written when the index is out of range.
    pub fn update_at(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut Task),
    ) -> Result<bool, RepositoryError> {
        let Some(task) = self.tasks.get_mut(index) else {
            return Ok(false);
        };
        edit(task);
        self.save_all()?;
        Ok(true)
    }

    pub fn mark_completed_at(&mut self, index: usize) -> Result<bool, RepositoryError> {
        self.update_at(index, Task::mark_completed)
    }

    /// Removes only the task at `index`, leaving same-titled tasks alone.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<Task>, RepositoryError> {
        if index >= self.tasks.len() {
            return Ok(None);
        }
        let removed = self.tasks.remove(index);
        self.save_all()?;
        Ok(Some(removed))
    }

    /// Stable ascending sort. Fails without reordering if any task has no
    /// due date.
    pub fn sort_by_due_date(&mut self) -> Result<(), RepositoryError> {
        sort_by_due_date(&mut self.tasks)
    }

    pub fn filter_completed(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_completed()).collect()
    }

    pub fn filter_pending(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_completed()).collect()
    }

    /// Tasks due on the current local calendar date.
    pub fn filter_due_today(&self) -> Vec<&Task> {
        self.filter_due_on(Local::now().date_naive())
    }

    pub fn filter_due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_due_on(date)).collect()
    }

    pub fn filter_overdue(&self, today: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| !t.is_completed() && t.due_date.is_some_and(|due| due < today))
            .collect()
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.in_category(category)).collect()
    }

    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.has_tag(tag)).collect()
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats::collect(&self.tasks, today)
    }

    pub fn save_all(&self) -> Result<(), RepositoryError> {
        self.store.save(&self.tasks)?;
        Ok(())
    }

    /// Swaps in a new collection without persisting it.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }
}

/// Stable ascending sort of `tasks` by due date. Leaves the slice untouched
/// and names the first undated task if any task has no due date.
pub fn sort_by_due_date(tasks: &mut [Task]) -> Result<(), RepositoryError> {
    if let Some(undated) = tasks.iter().find(|t| t.due_date.is_none()) {
        return Err(RepositoryError::MissingDueDate {
            title: undated.title.clone(),
        });
    }
    tasks.sort_by_key(|t| t.due_date);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Option<Vec<Task>>>,
        saves: Cell<usize>,
    }

    impl TaskStore for MemoryStore {
        fn load(&self) -> Result<Loaded, StoreError> {
            Ok(match self.saved.borrow().clone() {
                Some(tasks) => Loaded::Tasks(tasks),
                None => Loaded::Missing,
            })
        }

        fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
            self.saves.set(self.saves.get() + 1);
            *self.saved.borrow_mut() = Some(tasks.to_vec());
            Ok(())
        }
    }

    struct BrokenStore;

    impl TaskStore for BrokenStore {
        fn load(&self) -> Result<Loaded, StoreError> {
            Err(StoreError::InvalidInput("unreadable"))
        }

        fn save(&self, _tasks: &[Task]) -> Result<(), StoreError> {
            Err(StoreError::InvalidInput("unwritable"))
        }
    }

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap() + chrono::Duration::days(offset)
    }

    fn task(title: &str, offset: i64, status: Option<&str>) -> Task {
        Task::new(title, "", Some(day(offset)), "Work", status)
    }

    #[test]
    fn add_writes_through() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.add(task("Draft", 0, None)).unwrap();

        assert_eq!(store.saves.get(), 1);
        assert_eq!(store.saved.borrow().as_ref().unwrap().len(), 1);
    }

    #[test]
    fn add_rejects_blank_titles() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        let err = repo.add(task("  ", 0, None)).unwrap_err();

        assert!(matches!(err, RepositoryError::Store(StoreError::InvalidInput(_))));
        assert!(repo.is_empty());
        assert_eq!(store.saves.get(), 0);
    }

    #[test]
    fn mark_completed_on_unknown_title_does_not_write() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.add(task("Draft", 0, None)).unwrap();
        let before = repo.tasks().to_vec();

        assert!(!repo.mark_completed_by_title("Missing").unwrap());
        assert_eq!(repo.tasks(), before.as_slice());
        assert_eq!(store.saves.get(), 1);
    }

    #[test]
    fn mark_completed_writes_through() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.add(task("Draft", 0, None)).unwrap();

        assert!(repo.mark_completed_by_title("Draft").unwrap());
        let saved = store.saved.borrow();
        assert_eq!(saved.as_ref().unwrap()[0].status, Status::Completed);
    }

    #[test]
    fn sort_refuses_undated_tasks_and_keeps_order() {
        let mut repo = TaskRepository::open(MemoryStore::default());
        repo.replace_all(vec![
            task("Later", 3, None),
            Task::new("Someday", "", None, "Personal", None),
            task("Sooner", 1, None),
        ]);

        let err = repo.sort_by_due_date().unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::MissingDueDate { ref title } if title == "Someday"
        ));
        let titles: Vec<_> = repo.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Later", "Someday", "Sooner"]);
    }

    #[test]
    fn sort_is_stable_for_equal_dates() {
        let mut repo = TaskRepository::open(MemoryStore::default());
        repo.replace_all(vec![
            task("b", 2, None),
            task("a1", 1, None),
            task("a2", 1, None),
        ]);
        repo.sort_by_due_date().unwrap();

        let titles: Vec<_> = repo.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["a1", "a2", "b"]);
    }

    #[test]
    fn replace_all_does_not_save() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.replace_all(vec![task("Restored", 0, None)]);

        assert_eq!(repo.len(), 1);
        assert_eq!(store.saves.get(), 0);
        repo.save_all().unwrap();
        assert_eq!(store.saves.get(), 1);
    }

    #[test]
    fn unreadable_store_starts_empty() {
        let repo = TaskRepository::open(BrokenStore);
        assert!(repo.is_empty());
        assert!(TaskRepository::try_open(BrokenStore).is_err());
    }

    #[test]
    fn failed_write_keeps_memory_change() {
        let mut repo = TaskRepository::open(BrokenStore);
        assert!(repo.add(task("Draft", 0, None)).is_err());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn overdue_only_counts_pending_tasks() {
        let mut repo = TaskRepository::open(MemoryStore::default());
        repo.replace_all(vec![
            task("late", -2, None),
            task("late but done", -2, Some("Completed")),
            task("today", 0, None),
            Task::new("undated", "", None, "Work", None),
        ]);

        let overdue: Vec<_> = repo
            .filter_overdue(day(0))
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(overdue, ["late"]);
    }

    #[test]
    fn category_match_ignores_case_but_tags_do_not() {
        let mut repo = TaskRepository::open(MemoryStore::default());
        let mut tagged = task("Report", 0, None);
        tagged.add_tag("Urgent");
        repo.replace_all(vec![tagged, Task::new("Essay", "", None, "study", None)]);

        assert_eq!(repo.filter_by_category("WORK").len(), 1);
        assert_eq!(repo.filter_by_category("Study").len(), 1);
        assert_eq!(repo.filter_by_tag("Urgent").len(), 1);
        assert!(repo.filter_by_tag("urgent").is_empty());
    }

    #[test]
    fn update_by_title_edits_first_match_only() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.replace_all(vec![task("Dup", 0, None), task("Dup", 1, None)]);

        assert!(repo
            .update_by_title("Dup", |t| {
                t.add_tag("first");
            })
            .unwrap());
        assert!(repo.tasks()[0].has_tag("first"));
        assert!(!repo.tasks()[1].has_tag("first"));
        assert_eq!(store.saves.get(), 1);
    }

    #[test]
    fn position_keyed_edits_touch_only_that_task() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.replace_all(vec![
            task("X", 0, Some("Completed")),
            task("X", 1, None),
            task("X", 2, None),
        ]);

        assert!(repo.mark_completed_at(1).unwrap());
        assert!(repo
            .update_at(2, |t| {
                t.add_tag("third");
            })
            .unwrap());
        assert!(repo.filter_pending().iter().all(|t| t.has_tag("third")));
        assert_eq!(repo.filter_completed().len(), 2);

        let removed = repo.remove_at(0).unwrap().unwrap();
        assert_eq!(removed.due_date, Some(day(0)));
        assert_eq!(repo.len(), 2);
        assert_eq!(store.saves.get(), 3);
    }

    #[test]
    fn out_of_range_positions_do_not_write() {
        let store = MemoryStore::default();
        let mut repo = TaskRepository::open(&store);
        repo.replace_all(vec![task("X", 0, None)]);

        assert!(!repo.mark_completed_at(5).unwrap());
        assert!(repo.remove_at(1).unwrap().is_none());
        assert_eq!(repo.len(), 1);
        assert_eq!(store.saves.get(), 0);
    }
}
