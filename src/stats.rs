use crate::task::Task;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Completion overview of a task collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Pending tasks due before `today`.
    pub overdue: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl TaskStats {
    pub fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        let mut stats = TaskStats::default();
        for task in tasks {
            stats.total += 1;
            if task.is_completed() {
                stats.completed += 1;
            } else {
                stats.pending += 1;
                if task.due_date.is_some_and(|due| due < today) {
                    stats.overdue += 1;
                }
            }
            *stats.by_category.entry(task.category.clone()).or_insert(0) += 1;
        }
        stats
    }

    pub fn completed_percent(&self) -> f64 {
        percent(self.completed, self.total)
    }

    pub fn pending_percent(&self) -> f64 {
        percent(self.pending, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for TaskStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Tasks: {}", self.total)?;
        writeln!(f, "Completed: {} ({:.2}%)", self.completed, self.completed_percent())?;
        writeln!(f, "Pending: {} ({:.2}%)", self.pending, self.pending_percent())?;
        write!(f, "Overdue: {}", self.overdue)?;
        for (category, count) in &self.by_category {
            write!(f, "\n  {category}: {count}")?;
        }
        Ok(())
    }
}
