use crate::error::StoreError;
use crate::task::Task;
use std::fmt::Write as _;
use std::path::Path;

/// Plain-text listing of `tasks` for sharing or printing.
pub fn render_report(tasks: &[Task]) -> String {
    let mut out = String::from("Task List:\n===========================\n");
    for task in tasks {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Title: {}", task.title);
        let _ = writeln!(out, "Description: {}", task.description);
        let _ = writeln!(
            out,
            "Due Date: {}",
            task.formatted_due_date().as_deref().unwrap_or("none")
        );
        let _ = writeln!(out, "Category: {}", task.category);
        let _ = writeln!(out, "Status: {}", task.status);
        out.push_str("---------------------------\n");
    }
    out
}

pub fn write_report(tasks: &[Task], path: &Path) -> Result<(), StoreError> {
    std::fs::write(path, render_report(tasks)).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(count = tasks.len(), path = %path.display(), "tasks exported");
    Ok(())
}
