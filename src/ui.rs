use crate::error::{RepositoryError, StoreError};
use crate::repository::{self, TaskRepository};
use crate::stats::TaskStats;
use crate::store::{SqliteStore, TaskField, TaskStore, TaskUpdate};
use crate::task::{parse_date, Status, Task, DATE_FORMAT};
use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use std::io;

const COLUMNS: [Status; 2] = [Status::Pending, Status::Completed];
const DEFAULT_CATEGORY: &str = "Personal";
const HELP: &str = "q quit | a add | Enter complete | d delete | e edit | t tag | s sort | \
                    f due today | c category | arrows move";

/// What the board can do to the tasks it shows. Every action addresses a task
/// by its position in [`tasks`](BoardBackend::tasks).
pub trait BoardBackend {
    fn tasks(&self) -> &[Task];
    fn add(&mut self, task: Task) -> Result<(), RepositoryError>;
    fn complete(&mut self, index: usize) -> Result<bool, RepositoryError>;
    fn remove(&mut self, index: usize) -> Result<bool, RepositoryError>;
    fn tag(&mut self, index: usize, tag: String) -> Result<bool, RepositoryError>;
    fn edit(&mut self, index: usize, update: TaskUpdate) -> Result<bool, RepositoryError>;
    fn sort(&mut self) -> Result<(), RepositoryError>;
}

impl<S: TaskStore> BoardBackend for TaskRepository<S> {
    fn tasks(&self) -> &[Task] {
        TaskRepository::tasks(self)
    }

    fn add(&mut self, task: Task) -> Result<(), RepositoryError> {
        TaskRepository::add(self, task)
    }

    fn complete(&mut self, index: usize) -> Result<bool, RepositoryError> {
        self.mark_completed_at(index)
    }

    fn remove(&mut self, index: usize) -> Result<bool, RepositoryError> {
        Ok(self.remove_at(index)?.is_some())
    }

    fn tag(&mut self, index: usize, tag: String) -> Result<bool, RepositoryError> {
        self.update_at(index, |t| {
            t.add_tag(tag);
        })
    }

    fn edit(&mut self, index: usize, update: TaskUpdate) -> Result<bool, RepositoryError> {
        self.update_at(index, |t| update.apply_to(t))
    }

    fn sort(&mut self) -> Result<(), RepositoryError> {
        self.sort_by_due_date()
    }
}

/// Board mode over the database: every action goes straight to
/// [`SqliteStore`] by id and the rows are re-read afterwards.
#[derive(Debug)]
pub struct DatabaseBoard {
    store: SqliteStore,
    tasks: Vec<Task>,
    sorted: bool,
}

impl DatabaseBoard {
    pub fn open(store: SqliteStore) -> Result<Self, StoreError> {
        let tasks = store.fetch_all()?;
        Ok(Self {
            store,
            tasks,
            sorted: false,
        })
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    fn id_at(&self, index: usize) -> Option<i64> {
        self.tasks.get(index).map(|t| t.id)
    }

    /// Re-reads the table, keeping the due-date order if one was requested.
    fn refresh(&mut self) -> Result<(), RepositoryError> {
        self.tasks = self.store.fetch_all()?;
        if self.sorted && repository::sort_by_due_date(&mut self.tasks).is_err() {
            self.sorted = false;
        }
        Ok(())
    }
}

impl BoardBackend for DatabaseBoard {
    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn add(&mut self, task: Task) -> Result<(), RepositoryError> {
        self.store.insert(&task)?;
        self.refresh()
    }

    fn complete(&mut self, index: usize) -> Result<bool, RepositoryError> {
        let Some(id) = self.id_at(index) else {
            return Ok(false);
        };
        self.store.update_status(id, Status::Completed)?;
        self.refresh()?;
        Ok(true)
    }

    fn remove(&mut self, index: usize) -> Result<bool, RepositoryError> {
        let Some(id) = self.id_at(index) else {
            return Ok(false);
        };
        self.store.delete_by_id(id)?;
        self.refresh()?;
        Ok(true)
    }

    fn tag(&mut self, _index: usize, _tag: String) -> Result<bool, RepositoryError> {
        Err(StoreError::InvalidInput("tags are not stored in the database").into())
    }

    fn edit(&mut self, index: usize, update: TaskUpdate) -> Result<bool, RepositoryError> {
        let Some(id) = self.id_at(index) else {
            return Ok(false);
        };
        self.store.update_field(id, &update)?;
        self.refresh()?;
        Ok(true)
    }

    fn sort(&mut self) -> Result<(), RepositoryError> {
        repository::sort_by_due_date(&mut self.tasks)?;
        self.sorted = true;
        Ok(())
    }
}

/// Selection and view state of the board; the tasks live in the backend.
#[derive(Debug, Default)]
pub struct BoardState {
    pub selected_column: usize,
    pub selected_task: usize,
    pub due_today_only: bool,
    pub category: Option<String>,
    pub message: Option<String>,
}

impl BoardState {
    /// Tasks shown in the `status` column, each with its position in
    /// `tasks` so actions reach exactly the highlighted task.
    pub fn column<'a>(
        &self,
        tasks: &'a [Task],
        status: Status,
        today: NaiveDate,
    ) -> Vec<(usize, &'a Task)> {
        tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == status)
            .filter(|(_, t)| !self.due_today_only || t.is_due_on(today))
            .filter(|(_, t)| self.category.as_deref().map_or(true, |c| t.in_category(c)))
            .collect()
    }

    /// Position of the highlighted task in the backend's collection.
    pub fn selected_index(&self, tasks: &[Task], today: NaiveDate) -> Option<usize> {
        self.column(tasks, COLUMNS[self.selected_column], today)
            .get(self.selected_task)
            .map(|(index, _)| *index)
    }

    pub fn complete_selected(&mut self, backend: &mut impl BoardBackend, today: NaiveDate) {
        if let Some(index) = self.selected_index(backend.tasks(), today) {
            self.report("complete", backend.complete(index));
        }
    }

    pub fn remove_selected(&mut self, backend: &mut impl BoardBackend, today: NaiveDate) {
        let Some(index) = self.selected_index(backend.tasks(), today) else {
            return;
        };
        let title = backend.tasks()[index].title.clone();
        if self.report("remove", backend.remove(index)) == Some(true) {
            self.message = Some(format!("removed {title:?}"));
        }
    }

    pub fn clamp_selection(&mut self, tasks: &[Task], today: NaiveDate) {
        let len = self.column(tasks, COLUMNS[self.selected_column], today).len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    fn report<T, E: std::fmt::Display>(&mut self, action: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%err, action, "board action failed");
                self.message = Some(format!("{action} failed: {err}"));
                None
            }
        }
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    backend: &mut impl BoardBackend,
) -> io::Result<()> {
    let mut board = BoardState::default();
    loop {
        let today = Local::now().date_naive();
        draw(terminal, backend.tasks(), &board, today)?;

        if let Event::Key(key) = event::read()? {
            board.message = None;
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('a') => add_task(backend, &mut board),
                KeyCode::Char('d') => {
                    if board.selected_index(backend.tasks(), today).is_some() && confirm_delete() {
                        board.remove_selected(backend, today);
                    }
                }
                KeyCode::Char('e') => edit_task(backend, &mut board, today),
                KeyCode::Char('t') => {
                    if let Some(index) = board.selected_index(backend.tasks(), today) {
                        if let Some(tag) = prompt("Enter tag").filter(|t| !t.is_empty()) {
                            board.report("tag", backend.tag(index, tag));
                        }
                    }
                }
                KeyCode::Char('s') => {
                    if board.report("sort", backend.sort()).is_some() {
                        board.message = Some("sorted by due date".to_string());
                    }
                }
                KeyCode::Char('f') => board.due_today_only = !board.due_today_only,
                KeyCode::Char('c') => {
                    board.category =
                        prompt("Show category (blank for all)").filter(|c| !c.is_empty());
                }
                KeyCode::Left => {
                    if board.selected_column > 0 {
                        board.selected_column -= 1;
                    }
                }
                KeyCode::Right => {
                    if board.selected_column < COLUMNS.len() - 1 {
                        board.selected_column += 1;
                    }
                }
                KeyCode::Up => {
                    if board.selected_task > 0 {
                        board.selected_task -= 1;
                    }
                }
                KeyCode::Down => board.selected_task += 1,
                KeyCode::Enter => board.complete_selected(backend, today),
                _ => {}
            }
            board.clamp_selection(backend.tasks(), today);
        }
    }
}

fn draw<B: Backend>(
    terminal: &mut Terminal<B>,
    tasks: &[Task],
    board: &BoardState,
    today: NaiveDate,
) -> io::Result<()> {
    let stats = TaskStats::collect(tasks, today);
    terminal.draw(|f| {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Min(3), Constraint::Length(4)])
            .split(f.area());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);

        for (i, status) in COLUMNS.iter().enumerate() {
            let shown = board.column(tasks, *status, today);
            let items: Vec<ListItem> = shown
                .iter()
                .map(|(_, t)| {
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("[{}] ", t.category)),
                        Span::styled(t.title.as_str(), Style::default().fg(Color::White)),
                        Span::raw(format!(
                            " (Due: {})",
                            t.formatted_due_date().as_deref().unwrap_or("none")
                        )),
                        Span::styled(
                            format!(" {}", t.formatted_tags()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]))
                })
                .collect();

            let mut title = status.to_string();
            if board.due_today_only {
                title.push_str(" (due today)");
            }
            if let Some(category) = &board.category {
                title.push_str(&format!(" [{category}]"));
            }
            let focused = board.selected_column == i;
            let list = List::new(items)
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(if focused {
                            Style::default().fg(Color::Cyan)
                        } else {
                            Style::default()
                        }),
                )
                .highlight_style(Style::default().add_modifier(Modifier::BOLD));

            let mut state = ListState::default();
            if focused && !shown.is_empty() {
                state.select(Some(board.selected_task));
            }
            f.render_stateful_widget(list, columns[i], &mut state);
        }

        let summary = format!(
            "{} tasks | {} completed ({:.0}%) | {} pending | {} overdue",
            stats.total,
            stats.completed,
            stats.completed_percent(),
            stats.pending,
            stats.overdue
        );
        let footer = Paragraph::new(vec![
            Line::from(board.message.clone().unwrap_or(summary)),
            Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
        ])
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, rows[1]);
    })?;
    Ok(())
}

fn add_task(backend: &mut impl BoardBackend, board: &mut BoardState) {
    let Some(title) = prompt("Enter task title").filter(|t| !t.is_empty()) else {
        return;
    };
    let description = prompt("Enter task description").unwrap_or_default();
    let due = prompt("Enter due date (YYYY-MM-DD, blank for today)").unwrap_or_default();
    let due_date = if due.is_empty() {
        Local::now().date_naive()
    } else {
        match parse_date(&due, DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                board.message = Some(format!("invalid due date {due:?}; use YYYY-MM-DD"));
                return;
            }
        }
    };
    let category = prompt("Enter category (Personal, Work, Study)")
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let task = Task::new(title, description, Some(due_date), category, None);
    board.report("add", backend.add(task));
}

fn edit_task(backend: &mut impl BoardBackend, board: &mut BoardState, today: NaiveDate) {
    let Some(index) = board.selected_index(backend.tasks(), today) else {
        return;
    };
    let Some(name) = prompt("Field (title, description, due-date, category, status)") else {
        return;
    };
    let field = match TaskField::from_str(&name, true) {
        Ok(field) => field,
        Err(_) => {
            board.message = Some(format!("unknown field {name:?}"));
            return;
        }
    };
    let Some(value) = prompt("New value") else {
        return;
    };
    let Some(update) = board.report("edit", TaskUpdate::parse(field, &value)) else {
        return;
    };
    board.report("edit", backend.edit(index, update));
}

fn confirm_delete() -> bool {
    prompt("Delete the selected task? (y/N)")
        .is_some_and(|answer| answer.eq_ignore_ascii_case("y"))
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    let result = io::stdin().read_line(&mut input);
    enable_raw_mode().ok();
    result.ok().map(|_| input.trim().to_string())
}
