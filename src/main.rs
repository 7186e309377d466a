//! Command-line and terminal front end for tasktrack.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tasktrack::config::{Config, DEFAULT_CONFIG_FILE};
use tasktrack::logging::{self, LogTarget};
use tasktrack::task::{parse_date, DATE_FORMAT};
use tasktrack::ui::{self, BoardBackend, DatabaseBoard};
use tasktrack::{
    export, store, JsonBackup, SqliteStore, Status, Task, TaskField, TaskRepository, TaskUpdate,
    User,
};

/// Personal task tracker with a SQLite store and a JSON backup.
#[derive(Parser)]
#[command(name = "tasktrack", version, about)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides the configured SQLite database path.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Overrides the configured JSON backup path.
    #[arg(long)]
    backup: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive board (default). Works on the backup file unless `--db`.
    Tui {
        /// Act on the database rows by id instead of the backup file.
        #[arg(long)]
        db: bool,
    },
    /// List backed-up tasks.
    List(ListArgs),
    /// Add a task to the backup file.
    Add(NewTaskArgs),
    /// Mark the first task with this title completed.
    Complete { title: String },
    /// Remove every task with this title.
    Remove { title: String },
    /// Tag the first task with this title.
    Tag { title: String, tag: String },
    /// Remove a tag from the first task with this title.
    Untag { title: String, tag: String },
    /// Print completion statistics.
    Stats,
    /// Write a plain-text report of all tasks.
    Export { path: PathBuf },
    /// Work directly against the database.
    #[command(subcommand)]
    Db(DbCommand),
    /// Copy every database task into the backup file.
    Backup,
    /// Replace the database contents with the backup file.
    Restore,
}

#[derive(Subcommand)]
enum DbCommand {
    List,
    Add(NewTaskArgs),
    /// Change one field of a task.
    Set {
        id: i64,
        #[arg(value_enum)]
        field: TaskField,
        value: String,
    },
    Complete { id: i64 },
    Delete { id: i64 },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, conflicts_with = "pending")]
    completed: bool,
    #[arg(long)]
    pending: bool,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    due_today: bool,
    #[arg(long)]
    overdue: bool,
    /// Sort by due date before listing.
    #[arg(long)]
    sorted: bool,
}

#[derive(Args)]
struct NewTaskArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Due date as YYYY-MM-DD; defaults to today.
    #[arg(long)]
    due: Option<String>,
    #[arg(long, default_value = "Personal")]
    category: String,
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Username of the owner.
    #[arg(long)]
    assign: Option<String>,
    /// Role of the assigned owner.
    #[arg(long, default_value = "member")]
    role: String,
}

impl NewTaskArgs {
    fn into_task(self) -> anyhow::Result<Task> {
        let due_date = match self.due.as_deref() {
            Some(text) => parse_date(text, DATE_FORMAT)
                .with_context(|| format!("invalid due date {text:?}, expected YYYY-MM-DD"))?,
            None => today(),
        };
        let mut task = Task::new(self.title, self.description, Some(due_date), self.category, None);
        for tag in self.tags {
            task.add_tag(tag);
        }
        if let Some(username) = self.assign {
            let user = User::new(username, self.role);
            tracing::info!(user = user.username(), role = user.role(), "assigning task");
            task.assign_to(&user);
        }
        Ok(task)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?.with_overrides(cli.database, cli.backup);
    let command = cli.command.unwrap_or(Command::Tui { db: false });

    let target = match command {
        Command::Tui { .. } => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    let _guard = logging::init(&config, target).context("failed to set up logging")?;

    match command {
        Command::Tui { db: false } => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            let result = run_tui(&mut repo);
            if let Err(err) = repo.save_all() {
                tracing::error!(%err, "final backup failed");
            }
            result
        }
        Command::Tui { db: true } => {
            let mut board = DatabaseBoard::open(SqliteStore::open(&config.database_path)?)?;
            run_tui(&mut board)
        }
        Command::List(args) => list(&config, args),
        Command::Add(args) => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            repo.add(args.into_task()?)?;
            Ok(())
        }
        Command::Complete { title } => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            if !repo.mark_completed_by_title(&title)? {
                bail!("no task titled {title:?}");
            }
            Ok(())
        }
        Command::Remove { title } => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            let removed = repo.remove_by_title(&title)?;
            println!("removed {removed} task(s)");
            Ok(())
        }
        Command::Tag { title, tag } => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            if !repo.update_by_title(&title, |t| {
                t.add_tag(tag);
            })? {
                bail!("no task titled {title:?}");
            }
            Ok(())
        }
        Command::Untag { title, tag } => {
            let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            if !repo.update_by_title(&title, |t| {
                t.remove_tag(&tag);
            })? {
                bail!("no task titled {title:?}");
            }
            Ok(())
        }
        Command::Stats => {
            let repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            println!("{}", repo.stats(today()));
            Ok(())
        }
        Command::Export { path } => {
            let repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
            export::write_report(repo.tasks(), &path)?;
            Ok(())
        }
        Command::Db(command) => run_db(&config, command),
        Command::Backup => {
            let db = SqliteStore::open(&config.database_path)?;
            let count = store::mirror(&db, &JsonBackup::new(&config.backup_path))?;
            println!("backed up {count} task(s)");
            Ok(())
        }
        Command::Restore => {
            let db = SqliteStore::open(&config.database_path)?;
            let count = store::mirror(&JsonBackup::new(&config.backup_path), &db)?;
            println!("restored {count} task(s)");
            Ok(())
        }
    }
}

fn run_tui(backend: &mut impl BoardBackend) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let result = ui::run_app(&mut terminal, backend);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

fn list(config: &Config, args: ListArgs) -> anyhow::Result<()> {
    let mut repo = TaskRepository::open(JsonBackup::new(&config.backup_path));
    if args.sorted {
        repo.sort_by_due_date()?;
    }

    let mut tasks = if args.completed {
        repo.filter_completed()
    } else if args.pending {
        repo.filter_pending()
    } else {
        repo.tasks().iter().collect()
    };
    if let Some(category) = &args.category {
        let matching = repo.filter_by_category(category);
        tasks.retain(|t| matching.iter().any(|m| std::ptr::eq(*m, *t)));
    }
    if let Some(tag) = &args.tag {
        tasks.retain(|t| t.has_tag(tag));
    }
    if args.due_today {
        let due = repo.filter_due_today();
        tasks.retain(|t| due.iter().any(|d| std::ptr::eq(*d, *t)));
    }
    if args.overdue {
        let overdue = repo.filter_overdue(today());
        tasks.retain(|t| overdue.iter().any(|o| std::ptr::eq(*o, *t)));
    }

    for task in tasks {
        println!("{task}");
    }
    Ok(())
}

fn run_db(config: &Config, command: DbCommand) -> anyhow::Result<()> {
    let db = SqliteStore::open(&config.database_path)?;
    match command {
        DbCommand::List => {
            for task in db.fetch_all()? {
                println!("#{} {task}", task.id);
            }
        }
        DbCommand::Add(args) => {
            let id = db.insert(&args.into_task()?)?;
            println!("inserted task #{id}");
        }
        DbCommand::Set { id, field, value } => {
            db.update_field(id, &TaskUpdate::parse(field, &value)?)?;
        }
        DbCommand::Complete { id } => db.update_status(id, Status::Completed)?,
        DbCommand::Delete { id } => db.delete_by_id(id)?,
    }
    Ok(())
}
