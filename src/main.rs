//! # Cadence
//!
//! A terminal tool for recurring tasks. You describe a task once, with a daily, weekly or
//! monthly rule. Then `cadence generate`, run once a day from cron or a systemd timer,
//! creates the concrete task on every matching day.
//!
//! ## Usage
//!
//! **Recurring tasks**
//! ```bash
//! # Every day
//! cadence recurring add "Check inbox" --type daily
//!
//! # Every other day, high priority, in project 1
//! cadence recurring add "Water plants" --type daily --interval 2 --priority 8 --project 1
//!
//! # Monday, Wednesday and Friday (0 = Sunday .. 6 = Saturday)
//! cadence recurring add "Standup notes" --type weekly --week-days 1,3,5
//!
//! # On the 31st, or the last day of shorter months
//! cadence recurring add "Invoice" --type monthly --month-day 31
//!
//! # Pause / resume, inspect
//! cadence recurring toggle <ID>
//! cadence recurring list
//! cadence recurring history <ID>
//! ```
//!
//! **Generating and working tasks**
//! ```bash
//! cadence generate
//! cadence generate --date 2025-12-01
//! cadence list --all
//! cadence start <ID>
//! cadence complete <ID>
//! ```
//!
//! ## Data Storage
//!
//! Each table lives in its own JSON file in your local data directory:
//! *   Linux: `~/.local/share/cadence/`
//! *   macOS: `~/Library/Application Support/cadence/`
//! *   Windows: `%APPDATA%\cadence\`
//!
//! You can override this by setting the `CADENCE_DATA_DIR` environment variable.
//!
//! ## Logging
//!
//! Diagnostics go to stderr. `RUST_LOG` overrides the default filter; `--verbose`
//! switches the default to debug.

use std::io;
use std::process::ExitCode;

use cadence::commands::*;
use cadence::error::CommandError;
use cadence::models::{RecurrenceType, TaskStatus};
use cadence::schedule::MAX_RECURRENCE_INTERVAL;
use cadence::storage::JsonStore;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Recurring task generator", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create today's tasks from due recurring tasks
    Generate {
        /// Generate as if today were this date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Manage recurring tasks
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// List tasks sorted by deadline
    List {
        /// Show completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a task as in progress
    Start {
        id: u64,
    },
    /// Mark a task as complete
    Complete {
        id: u64,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Reset the database (delete all tasks, recurring tasks and projects)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecurArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<RecurArg> for RecurrenceType {
    fn from(r: RecurArg) -> Self {
        match r {
            RecurArg::Daily => RecurrenceType::Daily,
            RecurArg::Weekly => RecurrenceType::Weekly,
            RecurArg::Monthly => RecurrenceType::Monthly,
        }
    }
}

#[derive(Args)]
struct RuleArgs {
    /// Description copied into generated tasks
    #[arg(short, long)]
    description: Option<String>,
    /// Project ID
    #[arg(short, long)]
    project: Option<u64>,
    /// Detach from the current project (edit only)
    #[arg(long, conflicts_with = "project")]
    no_project: bool,
    /// Priority (0-10)
    #[arg(short = 'P', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    priority: Option<u8>,
    /// Recurrence (daily, weekly, monthly)
    #[arg(short = 't', long = "type", value_enum)]
    recurrence_type: Option<RecurArg>,
    /// Days (daily) or months (monthly) between occurrences
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RECURRENCE_INTERVAL)))]
    interval: Option<u32>,
    /// Weekdays for weekly recurrence, 0=Sun..6=Sat, e.g. 1,3,5
    #[arg(short, long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(0..=6))]
    week_days: Option<Vec<u8>>,
    /// Day of month for monthly recurrence (1-31)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=31))]
    month_day: Option<u8>,
}

impl From<RuleArgs> for RecurringOptions {
    fn from(a: RuleArgs) -> Self {
        RecurringOptions {
            description: a.description,
            project: a.project,
            clear_project: a.no_project,
            priority: a.priority,
            recurrence_type: a.recurrence_type.map(Into::into),
            interval: a.interval,
            week_days: a.week_days,
            month_day: a.month_day,
        }
    }
}

#[derive(Subcommand)]
enum RecurringCommands {
    /// Add a new recurring task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// List recurring tasks
    List,
    /// Edit a recurring task
    Edit {
        id: u64,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Pause or resume a recurring task
    Toggle {
        id: u64,
    },
    /// Remove a recurring task and its generation history
    Remove {
        id: u64,
    },
    /// Show the tasks a recurring task has generated
    History {
        id: u64,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a new project
    Add {
        name: String,
    },
    /// List projects
    List,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cadence=debug,warn" } else { "cadence=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<(), CommandError> {
    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "cadence", &mut io::stdout());
        return Ok(());
    }

    let store = JsonStore::from_env()?;
    match command {
        Commands::Generate { date } => cmd_generate(&store, date, false).await.map(|_| ()),
        Commands::Recurring { command } => match command {
            RecurringCommands::Add { title, rule } => {
                cmd_recurring_add(&store, title, rule.into(), false).await.map(|_| ())
            }
            RecurringCommands::List => cmd_recurring_list(&store).await,
            RecurringCommands::Edit { id, title, rule } => {
                cmd_recurring_edit(&store, id, title, rule.into(), false).await
            }
            RecurringCommands::Toggle { id } => cmd_recurring_toggle(&store, id, false).await.map(|_| ()),
            RecurringCommands::Remove { id } => cmd_recurring_remove(&store, id, false).await,
            RecurringCommands::History { id } => cmd_recurring_history(&store, id).await,
        },
        Commands::List { all } => cmd_list(&store, all).await,
        Commands::Start { id } => cmd_set_status(&store, id, TaskStatus::InProgress, false).await,
        Commands::Complete { id } => cmd_set_status(&store, id, TaskStatus::Completed, false).await,
        Commands::Project { command } => match command {
            ProjectCommands::Add { name } => cmd_project_add(&store, name, false).await.map(|_| ()),
            ProjectCommands::List => cmd_project_list(&store).await,
        },
        Commands::Reset { force } => cmd_reset(&store, force).await,
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
