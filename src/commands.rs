use std::io::{self, Write};

use chrono::{Local, NaiveDate, NaiveDateTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::error::{CommandError, StoreError};
use crate::generator::{generate_tasks_from_recurring, GenerationReport};
use crate::models::{NewRecurringTask, RecurrenceType, RecurringTask, TaskStatus};
use crate::schedule::MAX_RECURRENCE_INTERVAL;
use crate::storage::JsonStore;

/// Options shared by `recurring add` and `recurring edit`.
#[derive(Debug, Default, Clone)]
pub struct RecurringOptions {
    pub description: Option<String>,
    pub project: Option<u64>,
    /// Detach from the current project. Edit only.
    pub clear_project: bool,
    pub priority: Option<u8>,
    pub recurrence_type: Option<RecurrenceType>,
    pub interval: Option<u32>,
    pub week_days: Option<Vec<u8>>,
    pub month_day: Option<u8>,
}

fn parse_date(s: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| CommandError::InvalidInput(format!("Invalid date '{}': {}. Use YYYY-MM-DD.", s, e)))
}

/// Checks the recurrence fields of a recurring task.
///
/// Weekly needs at least one weekday in 0..=6, monthly needs a day in 1..=31,
/// the interval must be in 1..=[`MAX_RECURRENCE_INTERVAL`] and the priority at most 10.
pub fn validate_recurring(task: &NewRecurringTask) -> Result<(), CommandError> {
    if task.title.trim().is_empty() {
        return Err(CommandError::InvalidInput("Title must not be empty.".into()));
    }
    if !(1..=MAX_RECURRENCE_INTERVAL).contains(&task.recurrence_interval) {
        return Err(CommandError::InvalidInput(format!(
            "Interval {} is out of range 1-{}.",
            task.recurrence_interval, MAX_RECURRENCE_INTERVAL
        )));
    }
    if task.priority > 10 {
        return Err(CommandError::InvalidInput(format!(
            "Priority {} is out of range 0-10.",
            task.priority
        )));
    }
    match task.recurrence_type {
        RecurrenceType::Daily => {}
        RecurrenceType::Weekly => {
            if task.week_days.is_empty() {
                return Err(CommandError::InvalidInput(
                    "Weekly recurrence needs --week-days (0=Sun..6=Sat).".into(),
                ));
            }
            if let Some(d) = task.week_days.iter().find(|&&d| d > 6) {
                return Err(CommandError::InvalidInput(format!(
                    "Weekday {} is out of range 0-6.",
                    d
                )));
            }
        }
        RecurrenceType::Monthly => match task.month_day {
            Some(1..=31) => {}
            Some(d) => {
                return Err(CommandError::InvalidInput(format!(
                    "Month day {} is out of range 1-31.",
                    d
                )))
            }
            None => {
                return Err(CommandError::InvalidInput(
                    "Monthly recurrence needs --month-day.".into(),
                ))
            }
        },
    }
    Ok(())
}

/// Runs the generator for today, or for `date` at the current time of day.
pub async fn cmd_generate(
    store: &JsonStore,
    date: Option<String>,
    silent: bool,
) -> Result<GenerationReport, CommandError> {
    let now = Local::now().naive_local();
    let now = match date {
        Some(d) => NaiveDateTime::new(parse_date(&d)?, now.time()),
        None => now,
    };

    let report = generate_tasks_from_recurring(store, now).await?;
    if !silent {
        println!(
            "Generated {} task(s) for {} ({} skipped, {} failed).",
            report.generated.len(),
            now.date(),
            report.skipped,
            report.failed
        );
        for (recurring_id, task_id) in &report.generated {
            println!("  recurring {} -> task {}", recurring_id, task_id);
        }
    }
    Ok(report)
}

/// Adds a new recurring task. It is active and eligible immediately.
pub async fn cmd_recurring_add(
    store: &JsonStore,
    title: String,
    opts: RecurringOptions,
    silent: bool,
) -> Result<RecurringTask, CommandError> {
    let recurrence_type = opts.recurrence_type.unwrap_or(RecurrenceType::Daily);
    let new = NewRecurringTask {
        title,
        description: opts.description,
        project_id: opts.project,
        priority: opts.priority.unwrap_or(0),
        recurrence_type,
        recurrence_interval: opts.interval.unwrap_or(1),
        week_days: opts.week_days.unwrap_or_default(),
        month_day: opts.month_day,
    };

    validate_recurring(&new)?;

    let task = store.insert_recurring_task(new).await?;
    if !silent {
        println!("Recurring task added (id = {})", task.id);
    }
    Ok(task)
}

/// Edits an existing recurring task. Only the given fields change.
///
/// Changing the recurrence rule clears `next_generation_at`, so the new rule is
/// evaluated from the next run on. Today's generation record still prevents a
/// second task on the same day.
pub async fn cmd_recurring_edit(
    store: &JsonStore,
    id: u64,
    title: Option<String>,
    opts: RecurringOptions,
    silent: bool,
) -> Result<(), CommandError> {
    let mut task = store.recurring_task(id).await?;
    if let Some(t) = title { task.title = t; }
    if let Some(d) = opts.description { task.description = Some(d); }
    if let Some(p) = opts.project {
        if !store.projects().await?.iter().any(|proj| proj.id == p) {
            return Err(StoreError::MissingProject(p).into());
        }
        task.project_id = Some(p);
    }
    if opts.clear_project { task.project_id = None; }
    if let Some(p) = opts.priority { task.priority = p; }

    let rule_before = (
        task.recurrence_type,
        task.recurrence_interval,
        task.week_days.clone(),
        task.month_day,
    );
    if let Some(r) = opts.recurrence_type { task.recurrence_type = r; }
    if let Some(i) = opts.interval { task.recurrence_interval = i; }
    if let Some(w) = opts.week_days { task.week_days = w; }
    if let Some(m) = opts.month_day { task.month_day = Some(m); }
    // A new rule starts over: the old gate was computed from the old rule.
    let rule_changed = rule_before
        != (task.recurrence_type, task.recurrence_interval, task.week_days.clone(), task.month_day);
    if rule_changed { task.next_generation_at = None; }
    validate_recurring(&NewRecurringTask {
        title: task.title.clone(),
        description: task.description.clone(),
        project_id: task.project_id,
        priority: task.priority,
        recurrence_type: task.recurrence_type,
        recurrence_interval: task.recurrence_interval,
        week_days: task.week_days.clone(),
        month_day: task.month_day,
    })?;

    store.save_recurring_task(&task).await?;
    if !silent { println!("Recurring task {} updated.", id); }
    Ok(())
}

/// Flips a recurring task between active and inactive.
pub async fn cmd_recurring_toggle(store: &JsonStore, id: u64, silent: bool) -> Result<bool, CommandError> {
    let mut task = store.recurring_task(id).await?;
    task.is_active = !task.is_active;
    store.save_recurring_task(&task).await?;
    if !silent {
        let state = if task.is_active { "activated" } else { "deactivated" };
        println!("Recurring task {} {}.", id, state);
    }
    Ok(task.is_active)
}

/// Removes a recurring task and its generation history.
pub async fn cmd_recurring_remove(store: &JsonStore, id: u64, silent: bool) -> Result<(), CommandError> {
    store.delete_recurring_task(id).await?;
    if !silent { println!("Recurring task {} removed.", id); }
    Ok(())
}

fn describe_rule(t: &RecurringTask) -> String {
    match t.recurrence_type {
        RecurrenceType::Daily if t.recurrence_interval == 1 => "every day".to_string(),
        RecurrenceType::Daily => format!("every {} days", t.recurrence_interval),
        RecurrenceType::Weekly => {
            const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
            let mut days = t.week_days.clone();
            days.sort_unstable();
            days.dedup();
            let names: Vec<&str> = days
                .iter()
                .filter_map(|&d| NAMES.get(usize::from(d)).copied())
                .collect();
            format!("weekly on {}", names.join(", "))
        }
        RecurrenceType::Monthly => {
            let day = t.month_day.map_or("-".to_string(), |d| d.to_string());
            if t.recurrence_interval == 1 {
                format!("monthly on day {}", day)
            } else {
                format!("every {} months on day {}", t.recurrence_interval, day)
            }
        }
    }
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// Lists all recurring tasks in a formatted table.
pub async fn cmd_recurring_list(store: &JsonStore) -> Result<(), CommandError> {
    let tasks = store.recurring_tasks().await?;
    if tasks.is_empty() {
        println!("No recurring tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Project").add_attribute(Attribute::Bold),
            Cell::new("Rule").add_attribute(Attribute::Bold),
            Cell::new("Prio").add_attribute(Attribute::Bold),
            Cell::new("Last").add_attribute(Attribute::Bold),
            Cell::new("Next").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let (status, color) = if t.is_active { ("Active", Color::Green) } else { ("Paused", Color::Grey) };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.project_id.map(|p| p.to_string()).unwrap_or_default()),
            Cell::new(describe_rule(&t)),
            Cell::new(t.priority),
            Cell::new(fmt_date(t.last_generated_at)),
            Cell::new(fmt_date(t.next_generation_at)),
            Cell::new(status).fg(color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Lists the tasks a recurring task has generated, newest first.
pub async fn cmd_recurring_history(store: &JsonStore, id: u64) -> Result<(), CommandError> {
    let recurring = store.recurring_task(id).await?;
    let mut records: Vec<_> = store
        .generated_records()
        .await?
        .into_iter()
        .filter(|r| r.recurring_task_id == id)
        .collect();
    if records.is_empty() {
        println!("'{}' has not generated any tasks yet.", recurring.title);
        return Ok(());
    }
    records.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

    let tasks = store.tasks().await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["Generated At", "Task", "Status"]);
    for r in records {
        let status = tasks
            .iter()
            .find(|t| t.id == r.task_id)
            .map_or_else(|| "deleted".to_string(), |t| t.status.to_string());
        table.add_row(vec![
            r.generated_at.format("%Y-%m-%d %H:%M").to_string(),
            r.task_id.to_string(),
            status,
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Lists tasks in a formatted table, sorted by deadline.
///
/// By default, hides completed tasks unless `all` is true.
pub async fn cmd_list(store: &JsonStore, all: bool) -> Result<(), CommandError> {
    let mut tasks = store.tasks().await?;
    if !all {
        tasks.retain(|t| t.status != TaskStatus::Completed);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    tasks.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(b.priority.cmp(&a.priority)));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Project").add_attribute(Attribute::Bold),
            Cell::new("Deadline").add_attribute(Attribute::Bold),
            Cell::new("Time Left").add_attribute(Attribute::Bold),
            Cell::new("Prio").add_attribute(Attribute::Bold),
            Cell::new("From").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    let today = Local::now().date_naive();

    for t in tasks {
        let done = t.status == TaskStatus::Completed;
        let days_left = (t.deadline.date() - today).num_days();
        let time_left_str = if days_left < 0 {
            format!("{}d overdue", days_left.abs())
        } else if days_left == 0 {
            "Today".to_string()
        } else {
            format!("{}d", days_left)
        };

        let prio_color = if done {
            Color::Grey
        } else if t.priority >= 8 {
            Color::Red
        } else if t.priority >= 5 {
            Color::Yellow
        } else {
            Color::Green
        };

        let status_color = match t.status {
            TaskStatus::Completed => Color::Green,
            TaskStatus::InProgress => Color::Cyan,
            TaskStatus::NotStarted => Color::Yellow,
        };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.project_id.map(|p| p.to_string()).unwrap_or_default()),
            Cell::new(t.deadline.format("%Y-%m-%d %H:%M")),
            Cell::new(time_left_str).fg(if days_left < 0 && !done { Color::Red } else { Color::Reset }),
            Cell::new(t.priority).fg(prio_color),
            Cell::new(t.recurring_task_id.map(|r| format!("R{}", r)).unwrap_or_default()),
            Cell::new(t.status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Sets the status of a task by ID.
pub async fn cmd_set_status(
    store: &JsonStore,
    id: u64,
    status: TaskStatus,
    silent: bool,
) -> Result<(), CommandError> {
    let mut task = store.task(id).await?;
    task.status = status;
    store.save_task(&task).await?;
    if !silent { println!("Task {} marked as {}.", id, status); }
    Ok(())
}

/// Adds a new project.
pub async fn cmd_project_add(store: &JsonStore, name: String, silent: bool) -> Result<u64, CommandError> {
    if name.trim().is_empty() {
        return Err(CommandError::InvalidInput("Project name must not be empty.".into()));
    }
    if store.projects().await?.iter().any(|p| p.name == name) {
        return Err(CommandError::InvalidInput(format!("Project '{}' already exists.", name)));
    }
    let project = store.insert_project(name).await?;
    if !silent { println!("Project '{}' added (id = {})", project.name, project.id); }
    Ok(project.id)
}

/// Lists all projects.
pub async fn cmd_project_list(store: &JsonStore) -> Result<(), CommandError> {
    let projects = store.projects().await?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name"]);
    for p in projects {
        table.add_row(vec![p.id.to_string(), p.name]);
    }
    println!("{table}");
    Ok(())
}

/// Resets the database by deleting every table.
pub async fn cmd_reset(store: &JsonStore, force: bool) -> Result<(), CommandError> {
    if !force {
        print!("Are you sure you want to delete all tasks, recurring tasks and projects? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset().await?;
    println!("Database reset successfully.");
    Ok(())
}
