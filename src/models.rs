use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How often a recurring task produces a concrete task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

/// A rule describing a task that is periodically instantiated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecurringTask {
    /// Unique identifier for the recurring task.
    pub id: u64,
    /// Title copied into every generated task.
    pub title: String,
    /// Optional description copied into every generated task.
    #[serde(default)]
    pub description: Option<String>,
    /// Project the generated tasks belong to, if any.
    #[serde(default)]
    pub project_id: Option<u64>,
    /// Priority from 0 to 10.
    #[serde(default)]
    pub priority: u8,
    pub recurrence_type: RecurrenceType,
    /// Days between occurrences for `daily`, months for `monthly`.
    /// Weekly recurrence does not look at it.
    pub recurrence_interval: u32,
    /// Weekday numbers, 0 = Sunday through 6 = Saturday. Weekly only.
    #[serde(default)]
    pub week_days: Vec<u8>,
    /// Day of month, 1 to 31. Monthly only.
    #[serde(default)]
    pub month_day: Option<u8>,
    pub is_active: bool,
    /// Date of the last successful generation.
    #[serde(default)]
    pub last_generated_at: Option<NaiveDate>,
    /// Earliest date the next generation may happen. `None` means immediately.
    #[serde(default)]
    pub next_generation_at: Option<NaiveDate>,
    /// Timestamp when the recurring task was created (ISO 8601).
    pub created_at: String,
}

/// Fields needed to create a recurring task; the store assigns the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<u64>,
    pub priority: u8,
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: u32,
    pub week_days: Vec<u8>,
    pub month_day: Option<u8>,
}

/// The two fields the generator moves forward after producing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub last_generated_at: NaiveDate,
    pub next_generation_at: NaiveDate,
}

/// Links a recurring task to a task it produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedTask {
    pub id: u64,
    pub recurring_task_id: u64,
    pub task_id: u64,
    /// Local wall-clock time of the generation.
    pub generated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::NotStarted => "Not started",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Done",
        };
        f.write_str(s)
    }
}

/// A concrete task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub priority: u8,
    pub status: TaskStatus,
    pub deadline: NaiveDateTime,
    /// Recurring task that produced this one, if any.
    #[serde(default)]
    pub recurring_task_id: Option<u64>,
    /// Timestamp when the task was created (ISO 8601).
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<u64>,
    pub priority: u8,
    pub status: TaskStatus,
    pub deadline: NaiveDateTime,
    pub recurring_task_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub created_at: String,
}
