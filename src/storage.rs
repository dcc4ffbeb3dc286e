use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{
    GeneratedTask, NewRecurringTask, NewTask, Project, RecurringTask, ScheduleUpdate, Task,
};
use crate::schedule::is_candidate;

/// Persistence operations the generator depends on.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Active recurring tasks whose `next_generation_at` is absent or on/before `as_of`.
    async fn list_active_recurring_tasks(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<RecurringTask>, StoreError>;

    /// Generation records of one recurring task at or after `since`.
    async fn list_generated_records(
        &self,
        recurring_task_id: u64,
        since: NaiveDateTime,
    ) -> Result<Vec<GeneratedTask>, StoreError>;

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn insert_generated_record(
        &self,
        recurring_task_id: u64,
        task_id: u64,
        at: NaiveDateTime,
    ) -> Result<GeneratedTask, StoreError>;

    async fn update_recurring_task(
        &self,
        recurring_task_id: u64,
        update: ScheduleUpdate,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy)]
enum Table {
    RecurringTasks,
    Tasks,
    GeneratedTasks,
    Projects,
}

impl Table {
    const ALL: [Table; 4] = [
        Table::RecurringTasks,
        Table::Tasks,
        Table::GeneratedTasks,
        Table::Projects,
    ];

    fn name(self) -> &'static str {
        match self {
            Table::RecurringTasks => "recurring_tasks",
            Table::Tasks => "tasks",
            Table::GeneratedTasks => "generated_tasks",
            Table::Projects => "projects",
        }
    }
}

/// Returns the data directory.
///
/// The path is determined in the following order:
/// 1. `CADENCE_DATA_DIR` environment variable.
/// 2. `~/.local/share/cadence` (on Linux).
/// 3. `./cadence` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var("CADENCE_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("cadence");
        p
    })
}

/// Store keeping each table as a JSON array file in one directory.
///
/// Writes rewrite the whole file. A missing file reads as an empty table.
pub struct JsonStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Opens the store in [`data_dir`].
    pub fn from_env() -> Result<Self, StoreError> {
        Self::open(data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.json", table.name()))
    }

    async fn load<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, StoreError> {
        let path = self.path(table);
        let s = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        // Rows are decoded one by one so a bad row can be named in the error.
        let values: Vec<serde_json::Value> = serde_json::from_str(&s).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                serde_json::from_value(value).map_err(|source| StoreError::InvalidRow {
                    path: path.clone(),
                    row,
                    source,
                })
            })
            .collect()
    }

    async fn save<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<(), StoreError> {
        let path = self.path(table);
        let s = serde_json::to_string_pretty(rows).map_err(|source| StoreError::Serialize {
            table: table.name(),
            source,
        })?;
        tokio::fs::write(&path, s)
            .await
            .map_err(|source| StoreError::Io { path, source })?;
        debug!(table = table.name(), rows = rows.len(), "saved table");
        Ok(())
    }

    /// Loads all recurring tasks.
    pub async fn recurring_tasks(&self) -> Result<Vec<RecurringTask>, StoreError> {
        self.load(Table::RecurringTasks).await
    }

    /// Loads a single recurring task by its ID.
    pub async fn recurring_task(&self, id: u64) -> Result<RecurringTask, StoreError> {
        self.recurring_tasks()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound {
                table: "recurring task",
                id,
            })
    }

    /// Creates a recurring task. It starts active and immediately eligible.
    pub async fn insert_recurring_task(
        &self,
        new: NewRecurringTask,
    ) -> Result<RecurringTask, StoreError> {
        let _guard = self.write_lock.lock().await;
        if let Some(project_id) = new.project_id {
            let projects: Vec<Project> = self.load(Table::Projects).await?;
            if !projects.iter().any(|p| p.id == project_id) {
                return Err(StoreError::MissingProject(project_id));
            }
        }

        let mut rows: Vec<RecurringTask> = self.load(Table::RecurringTasks).await?;
        let task = RecurringTask {
            id: next_id(rows.iter().map(|t| t.id)),
            title: new.title,
            description: new.description,
            project_id: new.project_id,
            priority: new.priority,
            recurrence_type: new.recurrence_type,
            recurrence_interval: new.recurrence_interval,
            week_days: new.week_days,
            month_day: new.month_day,
            is_active: true,
            last_generated_at: None,
            next_generation_at: None,
            created_at: Local::now().to_rfc3339(),
        };
        rows.push(task.clone());
        self.save(Table::RecurringTasks, &rows).await?;
        Ok(task)
    }

    /// Replaces an existing recurring task with the same ID.
    pub async fn save_recurring_task(&self, task: &RecurringTask) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<RecurringTask> = self.load(Table::RecurringTasks).await?;
        let slot = rows
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(StoreError::NotFound {
                table: "recurring task",
                id: task.id,
            })?;
        *slot = task.clone();
        self.save(Table::RecurringTasks, &rows).await
    }

    /// Deletes a recurring task together with its generation records.
    ///
    /// Tasks it already produced are kept.
    pub async fn delete_recurring_task(&self, id: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<RecurringTask> = self.load(Table::RecurringTasks).await?;
        let len_before = rows.len();
        rows.retain(|t| t.id != id);
        if rows.len() == len_before {
            return Err(StoreError::NotFound {
                table: "recurring task",
                id,
            });
        }
        self.save(Table::RecurringTasks, &rows).await?;

        let mut records: Vec<GeneratedTask> = self.load(Table::GeneratedTasks).await?;
        records.retain(|r| r.recurring_task_id != id);
        self.save(Table::GeneratedTasks, &records).await
    }

    /// Loads all concrete tasks.
    pub async fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.load(Table::Tasks).await
    }

    pub async fn task(&self, id: u64) -> Result<Task, StoreError> {
        self.tasks()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound { table: "task", id })
    }

    /// Replaces an existing task with the same ID.
    pub async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<Task> = self.load(Table::Tasks).await?;
        let slot = rows
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(StoreError::NotFound {
                table: "task",
                id: task.id,
            })?;
        *slot = task.clone();
        self.save(Table::Tasks, &rows).await
    }

    /// Loads every generation record.
    pub async fn generated_records(&self) -> Result<Vec<GeneratedTask>, StoreError> {
        self.load(Table::GeneratedTasks).await
    }

    pub async fn insert_project(&self, name: String) -> Result<Project, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<Project> = self.load(Table::Projects).await?;
        let project = Project {
            id: next_id(rows.iter().map(|p| p.id)),
            name,
            created_at: Local::now().to_rfc3339(),
        };
        rows.push(project.clone());
        self.save(Table::Projects, &rows).await?;
        Ok(project)
    }

    pub async fn projects(&self) -> Result<Vec<Project>, StoreError> {
        self.load(Table::Projects).await
    }

    /// Deletes every table file.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        for table in Table::ALL {
            let path = self.path(table);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonStore {
    async fn list_active_recurring_tasks(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<RecurringTask>, StoreError> {
        let mut rows = self.recurring_tasks().await?;
        rows.retain(|t| is_candidate(t, as_of));
        Ok(rows)
    }

    async fn list_generated_records(
        &self,
        recurring_task_id: u64,
        since: NaiveDateTime,
    ) -> Result<Vec<GeneratedTask>, StoreError> {
        let mut rows = self.generated_records().await?;
        rows.retain(|r| r.recurring_task_id == recurring_task_id && r.generated_at >= since);
        Ok(rows)
    }

    async fn insert_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<Task> = self.load(Table::Tasks).await?;
        let task = Task {
            id: next_id(rows.iter().map(|t| t.id)),
            title: new.title,
            description: new.description,
            project_id: new.project_id,
            priority: new.priority,
            status: new.status,
            deadline: new.deadline,
            recurring_task_id: new.recurring_task_id,
            created_at: Local::now().to_rfc3339(),
        };
        rows.push(task.clone());
        self.save(Table::Tasks, &rows).await?;
        Ok(task)
    }

    async fn insert_generated_record(
        &self,
        recurring_task_id: u64,
        task_id: u64,
        at: NaiveDateTime,
    ) -> Result<GeneratedTask, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<GeneratedTask> = self.load(Table::GeneratedTasks).await?;
        let day = at.date();
        if rows
            .iter()
            .any(|r| r.recurring_task_id == recurring_task_id && r.generated_at.date() == day)
        {
            return Err(StoreError::Duplicate {
                recurring_task_id,
                day,
            });
        }
        let record = GeneratedTask {
            id: next_id(rows.iter().map(|r| r.id)),
            recurring_task_id,
            task_id,
            generated_at: at,
        };
        rows.push(record.clone());
        self.save(Table::GeneratedTasks, &rows).await?;
        Ok(record)
    }

    async fn update_recurring_task(
        &self,
        recurring_task_id: u64,
        update: ScheduleUpdate,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<RecurringTask> = self.load(Table::RecurringTasks).await?;
        let task = rows
            .iter_mut()
            .find(|t| t.id == recurring_task_id)
            .ok_or(StoreError::NotFound {
                table: "recurring task",
                id: recurring_task_id,
            })?;
        task.last_generated_at = Some(update.last_generated_at);
        task.next_generation_at = Some(update.next_generation_at);
        self.save(Table::RecurringTasks, &rows).await
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}
