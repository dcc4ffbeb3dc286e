//! Error types for the store, the generator and the command layer.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The data file exists but could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data file is not valid JSON for its table.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// One row of the table does not match its schema, e.g. an unknown
    /// `recurrence_type`. `row` is the zero-based array index.
    #[error("invalid row {row} in {}: {source}", .path.display())]
    InvalidRow {
        path: PathBuf,
        row: usize,
        source: serde_json::Error,
    },

    #[error("failed to serialize {table}: {source}")]
    Serialize {
        table: &'static str,
        source: serde_json::Error,
    },

    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: u64 },

    /// A second generation record for the same recurring task and day.
    #[error("recurring task {recurring_task_id} already generated a task on {day}")]
    Duplicate {
        recurring_task_id: u64,
        day: NaiveDate,
    },

    #[error("project {0} does not exist")]
    MissingProject(u64),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    /// Listing candidates failed; nothing was processed.
    #[error("failed to fetch recurring tasks: {0}")]
    Fetch(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("next generation date for recurring task {recurring_task_id} is out of range")]
    DateOutOfRange { recurring_task_id: u64 },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
}
