//! Turns due recurring tasks into concrete tasks.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error, info};

use crate::error::GenerateError;
use crate::models::{NewTask, RecurringTask, ScheduleUpdate, TaskStatus};
use crate::schedule::{calculate_next_generation_date, end_of_day, should_generate_task, start_of_day};
use crate::storage::TaskStore;

/// What happened to the recurring tasks considered by one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// `(recurring_task_id, task_id)` for every task created.
    pub generated: Vec<(u64, u64)>,
    /// Candidates not due today or already generated today.
    pub skipped: usize,
    /// Candidates abandoned because a store operation failed.
    pub failed: usize,
}

enum Outcome {
    Generated(u64),
    NotDue,
    AlreadyGenerated,
}

/// Generates today's tasks from every due recurring task.
///
/// `now` is the local wall-clock time of the run; its date is "today".
/// A failure to list candidates aborts the run before anything is written.
/// Any later failure only abandons the recurring task being processed; it stays
/// due because its `next_generation_at` was not advanced.
pub async fn generate_tasks_from_recurring<S>(
    store: &S,
    now: NaiveDateTime,
) -> Result<GenerationReport, GenerateError>
where
    S: TaskStore + ?Sized,
{
    let today = now.date();
    let candidates = store
        .list_active_recurring_tasks(today)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to fetch recurring tasks");
            GenerateError::Fetch(e)
        })?;
    debug!(count = candidates.len(), %today, "fetched recurring task candidates");

    let mut report = GenerationReport::default();
    for recurring in &candidates {
        match generate_one(store, recurring, today, now).await {
            Ok(Outcome::Generated(task_id)) => {
                info!(recurring_task_id = recurring.id, task_id, "generated task");
                report.generated.push((recurring.id, task_id));
            }
            Ok(Outcome::NotDue) => {
                debug!(recurring_task_id = recurring.id, "not due today");
                report.skipped += 1;
            }
            Ok(Outcome::AlreadyGenerated) => {
                debug!(recurring_task_id = recurring.id, "already generated today");
                report.skipped += 1;
            }
            Err(e) => {
                error!(recurring_task_id = recurring.id, error = %e, "failed to generate task");
                report.failed += 1;
            }
        }
    }

    info!(
        generated = report.generated.len(),
        skipped = report.skipped,
        failed = report.failed,
        %today,
        "recurring task generation finished"
    );
    Ok(report)
}

async fn generate_one<S>(
    store: &S,
    recurring: &RecurringTask,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<Outcome, GenerateError>
where
    S: TaskStore + ?Sized,
{
    if !should_generate_task(recurring, today) {
        return Ok(Outcome::NotDue);
    }

    let existing = store
        .list_generated_records(recurring.id, start_of_day(today))
        .await?;
    if !existing.is_empty() {
        return Ok(Outcome::AlreadyGenerated);
    }

    // Resolved before any write so an unschedulable rule leaves no task behind.
    let next = calculate_next_generation_date(recurring, today).ok_or(
        GenerateError::DateOutOfRange {
            recurring_task_id: recurring.id,
        },
    )?;

    let task = store
        .insert_task(NewTask {
            title: recurring.title.clone(),
            description: recurring.description.clone(),
            project_id: recurring.project_id,
            priority: recurring.priority,
            status: TaskStatus::NotStarted,
            deadline: end_of_day(today),
            recurring_task_id: Some(recurring.id),
        })
        .await?;

    if let Err(e) = store.insert_generated_record(recurring.id, task.id, now).await {
        // The task exists without a record, so a later run may create it again.
        error!(
            recurring_task_id = recurring.id,
            task_id = task.id,
            "task created but its generation record was not saved"
        );
        return Err(e.into());
    }

    store
        .update_recurring_task(
            recurring.id,
            ScheduleUpdate {
                last_generated_at: today,
                next_generation_at: next,
            },
        )
        .await?;
    debug!(recurring_task_id = recurring.id, %next, "rescheduled");

    Ok(Outcome::Generated(task.id))
}
