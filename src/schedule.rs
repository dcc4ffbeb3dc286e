use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use crate::models::{RecurrenceType, RecurringTask};

/// Largest accepted `recurrence_interval`, in days or months.
pub const MAX_RECURRENCE_INTERVAL: u32 = 1000;

/// Returns whether a recurring task is a generation candidate on `as_of`.
///
/// Active, and either never scheduled or scheduled on or before `as_of`.
/// This is only the coarse filter; [`should_generate_task`] has the final say.
pub fn is_candidate(task: &RecurringTask, as_of: NaiveDate) -> bool {
    task.is_active && task.next_generation_at.map_or(true, |next| next <= as_of)
}

/// Decides whether `task` should produce a concrete task on `today`.
///
/// # Returns
/// - `true` if the task was never scheduled.
/// - `false` while `next_generation_at` is still in the future.
/// - Otherwise the recurrence rule decides:
///   - **Daily**: always.
///   - **Weekly**: today's weekday (0 = Sunday) is listed in `week_days`.
///   - **Monthly**: today's day of month equals `month_day` exactly.
pub fn should_generate_task(task: &RecurringTask, today: NaiveDate) -> bool {
    match task.next_generation_at {
        None => return true,
        Some(next) if next > today => return false,
        Some(_) => {}
    }

    match task.recurrence_type {
        RecurrenceType::Daily => true,
        RecurrenceType::Weekly => {
            let weekday = weekday_number(today);
            task.week_days.contains(&weekday)
        }
        RecurrenceType::Monthly => task.month_day == Some(today.day() as u8),
    }
}

/// Computes the date stored as `next_generation_at` after generating on `from`.
///
/// - **Daily**: `from` plus `recurrence_interval` days.
/// - **Weekly**: the next listed weekday after `from`, wrapping into the following
///   week; 7 days when no weekday is listed. The interval is not used.
/// - **Monthly**: `recurrence_interval` months later on `month_day`, clamped to the
///   length of that month (the 31st becomes February 28th or 29th).
///
/// Returns `None` only if the result falls outside chrono's date range.
pub fn calculate_next_generation_date(task: &RecurringTask, from: NaiveDate) -> Option<NaiveDate> {
    match task.recurrence_type {
        RecurrenceType::Daily => {
            from.checked_add_days(Days::new(u64::from(task.recurrence_interval)))
        }
        RecurrenceType::Weekly => {
            from.checked_add_days(Days::new(days_until_next_weekday(&task.week_days, from)))
        }
        RecurrenceType::Monthly => {
            let day = task.month_day.map_or(from.day(), u32::from);
            let first = from.with_day(1)?;
            let target = first.checked_add_months(Months::new(task.recurrence_interval))?;
            let last = days_in_month(target)?;
            target.with_day(day.min(last))
        }
    }
}

/// Midnight at the start of `day`.
pub fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// The last millisecond of `day` (23:59:59.999).
pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    start_of_day(day) + Duration::days(1) - Duration::milliseconds(1)
}

/// Weekday as 0 = Sunday .. 6 = Saturday.
fn weekday_number(day: NaiveDate) -> u8 {
    day.weekday().num_days_from_sunday() as u8
}

fn days_until_next_weekday(week_days: &[u8], from: NaiveDate) -> u64 {
    let mut days: Vec<u8> = week_days.to_vec();
    days.sort_unstable();
    days.dedup();

    let current = weekday_number(from);
    match (days.iter().find(|&&d| d > current), days.first()) {
        (Some(&next), _) => u64::from(next - current),
        (None, Some(&first)) => u64::from(7 - current + first),
        (None, None) => 7,
    }
}

fn days_in_month(first_of_month: NaiveDate) -> Option<u32> {
    first_of_month
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|d| d.day())
}
