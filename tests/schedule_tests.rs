use cadence::models::{RecurrenceType, RecurringTask};
use cadence::schedule::{
    calculate_next_generation_date, end_of_day, is_candidate, should_generate_task, start_of_day,
};
use chrono::{NaiveDate, Timelike};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn recurring(recurrence_type: RecurrenceType) -> RecurringTask {
    RecurringTask {
        id: 1,
        title: "Test".into(),
        description: None,
        project_id: None,
        priority: 0,
        recurrence_type,
        recurrence_interval: 1,
        week_days: Vec::new(),
        month_day: None,
        is_active: true,
        last_generated_at: None,
        next_generation_at: None,
        created_at: String::new(),
    }
}

#[test]
fn test_never_scheduled_is_always_due() {
    let mut t = recurring(RecurrenceType::Weekly);
    // Sunday is not listed, but the gate was never set.
    t.week_days = vec![1];
    assert!(should_generate_task(&t, date("2025-01-19")));
}

#[test]
fn test_future_gate_blocks_every_type() {
    let today = date("2025-01-15");
    for kind in [RecurrenceType::Daily, RecurrenceType::Weekly, RecurrenceType::Monthly] {
        let mut t = recurring(kind);
        t.week_days = vec![0, 1, 2, 3, 4, 5, 6];
        t.month_day = Some(15);
        t.next_generation_at = Some(date("2025-01-16"));
        assert!(!should_generate_task(&t, today), "{kind} should wait for its gate");
    }
}

#[test]
fn test_daily_interval() {
    let mut t = recurring(RecurrenceType::Daily);
    t.recurrence_interval = 3;
    let from = date("2025-01-15");
    let next = calculate_next_generation_date(&t, from).unwrap();
    assert_eq!(next, date("2025-01-18"));

    t.next_generation_at = Some(next);
    assert!(!should_generate_task(&t, date("2025-01-16")));
    assert!(!should_generate_task(&t, date("2025-01-17")));
    assert!(should_generate_task(&t, date("2025-01-18")));
    // A missed day stays due until generated.
    assert!(should_generate_task(&t, date("2025-01-20")));
}

#[test]
fn test_weekly_matches_listed_days_only() {
    let mut t = recurring(RecurrenceType::Weekly);
    t.week_days = vec![1, 3, 5];
    t.next_generation_at = Some(date("2025-01-13"));

    assert!(should_generate_task(&t, date("2025-01-13"))); // Mon
    assert!(!should_generate_task(&t, date("2025-01-14"))); // Tue
    assert!(should_generate_task(&t, date("2025-01-15"))); // Wed
    assert!(!should_generate_task(&t, date("2025-01-16"))); // Thu
    assert!(should_generate_task(&t, date("2025-01-17"))); // Fri
    assert!(!should_generate_task(&t, date("2025-01-18"))); // Sat
    assert!(!should_generate_task(&t, date("2025-01-19"))); // Sun
}

#[test]
fn test_weekly_without_days_never_matches() {
    let mut t = recurring(RecurrenceType::Weekly);
    t.next_generation_at = Some(date("2025-01-13"));
    assert!(!should_generate_task(&t, date("2025-01-15")));

    let next = calculate_next_generation_date(&t, date("2025-01-15")).unwrap();
    assert_eq!(next, date("2025-01-22"));
}

#[test]
fn test_weekly_next_date() {
    let mut t = recurring(RecurrenceType::Weekly);
    t.week_days = vec![5, 1, 3];

    // Wednesday -> Friday
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-15")), Some(date("2025-01-17")));
    // Friday -> next Monday
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-17")), Some(date("2025-01-20")));
    // Saturday -> next Monday
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-18")), Some(date("2025-01-20")));
}

#[test]
fn test_weekly_ignores_interval() {
    // Current behavior: the interval has no effect on weekly recurrence.
    let mut t = recurring(RecurrenceType::Weekly);
    t.week_days = vec![3];
    t.recurrence_interval = 2;
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-15")), Some(date("2025-01-22")));
}

#[test]
fn test_monthly_exact_day() {
    let mut t = recurring(RecurrenceType::Monthly);
    t.month_day = Some(15);
    t.next_generation_at = Some(date("2025-01-01"));
    assert!(should_generate_task(&t, date("2025-01-15")));
    assert!(!should_generate_task(&t, date("2025-01-14")));

    assert_eq!(calculate_next_generation_date(&t, date("2025-01-15")), Some(date("2025-02-15")));
    t.recurrence_interval = 3;
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-15")), Some(date("2025-04-15")));
}

#[test]
fn test_monthly_clamps_to_month_end() {
    let mut t = recurring(RecurrenceType::Monthly);
    t.month_day = Some(31);
    assert_eq!(calculate_next_generation_date(&t, date("2025-01-31")), Some(date("2025-02-28")));
    assert_eq!(calculate_next_generation_date(&t, date("2024-01-31")), Some(date("2024-02-29")));
    assert_eq!(calculate_next_generation_date(&t, date("2025-03-31")), Some(date("2025-04-30")));
    // Back to a long month after a short one.
    assert_eq!(calculate_next_generation_date(&t, date("2025-02-28")), Some(date("2025-03-31")));
}

#[test]
fn test_monthly_does_not_match_short_month_end() {
    // No substitution on the matching side: the 31st never matches in February.
    let mut t = recurring(RecurrenceType::Monthly);
    t.month_day = Some(31);
    t.next_generation_at = Some(date("2025-02-28"));
    assert!(!should_generate_task(&t, date("2025-02-28")));
}

#[test]
fn test_monthly_crosses_year() {
    let mut t = recurring(RecurrenceType::Monthly);
    t.month_day = Some(10);
    t.recurrence_interval = 2;
    assert_eq!(calculate_next_generation_date(&t, date("2025-12-10")), Some(date("2026-02-10")));
}

#[test]
fn test_candidate_filter() {
    let today = date("2025-01-15");
    let mut t = recurring(RecurrenceType::Daily);
    assert!(is_candidate(&t, today));

    t.next_generation_at = Some(today);
    assert!(is_candidate(&t, today));

    t.next_generation_at = Some(date("2025-01-16"));
    assert!(!is_candidate(&t, today));

    t.next_generation_at = None;
    t.is_active = false;
    assert!(!is_candidate(&t, today));
}

#[test]
fn test_day_bounds() {
    let d = date("2025-01-15");
    assert_eq!(start_of_day(d).to_string(), "2025-01-15 00:00:00");
    let end = end_of_day(d);
    assert_eq!(end.date(), d);
    assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    assert_eq!(end.nanosecond(), 999_000_000);
}
