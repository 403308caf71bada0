use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::types::ScheduleKind;

/// Compute the next UTC execution time for `schedule` strictly after `after`.
///
/// Keyword schedules are anchored to fixed clock boundaries (top of hour,
/// midnight, Monday midnight) so the result depends only on the reference
/// time, never on when the function is called. Returns `None` for `Manual`
/// and for cron expressions that match no instant in the search window.
pub fn next_run_after(schedule: &ScheduleKind, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        ScheduleKind::Manual => None,

        ScheduleKind::Hourly => {
            let anchor = after
                .with_minute(0)?
                .with_second(0)?
                .with_nanosecond(0)?;
            Some(anchor + Duration::hours(1))
        }

        ScheduleKind::Daily => {
            let midnight = after.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
            Some(midnight + Duration::days(1))
        }

        ScheduleKind::Weekly => {
            let days_into_week = after.weekday().num_days_from_monday() as i64;
            let week_start = after.date_naive().and_hms_opt(0, 0, 0)?.and_utc()
                - Duration::days(days_into_week);
            Some(week_start + Duration::days(7))
        }

        ScheduleKind::Cron(expr) => expr.next_after(after),
    }
}
