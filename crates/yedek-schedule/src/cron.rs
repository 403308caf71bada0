//! 5-field cron expression parsing and evaluation.
//!
//! ```text
//! ┌───────────── minute (0-59)
//! │ ┌───────────── hour (0-23)
//! │ │ ┌───────────── day of month (1-31)
//! │ │ │ ┌───────────── month (1-12)
//! │ │ │ │ ┌───────────── day of week (0-7, 0 and 7 = Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! Fields accept `*`, single values, ranges (`a-b`), steps (`/n`) and
//! comma-separated lists. Values are numeric only. When both day fields are
//! restricted (neither written exactly `*`), a date matches if *either*
//! matches — the standard cron rule.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Timelike, Utc};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// How far `next_after` searches before declaring the expression dead.
/// Four years covers every leap-year/weekday alignment.
const MAX_SEARCH_DAYS: u64 = 4 * 366;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("expected 5 fields (minute hour day month weekday), got {0}")]
    FieldCount(usize),

    #[error("invalid {field} value '{token}'")]
    BadToken { field: &'static str, token: String },

    #[error("{field} value {value} out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("invalid range {start}-{end}")]
    ReversedRange { start: u32, end: u32 },

    #[error("invalid step '{0}'")]
    BadStep(String),
}

/// One parsed cron field: the admissible value set plus a wildcard marker.
///
/// The marker records whether the field was written exactly `*`; the
/// day-of-month/day-of-week OR rule needs to distinguish `*` from an
/// enumeration that happens to cover the whole range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    values: BTreeSet<u32>,
    wildcard: bool,
}

impl CronField {
    fn parse(field: &'static str, text: &str, min: u32, max: u32) -> Result<Self, CronParseError> {
        let mut values = BTreeSet::new();
        for part in text.split(',') {
            parse_part(field, part.trim(), min, max, &mut values)?;
        }
        Ok(Self {
            values,
            wildcard: text == "*",
        })
    }

    pub fn matches(&self, value: u32) -> bool {
        self.values.contains(&value)
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Smallest admissible value >= `from`.
    fn next(&self, from: u32) -> Option<u32> {
        self.values.range(from..).next().copied()
    }
}

fn parse_part(
    field: &'static str,
    part: &str,
    min: u32,
    max: u32,
    values: &mut BTreeSet<u32>,
) -> Result<(), CronParseError> {
    let (range_part, step) = match part.find('/') {
        Some(idx) => {
            let step_str = &part[idx + 1..];
            let step = step_str
                .parse::<u32>()
                .map_err(|_| CronParseError::BadStep(step_str.to_string()))?;
            if step == 0 {
                return Err(CronParseError::BadStep("0".to_string()));
            }
            (&part[..idx], step)
        }
        None => (part, 1),
    };

    let (start, end) = if range_part == "*" {
        (min, max)
    } else if let Some(idx) = range_part.find('-') {
        let bad = |_| CronParseError::BadToken {
            field,
            token: range_part.to_string(),
        };
        let start = range_part[..idx].parse::<u32>().map_err(bad)?;
        let end = range_part[idx + 1..].parse::<u32>().map_err(bad)?;
        if start > end {
            return Err(CronParseError::ReversedRange { start, end });
        }
        (start, end)
    } else {
        let value = range_part
            .parse::<u32>()
            .map_err(|_| CronParseError::BadToken {
                field,
                token: range_part.to_string(),
            })?;
        (value, value)
    };

    if start < min || end > max {
        return Err(CronParseError::OutOfRange {
            field,
            value: if start < min { start } else { end },
            min,
            max,
        });
    }

    let mut value = start;
    while value <= end {
        values.insert(value);
        value += step;
    }
    Ok(())
}

/// A parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    /// Original expression text, kept for display and round-tripping.
    expr: String,
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronParseError::FieldCount(parts.len()));
        }

        let minute = CronField::parse("minute", parts[0], 0, 59)?;
        let hour = CronField::parse("hour", parts[1], 0, 23)?;
        let day_of_month = CronField::parse("day-of-month", parts[2], 1, 31)?;
        let month = CronField::parse("month", parts[3], 1, 12)?;
        // 7 is accepted as an alias for Sunday and folded onto 0.
        let mut day_of_week = CronField::parse("day-of-week", parts[4], 0, 7)?;
        day_of_week.values = day_of_week.values.iter().map(|v| v % 7).collect();

        Ok(Self {
            expr: expr.trim().to_string(),
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Whether `dt` (truncated to the minute) matches this expression.
    pub fn matches(&self, dt: &DateTime<Utc>) -> bool {
        self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.month.matches(dt.month())
            && self.date_matches(&dt.date_naive())
    }

    fn date_matches(&self, date: &NaiveDate) -> bool {
        let dom = self.day_of_month.matches(date.day());
        let dow = self.day_of_week.matches(date.weekday().num_days_from_sunday());
        // Both restricted: either may grant the day (vixie OR rule).
        if !self.day_of_month.is_wildcard() && !self.day_of_week.is_wildcard() {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Next matching instant strictly after `after`, at minute precision.
    ///
    /// Walks matching days rather than raw minutes, so even sparse
    /// expressions resolve in at most `MAX_SEARCH_DAYS` cheap iterations.
    /// Returns `None` when nothing matches inside the search window
    /// (e.g. `0 0 31 2 *` — February 31st never exists).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = (after + Duration::minutes(1))
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))?;
        let start_date = start.date_naive();

        for day_offset in 0..MAX_SEARCH_DAYS {
            let date = start_date.checked_add_days(Days::new(day_offset))?;
            if !self.month.matches(date.month()) || !self.date_matches(&date) {
                continue;
            }

            let same_day = day_offset == 0;
            let from_hour = if same_day { start.hour() } else { 0 };
            for hour in self.hour.values.range(from_hour..).copied() {
                let from_minute = if same_day && hour == start.hour() {
                    start.minute()
                } else {
                    0
                };
                if let Some(minute) = self.minute.next(from_minute) {
                    return date.and_hms_opt(hour, minute, 0).map(|dt| dt.and_utc());
                }
            }
        }
        None
    }
}

impl FromStr for CronExpr {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl std::fmt::Display for CronExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn wildcard_covers_full_range() {
        let expr = CronExpr::parse("* * * * *").unwrap();
        assert!(expr.minute.matches(0));
        assert!(expr.minute.matches(59));
        assert!(expr.hour.matches(23));
        assert!(expr.minute.is_wildcard());
    }

    #[test]
    fn single_values() {
        let expr = CronExpr::parse("30 4 * * *").unwrap();
        assert!(expr.minute.matches(30));
        assert!(!expr.minute.matches(31));
        assert!(expr.hour.matches(4));
    }

    #[test]
    fn ranges_steps_and_lists() {
        let expr = CronExpr::parse("0-30/15 */6 1,15 * *").unwrap();
        assert!(expr.minute.matches(0));
        assert!(expr.minute.matches(15));
        assert!(expr.minute.matches(30));
        assert!(!expr.minute.matches(45));
        assert!(expr.hour.matches(0));
        assert!(expr.hour.matches(18));
        assert!(!expr.hour.matches(19));
        assert!(expr.day_of_month.matches(1));
        assert!(expr.day_of_month.matches(15));
        assert!(!expr.day_of_month.matches(2));
    }

    #[test]
    fn four_fields_rejected() {
        assert_eq!(
            CronExpr::parse("* * * *").unwrap_err(),
            CronParseError::FieldCount(4)
        );
    }

    #[test]
    fn six_fields_rejected() {
        assert_eq!(
            CronExpr::parse("* * * * * *").unwrap_err(),
            CronParseError::FieldCount(6)
        );
    }

    #[test]
    fn out_of_range_values_rejected() {
        assert!(CronExpr::parse("60 * * * *").is_err());
        assert!(CronExpr::parse("* 24 * * *").is_err());
        assert!(CronExpr::parse("* * 0 * *").is_err());
        assert!(CronExpr::parse("* * 32 * *").is_err());
        assert!(CronExpr::parse("* * * 13 *").is_err());
        assert!(CronExpr::parse("* * * * 8").is_err());
    }

    #[test]
    fn garbage_tokens_rejected() {
        assert!(CronExpr::parse("a * * * *").is_err());
        assert!(CronExpr::parse("*/0 * * * *").is_err());
        assert!(CronExpr::parse("30-10 * * * *").is_err());
    }

    #[test]
    fn seven_is_sunday() {
        let expr = CronExpr::parse("0 0 * * 7").unwrap();
        // 2024-09-08 is a Sunday.
        assert!(expr.matches(&at(2024, 9, 8, 0, 0)));
        assert!(!expr.matches(&at(2024, 9, 9, 0, 0)));
    }

    #[test]
    fn next_after_steps_within_the_hour() {
        let expr = CronExpr::parse("*/15 * * * *").unwrap();
        let next = expr.next_after(at(2024, 1, 15, 14, 20)).unwrap();
        assert_eq!(next, at(2024, 1, 15, 14, 30));
    }

    #[test]
    fn next_after_is_strictly_after() {
        let expr = CronExpr::parse("30 * * * *").unwrap();
        let next = expr.next_after(at(2024, 1, 15, 14, 30)).unwrap();
        assert_eq!(next, at(2024, 1, 15, 15, 30));
    }

    #[test]
    fn next_after_rolls_to_next_day() {
        let expr = CronExpr::parse("0 3 * * *").unwrap();
        let next = expr.next_after(at(2024, 1, 15, 14, 30)).unwrap();
        assert_eq!(next, at(2024, 1, 16, 3, 0));
    }

    #[test]
    fn next_after_skips_to_matching_month() {
        let expr = CronExpr::parse("0 0 1 6 *").unwrap();
        let next = expr.next_after(at(2024, 7, 2, 0, 0)).unwrap();
        assert_eq!(next, at(2025, 6, 1, 0, 0));
    }

    #[test]
    fn restricted_day_fields_use_or_rule() {
        // 13th of the month OR any Friday.
        let expr = CronExpr::parse("0 0 13 * 5").unwrap();
        // 2024-09-01 is a Sunday; the first Friday (Sep 6) comes before Sep 13.
        let next = expr.next_after(at(2024, 9, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2024, 9, 6, 0, 0));
        // After Sep 6 the 13th (a Friday, but matched as dom too) is next.
        let next = expr.next_after(at(2024, 9, 6, 0, 0)).unwrap();
        assert_eq!(next, at(2024, 9, 13, 0, 0));
    }

    #[test]
    fn wildcard_day_of_week_keeps_and_rule() {
        // Only the 13th, whatever weekday it falls on.
        let expr = CronExpr::parse("0 0 13 * *").unwrap();
        let next = expr.next_after(at(2024, 9, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2024, 9, 13, 0, 0));
    }

    #[test]
    fn impossible_date_yields_none() {
        let expr = CronExpr::parse("0 0 31 2 *").unwrap();
        assert!(expr.next_after(at(2024, 1, 1, 0, 0)).is_none());
    }
}
