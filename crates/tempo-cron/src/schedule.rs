//! Parsed cron schedules.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::{ScheduleFields, Search};
use crate::error::CronError;
use crate::field::{Field, FieldSet};
use crate::options::SearchOptions;

/// A parsed five-field cron expression.
///
/// Fields are `minute hour day-of-month month day-of-week`. A schedule is
/// immutable once parsed and can be shared freely between threads.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tempo_cron::Schedule;
///
/// let schedule: Schedule = "*/15 9-17 * * 1-5".parse().unwrap();
/// let after = Utc.with_ymd_and_hms(2025, 8, 15, 12, 1, 0).unwrap();
/// let next = schedule.next_after(&after).unwrap();
/// assert_eq!(next, Utc.with_ymd_and_hms(2025, 8, 15, 12, 15, 0).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schedule {
    source: String,
    fields: ScheduleFields,
    options: SearchOptions,
}

impl Schedule {
    /// Parse a cron expression with default search options.
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronError::FieldCount { found: parts.len() });
        }

        let parse = |field: Field, text: &str| {
            field
                .parse(text)
                .map_err(|source| CronError::Field { field, source })
        };

        // Struct fields are evaluated in order, so the first failing field wins.
        let fields = ScheduleFields {
            minutes: parse(Field::Minute, parts[0])?,
            hours: parse(Field::Hour, parts[1])?,
            days_of_month: parse(Field::DayOfMonth, parts[2])?,
            months: parse(Field::Month, parts[3])?,
            days_of_week: parse(Field::DayOfWeek, parts[4])?,
        };

        debug!(expr, "parsed cron schedule");
        Ok(Self {
            source: expr.to_string(),
            fields,
            options: SearchOptions::default(),
        })
    }

    /// Replace the search options.
    pub fn with_options(mut self, options: SearchOptions) -> Result<Self, CronError> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    /// The expression this schedule was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn minutes(&self) -> &FieldSet {
        &self.fields.minutes
    }

    pub fn hours(&self) -> &FieldSet {
        &self.fields.hours
    }

    pub fn days_of_month(&self) -> &FieldSet {
        &self.fields.days_of_month
    }

    pub fn months(&self) -> &FieldSet {
        &self.fields.months
    }

    pub fn days_of_week(&self) -> &FieldSet {
        &self.fields.days_of_week
    }

    /// The next occurrence strictly after `after`, in `after`'s time zone.
    ///
    /// The result is always on a whole minute. Local wall-clock times that
    /// do not exist (a DST gap) are skipped; in a repeated hour the earliest
    /// mapping after `after` is returned.
    ///
    /// # Errors
    ///
    /// Returns `CronError::NoMatchWithinHorizon` if nothing matches within
    /// `horizon_years` of `after`'s year, as for `0 0 31 2 *`.
    #[tracing::instrument(level = "trace", skip(self), fields(expr = %self.source))]
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Result<DateTime<Tz>, CronError> {
        let tz = after.timezone();
        let mut local_after = after.naive_local();
        let limit_year = local_after
            .year()
            .saturating_add(self.options.horizon_years as i32);

        loop {
            let candidate =
                Search::new(&self.fields, self.options.day_matching, local_after, limit_year)?
                    .run()
                    .inspect_err(|e| debug!(expr = %self.source, error = %e, "search gave up"))?;

            match tz.from_local_datetime(&candidate) {
                LocalResult::Single(dt) if dt > *after => return Ok(dt),
                LocalResult::Ambiguous(earliest, latest) => {
                    if earliest > *after {
                        return Ok(earliest);
                    }
                    if latest > *after {
                        return Ok(latest);
                    }
                }
                LocalResult::None => trace!(%candidate, "skipping nonexistent local time"),
                LocalResult::Single(_) => {}
            }

            local_after = candidate;
        }
    }

    /// Whether `instant` is an occurrence of this schedule.
    pub fn includes<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        self.fields
            .matches(&instant.naive_local(), self.options.day_matching)
    }

    /// Iterate over occurrences strictly after `start`.
    ///
    /// The iterator ends early if a search exhausts the horizon.
    pub fn after<Tz: TimeZone>(&self, start: &DateTime<Tz>) -> Occurrences<'_, Tz> {
        Occurrences {
            schedule: self,
            cursor: Some(start.clone()),
        }
    }
}

impl FromStr for Schedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Schedule {
    type Error = CronError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Schedule {
    type Error = CronError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> String {
        schedule.source
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Successive occurrences of a [`Schedule`], see [`Schedule::after`].
pub struct Occurrences<'a, Tz: TimeZone> {
    schedule: &'a Schedule,
    cursor: Option<DateTime<Tz>>,
}

impl<Tz: TimeZone> Iterator for Occurrences<'_, Tz> {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.take()?;
        match self.schedule.next_after(&current) {
            Ok(next) => {
                self.cursor = Some(next.clone());
                Some(next)
            }
            Err(e) => {
                debug!(expr = %self.schedule.source, error = %e, "occurrences exhausted");
                None
            }
        }
    }
}

impl<Tz: TimeZone> FusedIterator for Occurrences<'_, Tz> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldError, FieldErrorKind};
    use crate::options::DayMatching;
    use chrono::{Duration, Timelike, Utc};
    use proptest::prelude::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // === Unit Tests ===

    #[test]
    fn test_parse_keeps_source() {
        let schedule = Schedule::parse("0 12 * * 1-5").unwrap();
        assert_eq!(schedule.source(), "0 12 * * 1-5");
        assert_eq!(schedule.to_string(), "0 12 * * 1-5");
        assert_eq!(String::from(schedule), "0 12 * * 1-5");
    }

    #[test]
    fn test_parse_field_sets() {
        let schedule = Schedule::parse("*/30 9 1,15 * 0").unwrap();
        assert_eq!(schedule.minutes().iter().collect::<Vec<_>>(), vec![0, 30]);
        assert_eq!(schedule.hours().iter().collect::<Vec<_>>(), vec![9]);
        assert_eq!(schedule.days_of_month().iter().collect::<Vec<_>>(), vec![1, 15]);
        assert!(schedule.months().is_full());
        assert_eq!(schedule.days_of_week().iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        assert!(Schedule::parse("  0   0\t1 1 *  ").is_ok());
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            Schedule::parse("* * * *").unwrap_err(),
            CronError::FieldCount { found: 4 }
        );
        assert_eq!(
            Schedule::parse("0 * * * * *").unwrap_err(),
            CronError::FieldCount { found: 6 }
        );
        assert_eq!(
            Schedule::parse("").unwrap_err(),
            CronError::FieldCount { found: 0 }
        );
    }

    #[test]
    fn test_field_count_checked_before_fields() {
        assert!(matches!(
            Schedule::parse("x y z").unwrap_err(),
            CronError::FieldCount { found: 3 }
        ));
    }

    #[test]
    fn test_month_out_of_range_names_month() {
        let err = Schedule::parse("0 0 1 13 *").unwrap_err();
        assert_eq!(err.field(), Some(Field::Month));
        assert!(err.to_string().starts_with("month:"));
        match err {
            CronError::Field { source, .. } => assert_eq!(source.kind(), FieldErrorKind::Bounds),
            other => panic!("Expected field error, got {other:?}"),
        }
    }

    #[test]
    fn test_first_failing_field_reported() {
        let err = Schedule::parse("0 24 0 13 7").unwrap_err();
        assert_eq!(err.field(), Some(Field::Hour));
    }

    #[test]
    fn test_day_of_week_syntax_error() {
        let err = Schedule::parse("0 0 * * MON").unwrap_err();
        assert_eq!(
            err,
            CronError::Field {
                field: Field::DayOfWeek,
                source: FieldError::Syntax("MON".to_string()),
            }
        );
    }

    #[test]
    fn test_with_options_validates() {
        let schedule = Schedule::parse("* * * * *").unwrap();
        assert!(matches!(
            schedule.clone().with_options(SearchOptions::default().horizon_years(0)),
            Err(CronError::InvalidOptions(_))
        ));
        let schedule = schedule
            .with_options(SearchOptions::default().day_matching(DayMatching::Union))
            .unwrap();
        assert_eq!(schedule.options().day_matching, DayMatching::Union);
    }

    #[test]
    fn test_next_every_five_minutes() {
        let schedule = Schedule::parse("*/5 * * * *").unwrap();
        assert_eq!(
            schedule.next_after(&utc(2025, 8, 15, 12, 7)).unwrap(),
            utc(2025, 8, 15, 12, 10)
        );
    }

    #[test]
    fn test_next_truncates_seconds() {
        let schedule = Schedule::parse("* * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2025, 8, 15, 12, 7, 42).unwrap() + Duration::milliseconds(5);
        let next = schedule.next_after(&after).unwrap();
        assert_eq!(next, utc(2025, 8, 15, 12, 8));
        assert_eq!(next.second(), 0);
        assert_eq!(next.nanosecond(), 0);
    }

    #[test]
    fn test_next_on_exact_match_moves_forward() {
        let schedule = Schedule::parse("0 * * * *").unwrap();
        assert_eq!(
            schedule.next_after(&utc(2025, 8, 15, 12, 0)).unwrap(),
            utc(2025, 8, 15, 13, 0)
        );
    }

    #[test]
    fn test_unsatisfiable_schedule_errors() {
        let schedule = Schedule::parse("0 0 31 2 *").unwrap();
        let err = schedule.next_after(&utc(2025, 8, 15, 12, 0)).unwrap_err();
        assert!(matches!(err, CronError::NoMatchWithinHorizon { years: 5, .. }));
    }

    #[test]
    fn test_horizon_limits_rare_schedules() {
        // Feb 29 on a Monday: 2044 is the next one after 2025.
        let schedule = Schedule::parse("0 0 29 2 1").unwrap();
        let after = utc(2025, 1, 1, 0, 0);
        assert!(schedule.next_after(&after).is_err());

        let schedule = schedule
            .with_options(SearchOptions::default().horizon_years(30))
            .unwrap();
        assert_eq!(schedule.next_after(&after).unwrap(), utc(2044, 2, 29, 0, 0));
    }

    #[test]
    fn test_includes() {
        let schedule = Schedule::parse("30 9 * * 1-5").unwrap();
        assert!(schedule.includes(&utc(2025, 8, 15, 9, 30))); // Friday
        assert!(!schedule.includes(&utc(2025, 8, 16, 9, 30))); // Saturday
        assert!(!schedule.includes(&utc(2025, 8, 15, 9, 31)));
    }

    #[test]
    fn test_includes_union_matching() {
        let schedule = Schedule::parse("0 0 1 * 1")
            .unwrap()
            .with_options(SearchOptions::default().day_matching(DayMatching::Union))
            .unwrap();
        assert!(schedule.includes(&utc(2025, 8, 18, 0, 0))); // Monday the 18th
        assert!(schedule.includes(&utc(2025, 8, 1, 0, 0))); // Friday the 1st
        assert!(!schedule.includes(&utc(2025, 8, 19, 0, 0)));
    }

    #[test]
    fn test_after_iterates_in_order() {
        let schedule = Schedule::parse("0 0,12 * * *").unwrap();
        let times: Vec<_> = schedule.after(&utc(2025, 8, 15, 6, 0)).take(3).collect();
        assert_eq!(
            times,
            vec![
                utc(2025, 8, 15, 12, 0),
                utc(2025, 8, 16, 0, 0),
                utc(2025, 8, 16, 12, 0),
            ]
        );
    }

    #[test]
    fn test_after_ends_at_horizon() {
        let schedule = Schedule::parse("0 0 31 2 *").unwrap();
        let mut occurrences = schedule.after(&utc(2025, 1, 1, 0, 0));
        assert!(occurrences.next().is_none());
        assert!(occurrences.next().is_none());
    }

    #[test]
    fn test_schedule_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schedule>();
    }

    // === Property-Based Tests ===

    proptest! {
        // Every occurrence lies strictly after the reference and on a whole minute
        #[test]
        fn next_is_strictly_after(minute in 0u32..60, step in 1u32..20, offset in 0i64..10_000_000) {
            let schedule = Schedule::parse(&format!("{minute}/{step} * * * *")).unwrap();
            let after = utc(2024, 1, 1, 0, 0) + Duration::seconds(offset);
            let next = schedule.next_after(&after).unwrap();
            prop_assert!(next > after);
            prop_assert_eq!(next.second(), 0);
            prop_assert!(schedule.includes(&next));
        }
    }
}
