//! Next-occurrence search over local wall-clock time.
//!
//! The search is a small state machine. Fields are validated from coarsest to
//! finest (month, day of month, day of week, hour, minute). A check that
//! passes hands over to the next finer one; a check that has to move the
//! candidate forward sends the machine back to the month check, because a
//! coarse correction can invalidate anything finer that was already checked.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tracing::trace;

use crate::calendar::{days_in_month, weekday};
use crate::error::CronError;
use crate::field::FieldSet;
use crate::options::DayMatching;

/// The five admissible sets of a parsed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScheduleFields {
    pub minutes: FieldSet,
    pub hours: FieldSet,
    pub days_of_month: FieldSet,
    pub months: FieldSet,
    pub days_of_week: FieldSet,
}

impl ScheduleFields {
    /// Whether the day fields combine by union under `matching`.
    ///
    /// Union only applies when both day fields are restricted; with either
    /// one unrestricted the two rules agree anyway.
    pub fn day_union(&self, matching: DayMatching) -> bool {
        matching == DayMatching::Union
            && !self.days_of_month.is_full()
            && !self.days_of_week.is_full()
    }

    /// Whether `date` satisfies the month and day rules.
    pub fn date_matches(&self, date: NaiveDate, matching: DayMatching) -> bool {
        if !self.months.contains(date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(date.day());
        let dow = self.days_of_week.contains(weekday(date));
        if self.day_union(matching) {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Whether a local wall-clock time is an occurrence.
    pub fn matches(&self, local: &NaiveDateTime, matching: DayMatching) -> bool {
        local.second() == 0
            && local.nanosecond() == 0
            && self.hours.contains(local.hour())
            && self.minutes.contains(local.minute())
            && self.date_matches(local.date(), matching)
    }
}

/// States of the search. Every correcting advance returns to `CheckMonth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    CheckMonth,
    CheckDay,
    CheckWeekday,
    CheckHour,
    CheckMinute,
    Done,
}

/// One next-occurrence search, strictly after `after`.
#[derive(Debug)]
pub(crate) struct Search<'a> {
    fields: &'a ScheduleFields,
    union: bool,
    after: NaiveDateTime,
    limit_year: i32,
    candidate: NaiveDateTime,
}

impl<'a> Search<'a> {
    /// Start a search. The first candidate is `after` rounded up to the next
    /// whole minute; no candidate past the end of `limit_year` is produced.
    pub fn new(
        fields: &'a ScheduleFields,
        matching: DayMatching,
        after: NaiveDateTime,
        limit_year: i32,
    ) -> Result<Self, CronError> {
        let mut search = Self {
            fields,
            union: fields.day_union(matching),
            after,
            limit_year,
            candidate: after,
        };
        match at(after.date(), after.hour(), after.minute())
            .and_then(|t| t.checked_add_signed(TimeDelta::minutes(1)))
        {
            Some(first) => search.candidate = first,
            None => return Err(search.exhausted()),
        }
        Ok(search)
    }

    /// Drive the state machine to completion.
    pub fn run(mut self) -> Result<NaiveDateTime, CronError> {
        let mut state = State::CheckMonth;
        loop {
            if state == State::Done {
                return Ok(self.candidate);
            }
            state = self.step(state)?;
        }
    }

    /// Perform the check for `state` and return the state to move to.
    pub fn step(&mut self, state: State) -> Result<State, CronError> {
        let next = match state {
            State::CheckMonth => self.check_month()?,
            State::CheckDay => self.check_day()?,
            State::CheckWeekday => self.check_weekday()?,
            State::CheckHour => self.check_hour()?,
            State::CheckMinute => self.check_minute()?,
            State::Done => State::Done,
        };
        trace!(?state, ?next, candidate = %self.candidate, "search step");
        Ok(next)
    }

    #[cfg(test)]
    pub fn candidate(&self) -> NaiveDateTime {
        self.candidate
    }

    fn exhausted(&self) -> CronError {
        CronError::NoMatchWithinHorizon {
            after: self.after.to_string(),
            years: (self.limit_year - self.after.year()).max(0) as u32,
        }
    }

    fn advance_to(&mut self, candidate: NaiveDateTime) -> State {
        self.candidate = candidate;
        State::CheckMonth
    }

    fn check_month(&mut self) -> Result<State, CronError> {
        let t = self.candidate;
        if t.year() > self.limit_year {
            return Err(self.exhausted());
        }
        if self.fields.months.contains(t.month()) && t > self.after {
            return Ok(State::CheckDay);
        }

        for year in t.year()..=self.limit_year {
            let first_month = if year == t.year() { t.month() } else { 1 };
            for month in first_month..=12 {
                if !self.fields.months.contains(month) {
                    continue;
                }
                let start = NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|date| at(date, 0, 0))
                    .ok_or_else(|| self.exhausted())?;
                if start > self.after {
                    return Ok(self.advance_to(start));
                }
            }
        }

        Err(self.exhausted())
    }

    fn check_day(&mut self) -> Result<State, CronError> {
        let t = self.candidate;
        let date = t.date();
        if self.admits_day(date) && t > self.after {
            return Ok(State::CheckWeekday);
        }

        let last = days_in_month(date.year(), date.month());
        for day in date.day()..=last {
            let Some(candidate_date) = date.with_day(day) else {
                continue;
            };
            if !self.admits_day(candidate_date) {
                continue;
            }
            let start = at(candidate_date, 0, 0).ok_or_else(|| self.exhausted())?;
            if start > self.after {
                return Ok(self.advance_to(start));
            }
        }

        // Nothing left this month: move to the first minute of the next one.
        let end = date
            .with_day(last)
            .and_then(|d| at(d, 23, 59))
            .and_then(|t| t.checked_add_signed(TimeDelta::minutes(1)))
            .ok_or_else(|| self.exhausted())?;
        Ok(self.advance_to(end))
    }

    fn check_weekday(&mut self) -> Result<State, CronError> {
        let t = self.candidate;
        let dow = self.fields.days_of_week.contains(weekday(t.date()));
        if self.union || (dow && t > self.after) {
            return Ok(State::CheckHour);
        }

        for offset in 1..=7 {
            let Some(day) = t.date().checked_add_days(Days::new(offset)) else {
                break;
            };
            if self.fields.days_of_week.contains(weekday(day))
                && self.fields.days_of_month.contains(day.day())
                && self.fields.months.contains(day.month())
            {
                let start = at(day, 0, 0).ok_or_else(|| self.exhausted())?;
                if start > self.after {
                    return Ok(self.advance_to(start));
                }
            }
        }

        // No day in the coming week satisfies every day constraint. The
        // weekday is unchanged a week later, so the later checks move on.
        let later = t
            .checked_add_days(Days::new(7))
            .ok_or_else(|| self.exhausted())?;
        Ok(self.advance_to(later))
    }

    fn check_hour(&mut self) -> Result<State, CronError> {
        let t = self.candidate;
        if self.fields.hours.contains(t.hour()) && t > self.after {
            return Ok(State::CheckMinute);
        }

        for hour in t.hour()..24 {
            if !self.fields.hours.contains(hour) {
                continue;
            }
            let start = at(t.date(), hour, 0).ok_or_else(|| self.exhausted())?;
            if start > self.after {
                return Ok(self.advance_to(start));
            }
        }

        let next_day = t
            .date()
            .succ_opt()
            .and_then(|d| at(d, 0, 0))
            .ok_or_else(|| self.exhausted())?;
        Ok(self.advance_to(next_day))
    }

    fn check_minute(&mut self) -> Result<State, CronError> {
        let t = self.candidate;
        if self.fields.minutes.contains(t.minute()) && t > self.after {
            return Ok(State::Done);
        }

        for minute in t.minute()..60 {
            if !self.fields.minutes.contains(minute) {
                continue;
            }
            let candidate = at(t.date(), t.hour(), minute).ok_or_else(|| self.exhausted())?;
            if candidate > self.after {
                return Ok(self.advance_to(candidate));
            }
        }

        let next_hour = at(t.date(), t.hour(), 0)
            .and_then(|t| t.checked_add_signed(TimeDelta::hours(1)))
            .ok_or_else(|| self.exhausted())?;
        Ok(self.advance_to(next_hour))
    }

    /// The day-of-month check. Under union matching the weekday counts too.
    fn admits_day(&self, date: NaiveDate) -> bool {
        let dom = self.fields.days_of_month.contains(date.day());
        if self.union {
            dom || self.fields.days_of_week.contains(weekday(date))
        } else {
            dom
        }
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    date.and_hms_opt(hour, minute, 0)
}
