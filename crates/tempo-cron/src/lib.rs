//! Five-field cron expressions for Tempo.
//!
//! This crate provides:
//! - Parsing of `minute hour day-of-month month day-of-week` expressions into
//!   per-field admissible-value bitsets
//! - Next-occurrence search strictly after a reference instant, in that
//!   instant's time zone
//! - A bounded search horizon, so unsatisfiable schedules report an error
//!   instead of searching forever
//!
//! Day-of-month and day-of-week are combined with AND by default. The
//! traditional cron rule (OR when both are restricted) is available through
//! [`DayMatching::Union`].

mod calendar;
mod engine;
mod error;
mod field;
mod options;
mod schedule;

pub use calendar::{days_in_month, is_leap_year, weekday};
pub use error::{CronError, FieldError, FieldErrorKind};
pub use field::{Field, FieldSet};
pub use options::{DEFAULT_HORIZON_YEARS, DayMatching, SearchOptions};
pub use schedule::{Occurrences, Schedule};
