//! Search options for the next-occurrence engine.

use serde::{Deserialize, Serialize};

use crate::error::CronError;

/// Default number of years past the reference year that a search covers.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

// Validation constants
const MIN_HORIZON_YEARS: u32 = 1;
const MAX_HORIZON_YEARS: u32 = 400; // one full Gregorian cycle

/// How the day-of-month and day-of-week fields combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayMatching {
    /// A day must satisfy both fields.
    #[default]
    Intersect,
    /// When both fields are restricted, a day may satisfy either one.
    /// When either field is `*`, this behaves like [`DayMatching::Intersect`].
    Union,
}

/// Options controlling how far and how a schedule searches for occurrences.
///
/// # Examples
///
/// ```
/// use tempo_cron::{DayMatching, SearchOptions};
///
/// let options = SearchOptions::default()
///     .horizon_years(30)
///     .day_matching(DayMatching::Union);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Years past the reference instant's year before the search gives up
    /// with [`CronError::NoMatchWithinHorizon`].
    pub horizon_years: u32,

    /// Combination rule for the two day fields.
    pub day_matching: DayMatching,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
            day_matching: DayMatching::default(),
        }
    }
}

impl SearchOptions {
    pub fn horizon_years(mut self, years: u32) -> Self {
        self.horizon_years = years;
        self
    }

    pub fn day_matching(mut self, day_matching: DayMatching) -> Self {
        self.day_matching = day_matching;
        self
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns `CronError::InvalidOptions` if `horizon_years` is outside
    /// `1..=400`.
    pub fn validate(&self) -> Result<(), CronError> {
        if !(MIN_HORIZON_YEARS..=MAX_HORIZON_YEARS).contains(&self.horizon_years) {
            return Err(CronError::InvalidOptions(format!(
                "horizon must be between {MIN_HORIZON_YEARS} and {MAX_HORIZON_YEARS} years (got {})",
                self.horizon_years
            )));
        }
        Ok(())
    }
}
