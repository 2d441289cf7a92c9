//! Cron field parsing into admissible-value bitsets.

use std::fmt;

use crate::error::FieldError;

/// One of the five positional fields of a cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl Field {
    /// All fields in expression order.
    pub const ALL: [Field; 5] = [
        Field::Minute,
        Field::Hour,
        Field::DayOfMonth,
        Field::Month,
        Field::DayOfWeek,
    ];

    /// Inclusive natural bounds of the field. Day of week counts from 0 = Sunday.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            Field::Minute => (0, 59),
            Field::Hour => (0, 23),
            Field::DayOfMonth => (1, 31),
            Field::Month => (1, 12),
            Field::DayOfWeek => (0, 6),
        }
    }

    /// Semantic name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Field::Minute => "minute",
            Field::Hour => "hour",
            Field::DayOfMonth => "day-of-month",
            Field::Month => "month",
            Field::DayOfWeek => "day-of-week",
        }
    }

    /// Parse this field's text into its admissible set.
    ///
    /// # Example
    ///
    /// ```
    /// use tempo_cron::Field;
    ///
    /// let set = Field::Minute.parse("*/20").unwrap();
    /// assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 20, 40]);
    /// ```
    pub fn parse(self, text: &str) -> Result<FieldSet, FieldError> {
        let (min, max) = self.bounds();
        FieldSet::parse(text, min, max)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Admissible values of one field, stored as a bitmask indexed by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSet {
    bits: u64,
    min: u32,
    max: u32,
}

impl FieldSet {
    /// Bounds must satisfy `min <= max < 64`.
    pub(crate) fn empty(min: u32, max: u32) -> Self {
        debug_assert!(min <= max && max < u64::BITS);
        Self { bits: 0, min, max }
    }

    /// Parse a comma-separated list of `*`, `v`, `a-b`, each with an optional
    /// `/step`, into the union of the values they admit.
    pub(crate) fn parse(text: &str, min: u32, max: u32) -> Result<Self, FieldError> {
        let mut set = Self::empty(min, max);

        for part in text.split(',') {
            let part = part.trim();

            let (range_part, step) = match part.split_once('/') {
                Some((range_part, step_text)) => (range_part, parse_step(step_text)?),
                None => (part, 1),
            };

            let (start, end) = if range_part == "*" || range_part.is_empty() {
                (min, max)
            } else if let Some((a, b)) = range_part.split_once('-') {
                let start = parse_value(a, min, max)?;
                let end = parse_value(b, min, max)?;
                if start > end {
                    return Err(FieldError::InvertedRange { start, end });
                }
                (start, end)
            } else {
                let value = parse_value(range_part, min, max)?;
                (value, value)
            };

            // Stepping is anchored at the start of the range, not at the field minimum.
            for value in (start..=end).step_by(step) {
                set.insert(value);
            }
        }

        Ok(set)
    }

    pub(crate) fn insert(&mut self, value: u32) {
        debug_assert!(value >= self.min && value <= self.max);
        self.bits |= 1 << value;
    }

    /// Whether `value` is admitted.
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max && self.bits & (1 << value) != 0
    }

    /// Whether every value in the field's bounds is admitted.
    pub fn is_full(&self) -> bool {
        (self.min..=self.max).all(|v| self.contains(v))
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of admitted values.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Admitted values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (self.min..=self.max).filter(move |v| self.contains(*v))
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

fn parse_value(text: &str, min: u32, max: u32) -> Result<u32, FieldError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| FieldError::Syntax(text.to_string()))?;
    if value < min || value > max {
        return Err(FieldError::OutOfRange { value, min, max });
    }
    Ok(value)
}

fn parse_step(text: &str) -> Result<usize, FieldError> {
    let step: i64 = text
        .trim()
        .parse()
        .map_err(|_| FieldError::Syntax(text.to_string()))?;
    if step <= 0 {
        return Err(FieldError::NonPositiveStep(step));
    }
    Ok(usize::try_from(step).unwrap_or(usize::MAX))
}
