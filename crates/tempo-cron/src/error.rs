//! Error types for cron parsing and next-occurrence search.

use thiserror::Error;

use crate::field::Field;

/// Errors that can occur while parsing a schedule or searching for its next
/// occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// The expression does not have exactly five whitespace-separated fields.
    #[error("invalid cron expression: expected 5 fields, found {found}")]
    FieldCount { found: usize },

    /// One of the five fields failed to parse.
    #[error("{}: {source}", .field.name())]
    Field {
        field: Field,
        #[source]
        source: FieldError,
    },

    /// No instant matching every field exists within the search horizon.
    #[error("no matching instant within {years} years after {after}")]
    NoMatchWithinHorizon { after: String, years: u32 },

    /// Search options failed validation.
    #[error("invalid search options: {0}")]
    InvalidOptions(String),
}

impl CronError {
    /// The field that failed to parse, if this is a field error.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::Field { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Why a single cron field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A value, range bound or step is not an integer.
    #[error("invalid number: {0:?}")]
    Syntax(String),

    /// A value falls outside the field's natural bounds.
    #[error("value {value} out of range {min}-{max}")]
    OutOfRange { value: u32, min: u32, max: u32 },

    /// A range whose start exceeds its end.
    #[error("invalid range: {start}-{end}")]
    InvertedRange { start: u32, end: u32 },

    /// A step of zero or less.
    #[error("invalid step value: {0}")]
    NonPositiveStep(i64),
}

/// Coarse classification of a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The text is not a number where one is required.
    Syntax,
    /// The number is well-formed but not allowed here.
    Bounds,
}

impl FieldError {
    pub fn kind(&self) -> FieldErrorKind {
        match self {
            Self::Syntax(_) => FieldErrorKind::Syntax,
            Self::OutOfRange { .. } | Self::InvertedRange { .. } | Self::NonPositiveStep(_) => {
                FieldErrorKind::Bounds
            }
        }
    }
}
