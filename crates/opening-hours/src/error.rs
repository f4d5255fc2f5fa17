//! Error types for opening-hours operations.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

/// A date range could not be constructed from the given bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Provided dates must be in same timezone: start is {start}, end is {end}")]
    TimezoneMismatch { start: Tz, end: Tz },

    #[error("End date must not occur before start date: {end} is before {start}")]
    EndBeforeStart { start: DateTime<Tz>, end: DateTime<Tz> },
}

/// An inner range violates containment against an outer range.
///
/// Each variant names the bound that failed so callers and tests can tell
/// them apart without matching on message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Inner date starts before outer date: {inner_start} < {outer_start}")]
    StartsBeforeOuter {
        inner_start: DateTime<Tz>,
        outer_start: DateTime<Tz>,
    },

    #[error("Inner date starts after outer date: {inner_start} > {outer_end}")]
    StartsAfterOuter {
        inner_start: DateTime<Tz>,
        outer_end: DateTime<Tz>,
    },

    #[error("Inner date ends after outer date: {inner_end} > {outer_end}")]
    EndsAfterOuter {
        inner_end: DateTime<Tz>,
        outer_end: DateTime<Tz>,
    },

    #[error("Inner range {inner_start} - {inner_end} does not intersect outer range {outer_start} - {outer_end}")]
    NoIntersection {
        inner_start: DateTime<Tz>,
        inner_end: DateTime<Tz>,
        outer_start: DateTime<Tz>,
        outer_end: DateTime<Tz>,
    },
}

/// Which layer of the combiner produced an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Regular,
    Exception,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Regular => f.write_str("regular hours"),
            Layer::Exception => f.write_str("exception"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HoursError {
    #[error("Invalid date range: {0}")]
    Validation(#[from] ValidationError),

    #[error("Out of range: {0}")]
    Range(#[from] RangeError),

    /// A source returned an occurrence outside the requested window.
    #[error("{layer} source produced an occurrence outside the requested range: {source}")]
    SourceOutOfRange {
        layer: Layer,
        #[source]
        source: RangeError,
    },

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("Schedule parse error: {0}")]
    Schedule(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HoursError>;
