//! Date ranges -- a start and end instant sharing one timezone.
//!
//! Comparing instants that carry different zones is legal in chrono but makes it
//! easy to mix up wall-clock values, so a [`DateRange`] insists that both bounds
//! use the same IANA zone. Ranges that need to be compared against each other
//! (containment, sorting) are compared as instants.

use std::cmp::Ordering;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::error::{RangeError, ValidationError};

/// How strictly [`DateRange::ensure_contains`] checks an inner range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Containment {
    /// The inner range must lie entirely inside the outer range.
    #[default]
    Strict,
    /// The inner range only has to intersect the outer range.
    Partial,
}

/// An inclusive start and end instant in a single timezone, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl DateRange {
    /// Create a range, validating that both bounds share a timezone and that
    /// `end` does not occur before `start`.
    ///
    /// # Errors
    /// Returns [`ValidationError::TimezoneMismatch`] if the zones differ.
    /// Returns [`ValidationError::EndBeforeStart`] if `end < start`.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, ValidationError> {
        if start.timezone() != end.timezone() {
            return Err(ValidationError::TimezoneMismatch {
                start: start.timezone(),
                end: end.timezone(),
            });
        }
        if end < start {
            return Err(ValidationError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from bounds the caller has already put in order.
    ///
    /// `end` is converted into the zone of `start`.
    pub(crate) fn from_ordered(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        debug_assert!(start <= end, "from_ordered called with end before start");
        Self {
            start,
            end: end.with_timezone(&start.timezone()),
        }
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    /// The zone shared by both bounds.
    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// A copy of this range with a new start.
    ///
    /// # Errors
    /// Same as [`DateRange::new`].
    pub fn with_start(&self, start: DateTime<Tz>) -> Result<Self, ValidationError> {
        Self::new(start, self.end)
    }

    /// A copy of this range with a new end.
    ///
    /// # Errors
    /// Same as [`DateRange::new`].
    pub fn with_end(&self, end: DateTime<Tz>) -> Result<Self, ValidationError> {
        Self::new(self.start, end)
    }

    /// The same instants expressed in another zone.
    pub fn with_timezone(&self, tz: &Tz) -> Self {
        Self {
            start: self.start.with_timezone(tz),
            end: self.end.with_timezone(tz),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check that `inner` lies within this range.
    ///
    /// In [`Containment::Strict`] mode the checks run in order: inner start
    /// before outer start, inner start after outer end, inner end after outer
    /// end. In [`Containment::Partial`] mode `inner` is accepted when
    /// `inner.end >= outer.start && inner.start < outer.end`.
    ///
    /// Identical ranges are always accepted in strict mode.
    ///
    /// # Errors
    /// Returns the [`RangeError`] variant naming the bound that failed.
    pub fn ensure_contains(&self, inner: &DateRange, mode: Containment) -> Result<(), RangeError> {
        match mode {
            Containment::Partial => {
                if inner.end < self.start || inner.start >= self.end {
                    return Err(RangeError::NoIntersection {
                        inner_start: inner.start,
                        inner_end: inner.end,
                        outer_start: self.start,
                        outer_end: self.end,
                    });
                }
            }
            Containment::Strict => {
                if inner.start < self.start {
                    return Err(RangeError::StartsBeforeOuter {
                        inner_start: inner.start,
                        outer_start: self.start,
                    });
                }
                if inner.start > self.end {
                    return Err(RangeError::StartsAfterOuter {
                        inner_start: inner.start,
                        outer_end: self.end,
                    });
                }
                // Inner end before outer start is impossible here: the first
                // check already rejected inner starts before outer start.
                if inner.end > self.end {
                    return Err(RangeError::EndsAfterOuter {
                        inner_end: inner.end,
                        outer_end: self.end,
                    });
                }
            }
        }
        Ok(())
    }

    /// Convenience wrapper over [`DateRange::ensure_contains`].
    pub fn contains(&self, inner: &DateRange, mode: Containment) -> bool {
        self.ensure_contains(inner, mode).is_ok()
    }

    /// The part of this range that lies inside `outer`, in this range's zone.
    ///
    /// # Errors
    /// Returns [`RangeError::NoIntersection`] when the ranges do not intersect.
    pub fn clamp_to(&self, outer: &DateRange) -> Result<Self, RangeError> {
        outer.ensure_contains(self, Containment::Partial)?;
        let start = self.start.max(outer.start.with_timezone(&self.timezone()));
        let end = self.end.min(outer.end.with_timezone(&self.timezone()));
        // A range touching the outer start at a single instant clamps to that
        // instant.
        Ok(Self::from_ordered(start, end.max(start)))
    }

    /// Comparator ordering ranges by start instant.
    pub fn cmp_start(a: &DateRange, b: &DateRange) -> Ordering {
        a.start.cmp(&b.start)
    }
}

impl AsRef<DateRange> for DateRange {
    fn as_ref(&self) -> &DateRange {
        self
    }
}

/// Sort anything carrying a [`DateRange`] by start instant.
///
/// The sort is stable: items with equal starts keep their relative order.
pub fn sort_by_start<T: AsRef<DateRange>>(items: &mut [T]) {
    items.sort_by(|a, b| DateRange::cmp_start(a.as_ref(), b.as_ref()));
}
