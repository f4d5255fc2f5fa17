//! Combine regular hours and exceptions for an entity.
//!
//! Regular hours and exceptions come from independent sources. The combiner
//! validates what the sources return, lets exceptions void regular hours on
//! the same calendar day, and optionally flattens the result into a
//! non-overlapping timeline.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{HoursError, Layer, Result};
use crate::flatten::flatten;
use crate::occurrence::{Occurrence, RegularHourInteraction};
use crate::range::{Containment, DateRange};
use crate::source::OccurrenceSource;

type BoxedSource<E> = Box<dyn OccurrenceSource<E> + Send + Sync>;

/// Opening hours service for entities of type `E`.
///
/// Holds any number of regular-hour sources and exception sources. Their
/// output is concatenated in registration order.
pub struct OpeningHours<E: ?Sized> {
    regular: Vec<BoxedSource<E>>,
    exceptions: Vec<BoxedSource<E>>,
}

impl<E: ?Sized> OpeningHours<E> {
    /// A service with no sources; every query returns nothing.
    pub fn new() -> Self {
        Self {
            regular: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn with_regular_source<S>(mut self, source: S) -> Self
    where
        S: OccurrenceSource<E> + Send + Sync + 'static,
    {
        self.regular.push(Box::new(source));
        self
    }

    pub fn with_exception_source<S>(mut self, source: S) -> Self
    where
        S: OccurrenceSource<E> + Send + Sync + 'static,
    {
        self.exceptions.push(Box::new(source));
        self
    }

    /// Regular hours within `range`, unordered and unvoided.
    ///
    /// # Errors
    /// Returns `HoursError::SourceOutOfRange` if a source produced an
    /// occurrence not strictly within `range`, or any error a source raised.
    pub fn regular_hours(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        collect(Layer::Regular, &self.regular, entity, range)
    }

    /// Exceptions within `range`, unordered.
    ///
    /// # Errors
    /// Same as [`OpeningHours::regular_hours`].
    pub fn exceptions(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        collect(Layer::Exception, &self.exceptions, entity, range)
    }

    /// Regular hours with same-day voiding applied, followed by exceptions.
    ///
    /// Occurrences may still overlap; use [`OpeningHours::timeline`] for a
    /// flattened result.
    ///
    /// # Errors
    /// Same as [`OpeningHours::regular_hours`].
    pub fn occurrences(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        let regular = self.regular_hours(entity, range)?;
        let exceptions = self.exceptions(entity, range)?;
        Ok(void_regular_days(regular, exceptions))
    }

    /// Regular hours and exceptions without any voiding. Closures may overlap
    /// openings; callers resolve that themselves, e.g. with [`flatten`].
    ///
    /// # Errors
    /// Same as [`OpeningHours::regular_hours`].
    pub fn dimensional_occurrences(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        let mut occurrences = self.regular_hours(entity, range)?;
        occurrences.extend(self.exceptions(entity, range)?);
        Ok(occurrences)
    }

    /// [`OpeningHours::occurrences`] flattened into a chronological,
    /// non-overlapping timeline.
    ///
    /// # Errors
    /// Same as [`OpeningHours::regular_hours`].
    pub fn timeline(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        Ok(flatten(&self.occurrences(entity, range)?))
    }
}

impl<E: ?Sized> Default for OpeningHours<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for OpeningHours<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpeningHours")
            .field("regular_sources", &self.regular.len())
            .field("exception_sources", &self.exceptions.len())
            .finish()
    }
}

fn collect<E: ?Sized>(
    layer: Layer,
    sources: &[BoxedSource<E>],
    entity: &E,
    range: &DateRange,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();
    for source in sources {
        let generated = source.generate(entity, range)?;
        for occurrence in &generated {
            range
                .ensure_contains(occurrence.range(), Containment::Strict)
                .map_err(|err| HoursError::SourceOutOfRange { layer, source: err })?;
        }
        occurrences.extend(generated);
    }
    debug!(%layer, sources = sources.len(), occurrences = occurrences.len(), "collected occurrences");
    Ok(occurrences)
}

/// The calendar day an occurrence starts on, in its own timezone.
pub fn day_key(occurrence: &Occurrence) -> NaiveDate {
    occurrence.start().date_naive()
}

/// Remove regular occurrences starting on any day a voiding exception starts
/// on, then append every exception.
///
/// Voiding works per calendar day, not per instant: a multi-day exception
/// only voids the day it starts on, so exception sources should split those
/// into one occurrence per day. The voided days are taken from the exceptions
/// before anything is appended, so several exceptions on one day all
/// survive.
pub fn void_regular_days(regular: Vec<Occurrence>, exceptions: Vec<Occurrence>) -> Vec<Occurrence> {
    let voided_days: HashSet<NaiveDate> = exceptions
        .iter()
        .filter_map(|exception| match exception.interaction() {
            RegularHourInteraction::VoidsRegular => Some(day_key(exception)),
            RegularHourInteraction::CoexistsWithRegular => None,
        })
        .collect();

    let regular_count = regular.len();
    let mut combined: Vec<Occurrence> = regular
        .into_iter()
        .filter(|occurrence| !voided_days.contains(&day_key(occurrence)))
        .collect();

    debug!(
        voided_days = voided_days.len(),
        voided = regular_count - combined.len(),
        exceptions = exceptions.len(),
        "applied exceptions to regular hours"
    );

    combined.extend(exceptions);
    combined
}
