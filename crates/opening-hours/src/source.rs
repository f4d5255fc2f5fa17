//! Occurrence sources -- where regular hours and exceptions come from.
//!
//! The combiner only knows the [`OccurrenceSource`] trait. Two ready-made
//! sources are provided:
//!
//! - [`RecurringSource`] expands RFC 5545 recurrence rules with the `rrule`
//!   crate (regular hours).
//! - [`ListedSource`] hands out a fixed list of occurrences (holidays and
//!   other one-off exceptions).
//!
//! Any `Fn(&E, &DateRange) -> Result<Vec<Occurrence>>` is a source as well.

use chrono::{DateTime, Duration, NaiveDateTime};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::cache::CacheableMetadata;
use crate::error::{HoursError, Result};
use crate::occurrence::Occurrence;
use crate::range::{Containment, DateRange};

/// Produces the occurrences of an entity within a window.
///
/// Implementations must only return occurrences lying within `range`; the
/// combiner rejects anything else with a range error.
pub trait OccurrenceSource<E: ?Sized> {
    /// Generate occurrences for `entity` within `range`, in any order.
    ///
    /// # Errors
    /// Implementation specific; the provided sources fail on rules that cannot
    /// be parsed.
    fn generate(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>>;
}

impl<E, F> OccurrenceSource<E> for F
where
    E: ?Sized,
    F: Fn(&E, &DateRange) -> Result<Vec<Occurrence>>,
{
    fn generate(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        self(entity, range)
    }
}

/// Trim `occurrence` to `range`, or `None` if nothing of it is left.
///
/// An occurrence that only touches the window at one instant is dropped,
/// unless it was zero-duration to begin with.
fn clip(occurrence: &Occurrence, range: &DateRange) -> Option<Occurrence> {
    if !range.contains(occurrence.range(), Containment::Partial) {
        return None;
    }
    let trimmed = occurrence.clone().trimmed_to(range).ok()?;
    if trimmed.range().is_empty() && !occurrence.range().is_empty() {
        return None;
    }
    Some(trimmed)
}

// ---------------------------------------------------------------------------
// Recurring hours
// ---------------------------------------------------------------------------

/// A recurrence rule producing regular hours.
///
/// `dtstart` is a wall-clock time in `timezone`; every instance lasts
/// `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    rule: String,
    dtstart: NaiveDateTime,
    timezone: Tz,
    duration: Duration,
    open: bool,
    messages: Vec<String>,
    cacheability: CacheableMetadata,
}

impl Recurrence {
    /// Create an open recurrence.
    ///
    /// # Errors
    /// Returns `HoursError::InvalidRule` if the rule is empty or the duration
    /// is negative. The rule text itself is parsed on first expansion.
    pub fn new(rule: &str, dtstart: NaiveDateTime, timezone: Tz, duration: Duration) -> Result<Self> {
        if rule.trim().is_empty() {
            return Err(HoursError::InvalidRule("empty RRULE string".to_string()));
        }
        if duration < Duration::zero() {
            return Err(HoursError::InvalidRule(format!(
                "negative duration: {} minutes",
                duration.num_minutes()
            )));
        }
        Ok(Self {
            rule: rule.trim().to_string(),
            dtstart,
            timezone,
            duration,
            open: true,
            messages: Vec::new(),
            cacheability: CacheableMetadata::default(),
        })
    }

    /// Create a recurrence from string inputs.
    ///
    /// # Arguments
    /// - `rule` -- RFC 5545 RRULE string (e.g., "FREQ=WEEKLY;BYDAY=MO,TU")
    /// - `dtstart` -- Local datetime string (e.g., "2015-01-01T09:00:00")
    /// - `timezone` -- IANA timezone (e.g., "Australia/Sydney")
    /// - `duration_minutes` -- Length of every instance
    ///
    /// # Errors
    /// Returns `HoursError::InvalidDateTime` for a malformed `dtstart`,
    /// `HoursError::InvalidTimezone` for an unknown zone, and the errors of
    /// [`Recurrence::new`].
    pub fn parse(rule: &str, dtstart: &str, timezone: &str, duration_minutes: u32) -> Result<Self> {
        let dtstart = parse_local_datetime(dtstart)?;
        let timezone = parse_timezone(timezone)?;
        Self::new(rule, dtstart, timezone, Duration::minutes(i64::from(duration_minutes)))
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages = messages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cacheability(mut self, cacheability: CacheableMetadata) -> Self {
        self.cacheability = cacheability;
        self
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn rule_set(&self) -> Result<RRuleSet> {
        let rrule_text = format!(
            "DTSTART;TZID={}:{}\nRRULE:{}",
            self.timezone.name(),
            self.dtstart.format("%Y%m%dT%H%M%S"),
            self.rule
        );
        rrule_text
            .parse()
            .map_err(|e| HoursError::InvalidRule(format!("{}", e)))
    }

    /// Expand the rule into occurrences intersecting `range`, trimmed to it.
    ///
    /// At most `limit` instances are expanded; hitting the limit is logged.
    ///
    /// # Errors
    /// Returns `HoursError::InvalidRule` if the rule cannot be parsed.
    pub fn occurrences_within(&self, range: &DateRange, limit: u16) -> Result<Vec<Occurrence>> {
        // Instances starting before the window may still reach into it.
        let after = (range.start() - self.duration).with_timezone(&rrule::Tz::UTC);
        let before = range.end().with_timezone(&rrule::Tz::UTC);

        let expanded = self.rule_set()?.after(after).before(before).all(limit);
        if expanded.limited {
            warn!(
                rule = %self.rule,
                limit,
                "recurrence expansion hit its instance limit; later instances are missing"
            );
        }

        let occurrences = expanded
            .dates
            .into_iter()
            .filter_map(|dt| {
                let start: DateTime<Tz> = dt.with_timezone(&self.timezone);
                let instance = Occurrence::from(DateRange::from_ordered(start, start + self.duration))
                    .with_open(self.open)
                    .with_messages(self.messages.iter().cloned())
                    .with_cacheability(self.cacheability.clone());
                clip(&instance, range)
            })
            .collect();

        Ok(occurrences)
    }
}

/// Entities whose regular hours are described by recurrence rules.
pub trait HasRecurrences {
    fn recurrences(&self) -> &[Recurrence];
}

impl HasRecurrences for [Recurrence] {
    fn recurrences(&self) -> &[Recurrence] {
        self
    }
}

impl HasRecurrences for Vec<Recurrence> {
    fn recurrences(&self) -> &[Recurrence] {
        self
    }
}

/// Regular hours from an entity's recurrence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringSource {
    limit: u16,
}

impl RecurringSource {
    pub const DEFAULT_LIMIT: u16 = 2000;

    /// A source expanding at most `limit` instances per rule.
    pub fn with_limit(limit: u16) -> Self {
        Self { limit }
    }
}

impl Default for RecurringSource {
    fn default() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }
}

impl<E> OccurrenceSource<E> for RecurringSource
where
    E: HasRecurrences + ?Sized,
{
    fn generate(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        let mut occurrences = Vec::new();
        for recurrence in entity.recurrences() {
            occurrences.extend(recurrence.occurrences_within(range, self.limit)?);
        }
        debug!(
            rules = entity.recurrences().len(),
            occurrences = occurrences.len(),
            "expanded recurring hours"
        );
        Ok(occurrences)
    }
}

// ---------------------------------------------------------------------------
// Listed occurrences
// ---------------------------------------------------------------------------

/// Entities carrying a fixed list of occurrences (typically exceptions).
pub trait HasListedOccurrences {
    fn listed_occurrences(&self) -> &[Occurrence];
}

impl HasListedOccurrences for [Occurrence] {
    fn listed_occurrences(&self) -> &[Occurrence] {
        self
    }
}

impl HasListedOccurrences for Vec<Occurrence> {
    fn listed_occurrences(&self) -> &[Occurrence] {
        self
    }
}

/// The entity's listed occurrences intersecting the window, trimmed to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListedSource;

impl<E> OccurrenceSource<E> for ListedSource
where
    E: HasListedOccurrences + ?Sized,
{
    fn generate(&self, entity: &E, range: &DateRange) -> Result<Vec<Occurrence>> {
        Ok(entity
            .listed_occurrences()
            .iter()
            .filter_map(|o| clip(o, range))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns `HoursError::InvalidTimezone` if the name is unknown.
pub fn parse_timezone(timezone: &str) -> Result<Tz> {
    timezone
        .parse()
        .map_err(|_| HoursError::InvalidTimezone(timezone.to_string()))
}

/// Parse a local datetime string such as "2015-01-01T09:00:00" (seconds
/// optional).
///
/// # Errors
/// Returns `HoursError::InvalidDateTime` if the string does not match.
pub fn parse_local_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|e| HoursError::InvalidDateTime(format!("'{}': {}", value, e)))
}

/// Interpret a local datetime in `timezone`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// do not exist (DST spring-forward gap) are an error.
///
/// # Errors
/// Returns `HoursError::InvalidDateTime` for non-existent local times.
pub fn localize(local: NaiveDateTime, timezone: Tz) -> Result<DateTime<Tz>> {
    use chrono::TimeZone;

    timezone
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| {
            HoursError::InvalidDateTime(format!("{} does not exist in {}", local, timezone.name()))
        })
}
