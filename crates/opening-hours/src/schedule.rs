//! JSON schedules and occurrence records.
//!
//! A schedule describes one or more locations, each with recurring regular
//! hours and a list of exceptions:
//!
//! ```json
//! {
//!   "locations": [{
//!     "name": "Main Library",
//!     "timezone": "Australia/Sydney",
//!     "regular": [{
//!       "rrule": "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR",
//!       "dtstart": "2015-01-05T09:00:00",
//!       "duration_minutes": 480,
//!       "messages": ["Weekday hours"]
//!     }],
//!     "exceptions": [{
//!       "start": "2015-12-25T00:00:00",
//!       "end": "2015-12-26T00:00:00",
//!       "messages": ["Christmas Day"]
//!     }]
//!   }]
//! }
//! ```
//!
//! Exception times are local to the location's timezone. Exceptions are
//! closures that void regular hours unless `open` or `void_regular` say
//! otherwise.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cache::CacheableMetadata;
use crate::combiner::OpeningHours;
use crate::error::{HoursError, Result};
use crate::occurrence::{Occurrence, RegularHourInteraction};
use crate::source::{
    localize, parse_local_datetime, parse_timezone, HasListedOccurrences, HasRecurrences, ListedSource,
    Recurrence, RecurringSource,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub locations: Vec<LocationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    pub timezone: String,
    #[serde(default)]
    pub regular: Vec<RecurrenceSpec>,
    #[serde(default)]
    pub exceptions: Vec<ExceptionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub rrule: String,
    pub dtstart: String,
    pub duration_minutes: u32,
    #[serde(default = "default_true")]
    pub open: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionSpec {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default = "default_true")]
    pub void_regular: bool,
}

/// A location with validated regular hours and exceptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    name: String,
    timezone: Tz,
    recurrences: Vec<Recurrence>,
    exceptions: Vec<Occurrence>,
}

impl Location {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Cache tag identifying this location in derived output.
    pub fn cache_tag(&self) -> String {
        format!("location:{}", self.name)
    }

    /// Opening hours service reading this location's rules and exceptions.
    pub fn opening_hours() -> OpeningHours<Location> {
        OpeningHours::new()
            .with_regular_source(RecurringSource::default())
            .with_exception_source(ListedSource)
    }

    /// Validate a location spec.
    ///
    /// # Errors
    /// Returns the first timezone, datetime, rule or range error found.
    pub fn from_spec(spec: &LocationSpec) -> Result<Self> {
        let timezone = parse_timezone(&spec.timezone)?;
        let mut cacheability = CacheableMetadata::new();
        cacheability.add_tags([format!("location:{}", spec.name)]);

        let recurrences = spec
            .regular
            .iter()
            .map(|r| {
                Recurrence::parse(&r.rrule, &r.dtstart, &spec.timezone, r.duration_minutes).map(|rec| {
                    rec.with_open(r.open)
                        .with_messages(r.messages.iter().cloned())
                        .with_cacheability(cacheability.clone())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let exceptions = spec
            .exceptions
            .iter()
            .map(|e| {
                let start = localize(parse_local_datetime(&e.start)?, timezone)?;
                let end = localize(parse_local_datetime(&e.end)?, timezone)?;
                let interaction = if e.void_regular {
                    RegularHourInteraction::VoidsRegular
                } else {
                    RegularHourInteraction::CoexistsWithRegular
                };
                Ok(Occurrence::new(start, end)?
                    .with_open(e.open)
                    .with_messages(e.messages.iter().cloned())
                    .with_interaction(interaction)
                    .with_cacheability(cacheability.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: spec.name.clone(),
            timezone,
            recurrences,
            exceptions,
        })
    }
}

impl HasRecurrences for Location {
    fn recurrences(&self) -> &[Recurrence] {
        &self.recurrences
    }
}

impl HasListedOccurrences for Location {
    fn listed_occurrences(&self) -> &[Occurrence] {
        &self.exceptions
    }
}

/// A set of locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    locations: Vec<Location>,
}

impl Schedule {
    /// Parse and validate a JSON schedule.
    ///
    /// # Errors
    /// Returns `HoursError::Schedule` for malformed JSON, otherwise the
    /// errors of [`Location::from_spec`].
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: ScheduleSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }

    /// Validate a schedule spec.
    ///
    /// # Errors
    /// Same as [`Location::from_spec`].
    pub fn from_spec(spec: &ScheduleSpec) -> Result<Self> {
        let locations = spec
            .locations
            .iter()
            .map(Location::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { locations })
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }
}

// ---------------------------------------------------------------------------
// Occurrence records
// ---------------------------------------------------------------------------

/// Serde-friendly form of an [`Occurrence`].
///
/// `start` and `end` are RFC 3339 strings; `timezone` names the zone the
/// occurrence is expressed in (UTC when omitted). `cacheability` is omitted
/// from the JSON when it is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default = "default_true")]
    pub void_regular: bool,
    #[serde(default, skip_serializing_if = "CacheableMetadata::is_empty")]
    pub cacheability: CacheableMetadata,
}

fn parse_instant(value: &str, tz: Tz) -> Result<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|e| HoursError::InvalidDateTime(format!("'{}': {}", value, e)))
}

impl TryFrom<&OccurrenceRecord> for Occurrence {
    type Error = HoursError;

    fn try_from(record: &OccurrenceRecord) -> Result<Self> {
        let tz = match &record.timezone {
            Some(name) => parse_timezone(name)?,
            None => chrono_tz::UTC,
        };
        let interaction = if record.void_regular {
            RegularHourInteraction::VoidsRegular
        } else {
            RegularHourInteraction::CoexistsWithRegular
        };
        Ok(Occurrence::new(parse_instant(&record.start, tz)?, parse_instant(&record.end, tz)?)?
            .with_open(record.open)
            .with_messages(record.messages.iter().cloned())
            .with_interaction(interaction)
            .with_cacheability(record.cacheability.clone()))
    }
}

impl From<&Occurrence> for OccurrenceRecord {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            start: occurrence.start().to_rfc3339(),
            end: occurrence.end().to_rfc3339(),
            timezone: Some(occurrence.range().timezone().name().to_string()),
            open: occurrence.is_open(),
            messages: occurrence.messages().to_vec(),
            void_regular: occurrence.voids_regular(),
            cacheability: occurrence.cacheability().clone(),
        }
    }
}

/// Parse a JSON array of occurrence records.
///
/// # Errors
/// Returns `HoursError::Schedule` for malformed JSON and the conversion
/// errors of each record.
pub fn occurrences_from_json(json: &str) -> Result<Vec<Occurrence>> {
    let records: Vec<OccurrenceRecord> = serde_json::from_str(json)?;
    records.iter().map(Occurrence::try_from).collect()
}

/// Serialize occurrences as a pretty JSON array of records.
///
/// # Errors
/// Returns `HoursError::Schedule` if serialization fails.
pub fn occurrences_to_json(occurrences: &[Occurrence]) -> Result<String> {
    let records: Vec<OccurrenceRecord> = occurrences.iter().map(OccurrenceRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Total length of the open occurrences, in minutes.
pub fn open_minutes(occurrences: &[Occurrence]) -> i64 {
    occurrences
        .iter()
        .filter(|o| o.is_open())
        .map(|o| o.range().duration())
        .fold(Duration::zero(), |acc, d| acc + d)
        .num_minutes()
}
