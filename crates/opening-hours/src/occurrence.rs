//! Occurrences -- a date range tagged open or closed.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cache::CacheableMetadata;
use crate::error::{RangeError, ValidationError};
use crate::range::DateRange;

/// Whether an exception suppresses regular hours on its day.
///
/// Only meaningful on occurrences produced by exception sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularHourInteraction {
    /// Regular occurrences starting on the same day are removed.
    #[default]
    VoidsRegular,
    /// Regular occurrences stay; overlap is left to the flattener.
    CoexistsWithRegular,
}

/// A period in which an entity is open or closed.
///
/// Occurrences are built by sources with the `with_*` builder methods, or
/// adjusted in place with the `set_*`/`add_*` methods while a single owner
/// holds them. Once returned from a combiner they are treated as read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    range: DateRange,
    open: bool,
    messages: Vec<String>,
    cacheability: CacheableMetadata,
    interaction: RegularHourInteraction,
}

impl Occurrence {
    /// A closed occurrence with no messages.
    ///
    /// # Errors
    /// Same as [`DateRange::new`].
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, ValidationError> {
        DateRange::new(start, end).map(Self::from)
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.range.start()
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.range.end()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn cacheability(&self) -> &CacheableMetadata {
        &self.cacheability
    }

    pub fn interaction(&self) -> RegularHourInteraction {
        self.interaction
    }

    pub fn voids_regular(&self) -> bool {
        self.interaction == RegularHourInteraction::VoidsRegular
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
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

    pub fn with_interaction(mut self, interaction: RegularHourInteraction) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn set_open(&mut self, open: bool) -> &mut Self {
        self.open = open;
        self
    }

    pub fn add_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.push(message.into());
        self
    }

    pub fn set_messages(&mut self, messages: Vec<String>) -> &mut Self {
        self.messages = messages;
        self
    }

    pub fn cacheability_mut(&mut self) -> &mut CacheableMetadata {
        &mut self.cacheability
    }

    /// Merge another bag into this occurrence's cacheability.
    pub fn add_cacheable_dependency(&mut self, other: &CacheableMetadata) -> &mut Self {
        self.cacheability.merge_from(other);
        self
    }

    /// Clamp this occurrence to `range`, keeping its zone, messages and
    /// cacheability.
    ///
    /// # Errors
    /// Returns [`RangeError::NoIntersection`] when the occurrence lies
    /// entirely outside `range`.
    pub fn trim_within(&mut self, range: &DateRange) -> Result<&mut Self, RangeError> {
        self.range = self.range.clamp_to(range)?;
        Ok(self)
    }

    /// Consuming form of [`Occurrence::trim_within`].
    ///
    /// # Errors
    /// Same as [`Occurrence::trim_within`].
    pub fn trimmed_to(mut self, range: &DateRange) -> Result<Self, RangeError> {
        self.trim_within(range)?;
        Ok(self)
    }
}

impl From<DateRange> for Occurrence {
    fn from(range: DateRange) -> Self {
        Self {
            range,
            open: false,
            messages: Vec::new(),
            cacheability: CacheableMetadata::default(),
            interaction: RegularHourInteraction::default(),
        }
    }
}

impl AsRef<DateRange> for Occurrence {
    fn as_ref(&self) -> &DateRange {
        &self.range
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {} [{}]",
            if self.open { "OPEN" } else { "CLOSED" },
            self.start().to_rfc3339(),
            self.end().to_rfc3339(),
            self.messages.join("|"),
        )
    }
}
