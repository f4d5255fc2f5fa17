//! # opening-hours
//!
//! Compute when a location is open or closed within a date range.
//!
//! Regular hours (usually recurring) and exceptions (holidays, special
//! closures or openings) come from independent sources. The engine validates
//! them against the requested window, lets exceptions void regular hours on
//! the same day, and flattens overlapping openings and closures into a single
//! chronological, non-overlapping timeline in which closures win.
//!
//! ## Modules
//!
//! - [`range`]: `DateRange` value type, containment checks, stable sorting
//! - [`occurrence`]: `Occurrence`: a range tagged open/closed with messages
//! - [`cache`]: Cacheability metadata merged through every transformation
//! - [`source`]: `OccurrenceSource` trait, RRULE and listed sources
//! - [`combiner`]: `OpeningHours` service: regular hours + exceptions
//! - [`flatten`]: Sweep-line flattening of overlapping occurrences
//! - [`review`]: Group occurrences by week and day for reports
//! - [`schedule`]: JSON schedules and occurrence records
//! - [`error`]: Error types

pub mod cache;
pub mod combiner;
pub mod error;
pub mod flatten;
pub mod occurrence;
pub mod range;
pub mod review;
pub mod schedule;
pub mod source;

pub use cache::{CacheableMetadata, MaxAge};
pub use combiner::{void_regular_days, OpeningHours};
pub use error::{HoursError, Layer, RangeError, ValidationError};
pub use flatten::flatten;
pub use occurrence::{Occurrence, RegularHourInteraction};
pub use range::{sort_by_start, Containment, DateRange};
pub use review::occurrences_by_week;
pub use schedule::{Location, Schedule};
pub use source::{ListedSource, OccurrenceSource, Recurrence, RecurringSource};
