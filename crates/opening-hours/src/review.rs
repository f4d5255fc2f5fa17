//! Group occurrences by ISO week and day for reporting.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, IsoWeek, NaiveDate};

use crate::occurrence::Occurrence;
use crate::range::{sort_by_start, DateRange};

/// Occurrences keyed by ISO week, then by calendar day.
pub type WeeklyOccurrences = BTreeMap<IsoWeek, BTreeMap<NaiveDate, Vec<Occurrence>>>;

/// Group occurrences into weeks and days.
///
/// Days are taken in the timezone of `range`. Within a day, occurrences are
/// ordered by start. When `fill_days` is set, every day touched by `range`
/// gets an entry even if it has no occurrences; the end instant of `range`
/// is exclusive, so a range ending at midnight does not add the next day.
pub fn occurrences_by_week(range: &DateRange, occurrences: &[Occurrence], fill_days: bool) -> WeeklyOccurrences {
    let tz = range.timezone();
    let mut weeks = WeeklyOccurrences::new();

    if fill_days && !range.is_empty() {
        let first = range.start().date_naive();
        let last = (range.end() - Duration::seconds(1)).date_naive();
        for day in first.iter_days().take_while(|day| *day <= last) {
            weeks.entry(day.iso_week()).or_default().entry(day).or_default();
        }
    }

    let mut sorted = occurrences.to_vec();
    sort_by_start(&mut sorted);
    for occurrence in sorted {
        let day = occurrence.start().with_timezone(&tz).date_naive();
        weeks
            .entry(day.iso_week())
            .or_default()
            .entry(day)
            .or_default()
            .push(occurrence);
    }

    weeks
}
