//! WASM bindings for opening-hours.
//!
//! Exposes flattening, combining a location's hours and trimming to
//! JavaScript via `wasm-bindgen`. All complex types are passed as JSON
//! strings: occurrences use the record format of
//! [`opening_hours::schedule::OccurrenceRecord`], locations the format of
//! [`opening_hours::schedule::LocationSpec`].
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p opening-hours-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/opening-hours-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/opening_hours_wasm.wasm
//! ```

use chrono::DateTime;
use chrono_tz::Tz;
use opening_hours::schedule::{occurrences_from_json, occurrences_to_json, LocationSpec, OccurrenceRecord};
use opening_hours::source::{localize, parse_local_datetime, parse_timezone};
use opening_hours::{flatten, DateRange, HoursError, Location, Occurrence};
use wasm_bindgen::prelude::*;

type Result<T> = std::result::Result<T, HoursError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a datetime into `tz`.
///
/// Accepts RFC 3339 (with offset, e.g. "2015-12-21T00:00:00+11:00") and naive
/// local time (e.g. "2015-12-21T00:00:00"), which is read as wall-clock time
/// in `tz`.
fn parse_datetime(s: &str, tz: Tz) -> Result<DateTime<Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&tz));
    }
    localize(parse_local_datetime(s)?, tz)
}

fn window(start: &str, end: &str, tz: Tz) -> Result<DateRange> {
    Ok(DateRange::new(parse_datetime(start, tz)?, parse_datetime(end, tz)?)?)
}

fn to_js(err: HoursError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn flatten_json(occurrences_json: &str) -> Result<String> {
    let occurrences = occurrences_from_json(occurrences_json)?;
    occurrences_to_json(&flatten(&occurrences))
}

fn combine_json(location_json: &str, window_start: &str, window_end: &str, as_timeline: bool) -> Result<String> {
    let spec: LocationSpec = serde_json::from_str(location_json)?;
    let location = Location::from_spec(&spec)?;
    let range = window(window_start, window_end, location.timezone())?;

    let hours = Location::opening_hours();
    let occurrences = if as_timeline {
        hours.timeline(&location, &range)?
    } else {
        hours.occurrences(&location, &range)?
    };
    occurrences_to_json(&occurrences)
}

fn trim_json(occurrence_json: &str, window_start: &str, window_end: &str, timezone: &str) -> Result<String> {
    let record: OccurrenceRecord = serde_json::from_str(occurrence_json)?;
    let occurrence = Occurrence::try_from(&record)?;
    let range = window(window_start, window_end, parse_timezone(timezone)?)?;
    let trimmed = occurrence.trimmed_to(&range)?;
    Ok(serde_json::to_string(&OccurrenceRecord::from(&trimmed))?)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Flatten a JSON array of occurrences into a chronological, non-overlapping
/// timeline in which closures win.
///
/// Returns a JSON array of occurrence records.
#[wasm_bindgen(js_name = "flattenOccurrences")]
pub fn flatten_occurrences(occurrences_json: &str) -> std::result::Result<String, JsValue> {
    flatten_json(occurrences_json).map_err(to_js)
}

/// Compute the occurrences of a single location within a window.
///
/// # Arguments
/// - `location_json` -- one location: name, timezone, regular rules, exceptions
/// - `window_start` / `window_end` -- RFC 3339, or local time in the location's zone
/// - `as_timeline` -- flatten the result instead of returning voided occurrences
#[wasm_bindgen(js_name = "combineOccurrences")]
pub fn combine_occurrences(
    location_json: &str,
    window_start: &str,
    window_end: &str,
    as_timeline: bool,
) -> std::result::Result<String, JsValue> {
    combine_json(location_json, window_start, window_end, as_timeline).map_err(to_js)
}

/// Clamp one occurrence record to a window given in `timezone`.
#[wasm_bindgen(js_name = "trimOccurrence")]
pub fn trim_occurrence(
    occurrence_json: &str,
    window_start: &str,
    window_end: &str,
    timezone: &str,
) -> std::result::Result<String, JsValue> {
    trim_json(occurrence_json, window_start, window_end, timezone).map_err(to_js)
}
