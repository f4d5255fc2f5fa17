//! Flatten overlapping openings and closures into a non-overlapping timeline.
//!
//! Every occurrence is turned into a start and an end marker. The markers are
//! swept in time order:
//!
//! 1. Overlapping (or touching) occurrences of the same type are merged, their
//!    messages concatenated in encounter order.
//! 2. Opening markers that fall inside a closure are dropped -- closures win.
//! 3. The surviving markers are paired back up into occurrences.
//!
//! For example, `OPEN 09:00-17:00 [abc]` and `CLOSED 13:00-13:30 [xyz]`
//! flatten to `OPEN 09:00-13:00 [abc]`, `CLOSED 13:00-13:30 [xyz]`,
//! `OPEN 13:30-17:00 [abc]`.
//!
//! Gaps in the input stay gaps in the output; nothing is filled in as closed.

use std::cmp::Ordering;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::trace;

use crate::cache::CacheableMetadata;
use crate::occurrence::Occurrence;
use crate::range::{sort_by_start, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Messages, cacheability and zone travelling with a marker.
#[derive(Debug, Clone)]
struct Payload {
    messages: Vec<String>,
    cacheability: CacheableMetadata,
    /// Zone of the occurrence that opened the run; absorbed payloads keep it.
    zone: Tz,
}

impl Payload {
    fn of(occurrence: &Occurrence) -> Self {
        Self {
            messages: occurrence.messages().to_vec(),
            cacheability: occurrence.cacheability().clone(),
            zone: occurrence.range().timezone(),
        }
    }

    fn absorb(&mut self, other: &Payload) {
        self.messages.extend(other.messages.iter().cloned());
        self.cacheability.merge_from(&other.cacheability);
    }
}

/// A boundary of an occurrence.
#[derive(Debug, Clone)]
struct Marker {
    open: bool,
    at: DateTime<Tz>,
    edge: Edge,
    payload: Payload,
    /// On a closure end: the opening that is still running when the closure
    /// ends, and so becomes visible again from here.
    resumes: Option<Payload>,
}

impl Marker {
    fn new(occurrence: &Occurrence, edge: Edge) -> Self {
        let at = match edge {
            Edge::Start => occurrence.start(),
            Edge::End => occurrence.end(),
        };
        Self {
            open: occurrence.is_open(),
            at,
            edge,
            payload: Payload::of(occurrence),
            resumes: None,
        }
    }

    /// Order of markers sharing an instant. Closures enclose openings, and
    /// starts come before ends so touching spans of one type join up.
    fn rank(&self) -> u8 {
        match (self.open, self.edge) {
            (false, Edge::Start) => 0,
            (true, Edge::Start) => 1,
            (true, Edge::End) => 2,
            (false, Edge::End) => 3,
        }
    }
}

/// Instant first, then [`Marker::rank`]. Markers equal under both keep the
/// order in which they were emitted (the sort is stable).
fn compare_markers(a: &Marker, b: &Marker) -> Ordering {
    a.at.cmp(&b.at).then_with(|| a.rank().cmp(&b.rank()))
}

/// Flatten occurrences so that none overlap.
///
/// - Closures take precedence over openings at every instant they cover.
/// - Overlapping or touching occurrences of the same type merge into one, with
///   messages concatenated in time order (no deduplication).
/// - An opening interrupted by a closure is split around it; each piece keeps
///   the opening's messages.
/// - Cacheability is merged along with messages. An opening hidden entirely
///   by a closure hands its cacheability to that closure.
/// - Zero-duration occurrences cover no instant and are dropped.
///
/// The result is sorted by start. Each piece is expressed in the timezone of
/// the occurrence it comes from: an opening resumed after a closure keeps its
/// own zone. Flattening is idempotent, zones included.
pub fn flatten(occurrences: &[Occurrence]) -> Vec<Occurrence> {
    let mut markers: Vec<Marker> = occurrences
        .iter()
        .filter(|o| !o.range().is_empty())
        .flat_map(|o| [Marker::new(o, Edge::Start), Marker::new(o, Edge::End)])
        .collect();

    trace!(
        occurrences = occurrences.len(),
        dropped = occurrences.len() - markers.len() / 2,
        markers = markers.len(),
        "flattening occurrences"
    );

    markers.sort_by(compare_markers);

    let markers = merge_same_type(markers, false);
    let markers = merge_same_type(markers, true);
    let markers = suppress_covered_openings(markers);

    let mut flattened = reconstruct(&markers);
    sort_by_start(&mut flattened);
    flattened
}

/// Combine intersecting spans of one type (openings or closures).
///
/// E.g. closures `[10am-2pm, 11am-3pm]` become `[10am-3pm]`. Nested start
/// markers are removed and their payload pushed onto the start marker of the
/// run they fall inside; only the end marker that closes the run survives.
fn merge_same_type(markers: Vec<Marker>, open: bool) -> Vec<Marker> {
    let mut kept: Vec<Marker> = Vec::with_capacity(markers.len());
    let mut depth = 0usize;
    let mut run_start: Option<usize> = None;

    for marker in markers {
        if marker.open != open {
            kept.push(marker);
            continue;
        }

        match marker.edge {
            Edge::Start => {
                depth += 1;
                match run_start {
                    Some(index) if depth > 1 => kept[index].payload.absorb(&marker.payload),
                    _ => {
                        run_start = Some(kept.len());
                        kept.push(marker);
                    }
                }
            }
            Edge::End => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    run_start = None;
                    kept.push(marker);
                }
            }
        }
    }

    kept
}

/// Drop opening markers that fall between a closure's start and end.
///
/// Expects same-type spans to be merged already, so at most one opening and
/// one closure are active at a time.
fn suppress_covered_openings(markers: Vec<Marker>) -> Vec<Marker> {
    let mut kept: Vec<Marker> = Vec::with_capacity(markers.len());
    // Index in `kept` of the start of the closure we are inside.
    let mut closure: Option<usize> = None;
    // The opening currently running, visible or not.
    let mut opening: Option<Payload> = None;
    // The running opening started inside the current closure.
    let mut hidden = false;

    for mut marker in markers {
        match (marker.open, marker.edge) {
            (false, Edge::Start) => {
                closure = Some(kept.len());
                kept.push(marker);
            }
            (false, Edge::End) => {
                closure = None;
                hidden = false;
                marker.resumes = opening.clone();
                kept.push(marker);
            }
            (true, Edge::Start) => {
                opening = Some(marker.payload.clone());
                if closure.is_some() {
                    hidden = true;
                } else {
                    kept.push(marker);
                }
            }
            (true, Edge::End) => {
                let ended = opening.take();
                match closure {
                    Some(index) => {
                        if let (true, Some(ended)) = (hidden, ended) {
                            kept[index]
                                .payload
                                .cacheability
                                .merge_from(&ended.cacheability);
                        }
                    }
                    None => kept.push(marker),
                }
                hidden = false;
            }
        }
    }

    kept
}

/// Pair each surviving start (or resuming closure end) with the marker after
/// it.
///
/// After suppression an opening start is followed by its own end or by the
/// start of the closure that interrupts it, a closure start by its end, and a
/// resuming closure end by the opening's end or the next closure.
fn reconstruct(markers: &[Marker]) -> Vec<Occurrence> {
    markers
        .windows(2)
        .filter_map(|pair| {
            let (marker, next) = (&pair[0], &pair[1]);
            let (open, payload) = match (marker.open, marker.edge) {
                (open, Edge::Start) => (open, &marker.payload),
                (false, Edge::End) => (true, marker.resumes.as_ref()?),
                (true, Edge::End) => return None,
            };
            Some(
                Occurrence::from(DateRange::from_ordered(
                    marker.at.with_timezone(&payload.zone),
                    next.at,
                ))
                .with_open(open)
                .with_messages(payload.messages.iter().cloned())
                .with_cacheability(payload.cacheability.clone()),
            )
        })
        .collect()
}
