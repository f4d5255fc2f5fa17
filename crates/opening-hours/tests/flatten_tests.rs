//! Tests for flattening openings and closures into a non-overlapping timeline.

use chrono::{DateTime, TimeZone};
use chrono_tz::Asia::Singapore;
use chrono_tz::Australia::Sydney;
use chrono_tz::{Tz, UTC};
use opening_hours::cache::{CacheableMetadata, MaxAge};
use opening_hours::{flatten, Occurrence};

// ── Helpers ─────────────────────────────────────────────────────────────────

/// 1 October 2019 at the given time, UTC.
fn at(hour: u32, min: u32) -> DateTime<Tz> {
    UTC.with_ymd_and_hms(2019, 10, 1, hour, min, 0).unwrap()
}

fn occ(open: bool, start: (u32, u32), end: (u32, u32), messages: &[&str]) -> Occurrence {
    Occurrence::new(at(start.0, start.1), at(end.0, end.1))
        .unwrap()
        .with_open(open)
        .with_messages(messages.iter().copied())
}

fn open(start: (u32, u32), end: (u32, u32), messages: &[&str]) -> Occurrence {
    occ(true, start, end, messages)
}

fn closed(start: (u32, u32), end: (u32, u32), messages: &[&str]) -> Occurrence {
    occ(false, start, end, messages)
}

/// Render occurrences the way failures are easiest to read.
fn render(occurrences: &[Occurrence]) -> Vec<String> {
    occurrences.iter().map(|o| o.to_string()).collect()
}

fn assert_flattens_to(input: Vec<Occurrence>, expected: Vec<Occurrence>) {
    let flattened = flatten(&input);
    assert_eq!(render(&flattened), render(&expected));
}

// ── Single occurrences ──────────────────────────────────────────────────────

#[test]
fn empty_input_gives_empty_output() {
    assert!(flatten(&[]).is_empty());
}

#[test]
fn simple_opening() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"])],
        vec![open((9, 0), (17, 0), &["abc"])],
    );
}

#[test]
fn simple_closure() {
    assert_flattens_to(
        vec![closed((9, 0), (17, 0), &["abc"])],
        vec![closed((9, 0), (17, 0), &["abc"])],
    );
}

// ── Closure precedence ──────────────────────────────────────────────────────

#[test]
fn closure_encompassing_opening_erases_it() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"]), closed((8, 0), (18, 0), &["xyz"])],
        vec![closed((8, 0), (18, 0), &["xyz"])],
    );
}

#[test]
fn closure_inside_opening_splits_it() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"]), closed((13, 0), (13, 30), &["xyz"])],
        vec![
            open((9, 0), (13, 0), &["abc"]),
            closed((13, 0), (13, 30), &["xyz"]),
            open((13, 30), (17, 0), &["abc"]),
        ],
    );
}

#[test]
fn several_closures_inside_one_opening() {
    assert_flattens_to(
        vec![
            open((9, 0), (17, 0), &["abc"]),
            closed((10, 0), (11, 0), &["x"]),
            closed((12, 0), (13, 0), &["y"]),
        ],
        vec![
            open((9, 0), (10, 0), &["abc"]),
            closed((10, 0), (11, 0), &["x"]),
            open((11, 0), (12, 0), &["abc"]),
            closed((12, 0), (13, 0), &["y"]),
            open((13, 0), (17, 0), &["abc"]),
        ],
    );
}

#[test]
fn opening_end_intersecting_merged_closures() {
    assert_flattens_to(
        vec![
            open((9, 0), (13, 0), &["abc"]),
            closed((10, 30), (16, 0), &["def"]),
            closed((12, 0), (17, 0), &["xyz"]),
        ],
        vec![
            open((9, 0), (10, 30), &["abc"]),
            closed((10, 30), (17, 0), &["def", "xyz"]),
        ],
    );
}

#[test]
fn opening_start_intersecting_merged_closures() {
    assert_flattens_to(
        vec![
            closed((9, 30), (16, 0), &["abc"]),
            closed((12, 0), (17, 0), &["def"]),
            open((13, 0), (19, 0), &["xyz"]),
        ],
        vec![
            closed((9, 30), (17, 0), &["abc", "def"]),
            open((17, 0), (19, 0), &["xyz"]),
        ],
    );
}

#[test]
fn opening_spanning_gap_between_closures() {
    // The opening starts inside one closure and ends inside another; only the
    // gap between them stays open.
    assert_flattens_to(
        vec![
            closed((9, 0), (11, 0), &["a"]),
            open((10, 0), (13, 0), &["b"]),
            closed((12, 0), (14, 0), &["c"]),
        ],
        vec![
            closed((9, 0), (11, 0), &["a"]),
            open((11, 0), (12, 0), &["b"]),
            closed((12, 0), (14, 0), &["c"]),
        ],
    );
}

#[test]
fn opening_ending_with_closure_leaves_no_sliver() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"]), closed((13, 0), (17, 0), &["xyz"])],
        vec![open((9, 0), (13, 0), &["abc"]), closed((13, 0), (17, 0), &["xyz"])],
    );
}

#[test]
fn opening_and_closure_with_same_bounds() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"]), closed((9, 0), (17, 0), &["xyz"])],
        vec![closed((9, 0), (17, 0), &["xyz"])],
    );
}

// ── Same-type merging ───────────────────────────────────────────────────────

#[test]
fn individual_openings_stay_separate() {
    assert_flattens_to(
        vec![open((9, 0), (13, 0), &["abc"]), open((14, 30), (16, 0), &["xyz"])],
        vec![open((9, 0), (13, 0), &["abc"]), open((14, 30), (16, 0), &["xyz"])],
    );
}

#[test]
fn intersecting_openings_merge() {
    assert_flattens_to(
        vec![open((9, 0), (13, 0), &["abc"]), open((10, 30), (16, 0), &["xyz"])],
        vec![open((9, 0), (16, 0), &["abc", "xyz"])],
    );
}

#[test]
fn nested_opening_merges_into_outer() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["outer"]), open((10, 0), (11, 0), &["inner"])],
        vec![open((9, 0), (17, 0), &["outer", "inner"])],
    );
}

#[test]
fn touching_openings_merge() {
    assert_flattens_to(
        vec![open((9, 0), (13, 0), &["am"]), open((13, 0), (17, 0), &["pm"])],
        vec![open((9, 0), (17, 0), &["am", "pm"])],
    );
}

#[test]
fn touching_closures_merge() {
    assert_flattens_to(
        vec![closed((13, 0), (17, 0), &["pm"]), closed((9, 0), (13, 0), &["am"])],
        vec![closed((9, 0), (17, 0), &["am", "pm"])],
    );
}

#[test]
fn messages_are_not_deduplicated() {
    assert_flattens_to(
        vec![open((9, 0), (13, 0), &["same"]), open((12, 0), (16, 0), &["same"])],
        vec![open((9, 0), (16, 0), &["same", "same"])],
    );
}

#[test]
fn messages_follow_start_order_not_input_order() {
    assert_flattens_to(
        vec![open((10, 0), (16, 0), &["later"]), open((9, 0), (13, 0), &["earlier"])],
        vec![open((9, 0), (16, 0), &["earlier", "later"])],
    );
}

#[test]
fn equal_starts_keep_input_order_for_messages() {
    assert_flattens_to(
        vec![open((9, 0), (12, 0), &["first"]), open((9, 0), (13, 0), &["second"])],
        vec![open((9, 0), (13, 0), &["first", "second"])],
    );
}

// ── Gaps, zero durations, ordering ──────────────────────────────────────────

#[test]
fn gaps_stay_gaps() {
    let flattened = flatten(&[
        closed((9, 0), (10, 0), &[]),
        open((11, 0), (12, 0), &[]),
    ]);
    assert_eq!(flattened.len(), 2);
    assert_eq!(flattened[0].end(), at(10, 0));
    assert_eq!(flattened[1].start(), at(11, 0));
}

#[test]
fn zero_duration_occurrences_are_dropped() {
    assert_flattens_to(
        vec![open((9, 0), (17, 0), &["abc"]), closed((13, 0), (13, 0), &["blip"])],
        vec![open((9, 0), (17, 0), &["abc"])],
    );
    assert!(flatten(&[open((9, 0), (9, 0), &["x"])]).is_empty());
}

#[test]
fn output_is_sorted_and_non_overlapping() {
    let flattened = flatten(&[
        open((15, 0), (18, 0), &["d"]),
        closed((12, 0), (16, 0), &["c"]),
        open((8, 0), (13, 0), &["a"]),
        closed((9, 0), (10, 0), &["b"]),
    ]);
    for pair in flattened.windows(2) {
        assert!(pair[0].start() <= pair[1].start());
        assert!(pair[0].end() <= pair[1].start());
    }
    assert_eq!(
        render(&flattened),
        render(&[
            open((8, 0), (9, 0), &["a"]),
            closed((9, 0), (10, 0), &["b"]),
            open((10, 0), (12, 0), &["a"]),
            closed((12, 0), (16, 0), &["c"]),
            open((16, 0), (18, 0), &["d"]),
        ])
    );
}

#[test]
fn flattening_twice_changes_nothing() {
    let input = vec![
        open((9, 0), (17, 0), &["abc"]),
        closed((13, 0), (13, 30), &["xyz"]),
        open((16, 0), (19, 0), &["late"]),
        closed((18, 0), (20, 0), &["evening"]),
        closed((7, 0), (8, 0), &["early"]),
    ];
    let once = flatten(&input);
    let twice = flatten(&once);
    assert_eq!(once, twice);
}

// ── Cacheability ────────────────────────────────────────────────────────────

fn tagged(occurrence: Occurrence, tag: &str, max_age: MaxAge) -> Occurrence {
    let mut cache = CacheableMetadata::new();
    cache.add_tags([tag]).merge_max_age(max_age);
    occurrence.with_cacheability(cache)
}

#[test]
fn merged_openings_merge_cacheability() {
    let flattened = flatten(&[
        tagged(open((9, 0), (13, 0), &[]), "a", MaxAge::Seconds(600)),
        tagged(open((10, 0), (16, 0), &[]), "b", MaxAge::Permanent),
    ]);
    assert_eq!(flattened.len(), 1);
    let cache = flattened[0].cacheability();
    assert_eq!(cache.tags().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(cache.max_age(), MaxAge::Seconds(600));
}

#[test]
fn split_opening_keeps_cacheability_on_every_piece() {
    let flattened = flatten(&[
        tagged(open((9, 0), (17, 0), &[]), "regular", MaxAge::Permanent),
        tagged(closed((13, 0), (14, 0), &[]), "holiday", MaxAge::Permanent),
    ]);
    let tags: Vec<Vec<&str>> = flattened
        .iter()
        .map(|o| o.cacheability().tags().collect())
        .collect();
    assert_eq!(tags, vec![vec!["regular"], vec!["holiday"], vec!["regular"]]);
}

#[test]
fn hidden_opening_hands_cacheability_to_closure() {
    let flattened = flatten(&[
        tagged(open((9, 0), (17, 0), &["abc"]), "regular", MaxAge::Seconds(60)),
        tagged(closed((8, 0), (18, 0), &["xyz"]), "holiday", MaxAge::Permanent),
    ]);
    assert_eq!(flattened.len(), 1);
    let cache = flattened[0].cacheability();
    assert_eq!(cache.tags().collect::<Vec<_>>(), vec!["holiday", "regular"]);
    assert_eq!(cache.max_age(), MaxAge::Seconds(60));
    assert_eq!(flattened[0].messages(), ["xyz"]);
}

// ── Timezones ───────────────────────────────────────────────────────────────

#[test]
fn mixed_timezones_flatten_by_instant() {
    // 09:00-17:00 Sydney (UTC+10 in October before DST starts on the 6th)
    // is 23:00 the previous day to 07:00 UTC.
    let opening = Occurrence::new(
        Sydney.with_ymd_and_hms(2019, 10, 2, 9, 0, 0).unwrap(),
        Sydney.with_ymd_and_hms(2019, 10, 2, 17, 0, 0).unwrap(),
    )
    .unwrap()
    .with_open(true)
    .with_message("abc");
    // 11:00-12:00 Singapore (UTC+8) is 03:00-04:00 UTC.
    let closure = Occurrence::new(
        Singapore.with_ymd_and_hms(2019, 10, 2, 11, 0, 0).unwrap(),
        Singapore.with_ymd_and_hms(2019, 10, 2, 12, 0, 0).unwrap(),
    )
    .unwrap()
    .with_message("xyz");

    let flattened = flatten(&[opening, closure]);
    assert_eq!(flattened.len(), 3);

    let utc = |d: u32, h: u32| UTC.with_ymd_and_hms(2019, 10, d, h, 0, 0).unwrap();
    assert_eq!(flattened[0].start(), utc(1, 23));
    assert_eq!(flattened[0].end(), utc(2, 3));
    assert_eq!(flattened[1].start(), utc(2, 3));
    assert_eq!(flattened[1].end(), utc(2, 4));
    assert_eq!(flattened[2].start(), utc(2, 4));
    assert_eq!(flattened[2].end(), utc(2, 7));

    // Every piece is expressed in the zone of the occurrence it comes from.
    assert_eq!(flattened[0].range().timezone(), Sydney);
    assert_eq!(flattened[0].end().timezone(), Sydney);
    assert_eq!(flattened[1].range().timezone(), Singapore);
    assert_eq!(flattened[2].range().timezone(), Sydney);
    assert!(!flattened[1].is_open());
}

#[test]
fn reflattening_keeps_each_piece_in_its_zone() {
    // 13:00-17:00 Sydney opening touching the end of a 03:00 UTC closure
    // (13:00 Sydney).
    let opening = Occurrence::new(
        Sydney.with_ymd_and_hms(2019, 10, 2, 13, 0, 0).unwrap(),
        Sydney.with_ymd_and_hms(2019, 10, 2, 17, 0, 0).unwrap(),
    )
    .unwrap()
    .with_open(true)
    .with_message("abc");
    let closure = Occurrence::new(
        UTC.with_ymd_and_hms(2019, 10, 2, 2, 0, 0).unwrap(),
        UTC.with_ymd_and_hms(2019, 10, 2, 3, 0, 0).unwrap(),
    )
    .unwrap()
    .with_message("xyz");

    let once = flatten(&[opening, closure]);
    let twice = flatten(&once);

    let rendered = |occurrences: &[Occurrence]| -> Vec<String> {
        occurrences.iter().map(ToString::to_string).collect()
    };
    assert_eq!(rendered(&twice), rendered(&once));
    assert_eq!(
        rendered(&twice),
        vec![
            "CLOSED: 2019-10-02T02:00:00+00:00 - 2019-10-02T03:00:00+00:00 [xyz]",
            "OPEN: 2019-10-02T13:00:00+10:00 - 2019-10-02T17:00:00+10:00 [abc]",
        ]
    );
}
