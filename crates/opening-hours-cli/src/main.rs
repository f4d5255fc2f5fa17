//! `oh` CLI: compute opening hours from a JSON schedule.
//!
//! ## Usage
//!
//! ```sh
//! # Combined occurrences for every location, one week
//! oh occurrences -i schedule.json --from 2015-12-21 --to 2015-12-28
//!
//! # Flattened timeline for one location, as JSON
//! oh occurrences -i schedule.json --from 2015-12-21 --to 2015-12-28 \
//!     --layer timeline --location "Main Library" --json
//!
//! # Flatten an arbitrary list of occurrences (stdin → stdout)
//! cat occurrences.json | oh flatten
//!
//! # Two-week report
//! oh report -i schedule.json --from 2015-12-21 --weeks 2
//!
//! # Verbose logging (RUST_LOG takes precedence)
//! RUST_LOG=opening_hours=debug oh occurrences -i schedule.json --from 2015-12-21 --to 2015-12-28
//! ```

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use opening_hours::schedule::{occurrences_from_json, occurrences_to_json, open_minutes, OccurrenceRecord};
use opening_hours::source::localize;
use opening_hours::{flatten, occurrences_by_week, CacheableMetadata, DateRange, Location, Occurrence, Schedule};
use serde_json::json;
use std::io::{self, Read};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oh", version, about = "Opening hours calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Default log filter when RUST_LOG is not set (e.g. "debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List occurrences for each location in a schedule
    Occurrences {
        /// Schedule JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// First day of the window, in each location's timezone
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        /// Day after the last day of the window
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
        /// Which occurrences to list
        #[arg(long, value_enum, default_value_t = LayerArg::Combined)]
        layer: LayerArg,
        /// Only this location
        #[arg(long)]
        location: Option<String>,
        /// Emit JSON instead of text lines
        #[arg(long)]
        json: bool,
    },
    /// Flatten a JSON array of occurrences into a non-overlapping timeline
    Flatten {
        /// Occurrences JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Emit JSON instead of text lines
        #[arg(long)]
        json: bool,
    },
    /// Show the flattened hours of each location, week by week
    Report {
        /// Schedule JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// First day of the report
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        /// Number of weeks to cover
        #[arg(long, default_value_t = 1)]
        weeks: u32,
        /// Only this location
        #[arg(long)]
        location: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayerArg {
    /// Regular hours voided by same-day exceptions, then exceptions
    Combined,
    /// Regular hours only
    Regular,
    /// Exceptions only
    Exceptions,
    /// Regular hours and exceptions without voiding
    Dimensional,
    /// Combined occurrences flattened into a timeline
    Timeline,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let rendered = match cli.command {
        Commands::Occurrences {
            input,
            from,
            to,
            layer,
            location,
            json,
        } => {
            let schedule = read_schedule(input.as_deref())?;
            let locations = select_locations(&schedule, location.as_deref())?;
            let mut listed = Vec::new();
            for location in locations {
                let range = local_window(location, from, to)?;
                let occurrences = layer_occurrences(location, &range, layer)
                    .with_context(|| format!("Failed to compute occurrences for '{}'", location.name()))?;
                info!(location = location.name(), count = occurrences.len(), "computed occurrences");
                listed.push((location, occurrences));
            }
            if json {
                render_occurrences_json(&listed)?
            } else {
                render_occurrences_text(&listed)
            }
        }
        Commands::Flatten { input, json } => {
            let raw = read_input(input.as_deref())?;
            let occurrences = occurrences_from_json(&raw).context("Failed to parse occurrences")?;
            let flattened = flatten(&occurrences);
            if json {
                occurrences_to_json(&flattened).context("Failed to serialize occurrences")?
            } else {
                text_lines(&flattened)
            }
        }
        Commands::Report {
            input,
            from,
            weeks,
            location,
            json,
        } => {
            let schedule = read_schedule(input.as_deref())?;
            let to = from + Duration::weeks(i64::from(weeks.max(1)));
            let mut reports = Vec::new();
            for location in select_locations(&schedule, location.as_deref())? {
                let range = local_window(location, from, to)?;
                let timeline = Location::opening_hours()
                    .timeline(location, &range)
                    .with_context(|| format!("Failed to compute hours for '{}'", location.name()))?;
                reports.push((location, range, timeline));
            }
            if json {
                render_report_json(&reports)?
            } else {
                render_report_text(&reports)
            }
        }
    };

    write_output(cli.output.as_deref(), &rendered)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("opening_hours={},warn", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected a date like 2015-12-21: {}", e))
}

fn read_schedule(path: Option<&str>) -> Result<Schedule> {
    let raw = read_input(path)?;
    Schedule::from_json(&raw).context("Failed to parse schedule")
}

fn select_locations<'a>(schedule: &'a Schedule, name: Option<&str>) -> Result<Vec<&'a Location>> {
    match name {
        Some(name) => {
            let location = schedule
                .location(name)
                .with_context(|| format!("Unknown location: '{}'", name))?;
            Ok(vec![location])
        }
        None => Ok(schedule.locations().iter().collect()),
    }
}

/// Midnight of `from` to midnight of `to`, in the location's timezone.
fn local_window(location: &Location, from: NaiveDate, to: NaiveDate) -> Result<DateRange> {
    let tz = location.timezone();
    let start = localize(from.and_time(NaiveTime::MIN), tz)?;
    let end = localize(to.and_time(NaiveTime::MIN), tz)?;
    DateRange::new(start, end).with_context(|| format!("Invalid window {} to {}", from, to))
}

fn layer_occurrences(location: &Location, range: &DateRange, layer: LayerArg) -> opening_hours::error::Result<Vec<Occurrence>> {
    let hours = Location::opening_hours();
    let mut occurrences = match layer {
        LayerArg::Combined => hours.occurrences(location, range)?,
        LayerArg::Regular => hours.regular_hours(location, range)?,
        LayerArg::Exceptions => hours.exceptions(location, range)?,
        LayerArg::Dimensional => hours.dimensional_occurrences(location, range)?,
        LayerArg::Timeline => return hours.timeline(location, range),
    };
    opening_hours::sort_by_start(&mut occurrences);
    Ok(occurrences)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn text_lines(occurrences: &[Occurrence]) -> String {
    occurrences.iter().map(|o| format!("{}\n", o)).collect()
}

fn render_occurrences_text(listed: &[(&Location, Vec<Occurrence>)]) -> String {
    let mut out = String::new();
    for (location, occurrences) in listed {
        out.push_str(&format!("# {} ({})\n", location.name(), location.timezone().name()));
        out.push_str(&text_lines(occurrences));
    }
    out
}

fn render_occurrences_json(listed: &[(&Location, Vec<Occurrence>)]) -> Result<String> {
    let value: Vec<serde_json::Value> = listed
        .iter()
        .map(|(location, occurrences)| {
            let records: Vec<OccurrenceRecord> = occurrences.iter().map(OccurrenceRecord::from).collect();
            let cacheability = CacheableMetadata::collect(occurrences.iter().map(Occurrence::cacheability));
            json!({
                "location": location.name(),
                "timezone": location.timezone().name(),
                "occurrences": records,
                "cacheability": cacheability,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&value)?)
}

fn describe(occurrence: &Occurrence, location: &Location) -> String {
    let tz = location.timezone();
    let mut line = format!(
        "{} {}-{}",
        if occurrence.is_open() { "open" } else { "closed" },
        occurrence.start().with_timezone(&tz).format("%H:%M"),
        occurrence.end().with_timezone(&tz).format("%H:%M"),
    );
    if !occurrence.messages().is_empty() {
        line.push_str(&format!(" ({})", occurrence.messages().join("; ")));
    }
    line
}

fn render_report_text(reports: &[(&Location, DateRange, Vec<Occurrence>)]) -> String {
    let mut out = String::new();
    for (location, range, timeline) in reports {
        out.push_str(&format!("{} ({})\n", location.name(), location.timezone().name()));
        for (week, days) in occurrences_by_week(range, timeline, true) {
            let in_week: Vec<Occurrence> = days.values().flatten().cloned().collect();
            out.push_str(&format!(
                "  Week {}-W{:02}: open {} min\n",
                week.year(),
                week.week(),
                open_minutes(&in_week)
            ));
            for (day, occurrences) in days {
                let hours = if occurrences.is_empty() {
                    "no hours".to_string()
                } else {
                    occurrences
                        .iter()
                        .map(|o| describe(o, location))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                out.push_str(&format!("    {} {}: {}\n", day.format("%a"), day, hours));
            }
        }
    }
    out
}

fn render_report_json(reports: &[(&Location, DateRange, Vec<Occurrence>)]) -> Result<String> {
    let value: Vec<serde_json::Value> = reports
        .iter()
        .map(|(location, range, timeline)| {
            let weeks: Vec<serde_json::Value> = occurrences_by_week(range, timeline, true)
                .into_iter()
                .map(|(week, days)| {
                    let days: Vec<serde_json::Value> = days
                        .into_iter()
                        .map(|(day, occurrences)| {
                            let records: Vec<OccurrenceRecord> =
                                occurrences.iter().map(OccurrenceRecord::from).collect();
                            json!({ "date": day.to_string(), "occurrences": records })
                        })
                        .collect();
                    json!({ "week": format!("{}-W{:02}", week.year(), week.week()), "days": days })
                })
                .collect();
            json!({
                "location": location.name(),
                "open_minutes": open_minutes(timeline),
                "weeks": weeks,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&value)?)
}

// ---------------------------------------------------------------------------
// I/O
// ---------------------------------------------------------------------------

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
