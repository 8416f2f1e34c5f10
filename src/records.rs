//! Personal-record extraction
//!
//! Scans an athlete's activity history for best efforts and keeps the
//! minimum elapsed time per distinct distance. Distance labels arrive as
//! free-form strings ("5k", "1 mile", "800m") and are resolved to meters;
//! unusable labels and malformed per-activity effort JSON are skipped
//! rather than failing the whole scan.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::models::{Activity, BestEffort, PersonalRecordTable};

/// Meters per statute mile
const METERS_PER_MILE: f64 = 1609.34;

fn distance_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Numeric prefix followed by a unit word; trailing text after the
        // unit is tolerated, e.g. "400m splits"
        Regex::new(r"^(\d+(?:\.\d+)?)\s*([a-zA-Z]+)").expect("static regex")
    })
}

/// Resolve a distance label to meters.
///
/// Supports "k"/"km" (×1000), "mi"/"mile"/"miles" (×1609.34) and bare
/// meter suffixes, case-insensitively. Returns `None` for unresolvable or
/// zero-length labels.
pub fn convert_distance_to_meters(label: &str) -> Option<u32> {
    let normalized = label.trim().to_lowercase();
    let captures = distance_label_re().captures(&normalized)?;

    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    let meters = match captures.get(2)?.as_str() {
        "k" | "km" => number * 1000.0,
        "m" | "meter" | "meters" => number,
        "mi" | "mile" | "miles" => number * METERS_PER_MILE,
        _ => return None,
    };

    let meters = meters as u32;
    if meters > 0 {
        Some(meters)
    } else {
        None
    }
}

/// Format a duration in seconds as "mm:ss" or "hh:mm:ss"
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Parse "hh:mm:ss", "mm:ss" or a bare seconds value into minutes
pub fn time_to_minutes(time_str: &str) -> Result<f64> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    let parse = |s: &str| -> Result<f64> {
        s.parse::<f64>().map_err(|_| {
            DataError::ParseError {
                format: "time".to_string(),
                reason: format!("unrecognized time component in {:?}", time_str),
            }
            .into()
        })
    };

    match parts.as_slice() {
        [h, m, s] => Ok(parse(h)? * 60.0 + parse(m)? + parse(s)? / 60.0),
        [m, s] => Ok(parse(m)? + parse(s)? / 60.0),
        [s] => Ok(parse(s)? / 60.0),
        _ => Err(DataError::ParseError {
            format: "time".to_string(),
            reason: format!("unrecognized time format {:?}", time_str),
        }
        .into()),
    }
}

/// Format minutes as "h:mm:ss", "m:ss" or "s.cc"
pub fn minutes_to_time_str(minutes: f64) -> String {
    let hours = (minutes / 60.0) as u64;
    let mins = (minutes % 60.0) as u64;
    let secs = ((minutes * 60.0) % 60.0) as u64;
    let centis = ((minutes * 60.0 * 100.0) % 100.0) as u64;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else if mins > 0 {
        format!("{}:{:02}", mins, secs)
    } else {
        format!("{}.{:02}", secs, centis)
    }
}

/// Scan the activity history and build the per-distance record table.
///
/// A personal record never regresses mid-history: the minimum elapsed time
/// observed across all activities wins for each distance.
pub fn extract_records(activities: &[Activity]) -> PersonalRecordTable {
    let mut table = PersonalRecordTable::new();

    for activity in activities {
        let Some(raw) = activity.best_efforts.as_ref() else {
            continue;
        };

        let efforts: Vec<BestEffort> = match serde_json::from_str(raw) {
            Ok(efforts) => efforts,
            Err(e) => {
                debug!(activity_id = activity.id, error = %e, "skipping malformed best-efforts blob");
                continue;
            }
        };

        for effort in efforts {
            let (Some(name), Some(elapsed)) = (effort.name, effort.elapsed_time) else {
                continue;
            };
            // A record of zero or negative duration is sensor garbage
            if elapsed <= 0.0 {
                continue;
            }
            let Some(distance_m) = convert_distance_to_meters(&name) else {
                continue;
            };
            table.record(distance_m, elapsed);
        }
    }

    table
}
