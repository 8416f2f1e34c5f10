//! Heart-rate zone analysis
//!
//! Computes time-in-zone distributions from raw heart-rate streams, the
//! TRIMP training load, and the exponentially zone-weighted effort score
//! that feeds the training-load models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DataError, Result};
use crate::models::HeartRateStream;

/// Default maximum heart rate in bpm when the athlete profile has none
pub const DEFAULT_MAX_HR: f64 = 194.0;

/// Zone lower bounds as fractions of max HR (zone N spans bound N to N+1)
const ZONE_FRACTIONS: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Keys used in zone maps, in ascending intensity order
pub const ZONE_KEYS: [&str; 7] = [
    "below_zone_1",
    "zone_1",
    "zone_2",
    "zone_3",
    "zone_4",
    "zone_5",
    "above_zone_5",
];

/// TRIMP coefficient per zone, same order as `ZONE_KEYS`
const TRIMP_COEFFICIENTS: [f64; 7] = [0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 5.5];

/// Effort-score exponent per zone, same order as `ZONE_KEYS`
const EFFORT_WEIGHTS: [f64; 7] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

/// Time spent in one heart-rate zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneTime {
    pub time_seconds: f64,
    pub time_minutes: f64,
    /// Share of total recorded time, in percent
    pub percentage: f64,
}

/// Per-activity heart-rate zone distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateZoneSummary {
    /// Time per zone, keyed by `ZONE_KEYS`
    pub zones: BTreeMap<String, ZoneTime>,

    pub total_time_minutes: f64,

    /// Maximum heart rate the bands were derived from
    pub max_hr: f64,

    /// (lower, upper) bpm bounds of the five numbered zones
    pub zone_limits: BTreeMap<String, (f64, f64)>,
}

/// TRIMP training load derived from a zone distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingImpulse {
    pub trimp: f64,
    pub intensity_factor: f64,
    pub total_time_hours: f64,
}

/// (lower, upper) bpm bounds of the five numbered zones
pub fn zone_bounds(max_hr: f64) -> [(f64, f64); 5] {
    let mut bounds = [(0.0, 0.0); 5];
    for (i, bound) in bounds.iter_mut().enumerate() {
        *bound = (ZONE_FRACTIONS[i] * max_hr, ZONE_FRACTIONS[i + 1] * max_hr);
    }
    bounds
}

/// Index into `ZONE_KEYS` for a heart-rate sample
fn classify(hr: f64, bounds: &[(f64, f64); 5]) -> usize {
    if hr < bounds[0].0 {
        return 0;
    }
    for (i, (lower, upper)) in bounds.iter().enumerate() {
        if hr >= *lower && hr < *upper {
            return i + 1;
        }
    }
    6
}

/// Compute the time-in-zone distribution of one heart-rate stream.
///
/// Each sample is credited with the interval to the next timestamp.
/// Missing stream fields yield a recoverable `MissingData` error.
pub fn calculate_zone_times(stream: &HeartRateStream, max_hr: f64) -> Result<HeartRateZoneSummary> {
    let heartrate = stream.heartrate.as_ref().ok_or(DataError::MissingData {
        field: "heartrate".to_string(),
    })?;
    let time = stream.time.as_ref().ok_or(DataError::MissingData {
        field: "time".to_string(),
    })?;
    if heartrate.is_empty() || time.is_empty() {
        return Err(DataError::MissingData {
            field: "heartrate samples".to_string(),
        }
        .into());
    }

    let bounds = zone_bounds(max_hr);
    let mut zone_seconds = [0.0; 7];

    let samples = heartrate.len().min(time.len());
    for i in 0..samples.saturating_sub(1) {
        let dt = time[i + 1] - time[i];
        zone_seconds[classify(heartrate[i], &bounds)] += dt;
    }

    let total_seconds: f64 = zone_seconds.iter().sum();
    let mut zones = BTreeMap::new();
    for (key, seconds) in ZONE_KEYS.iter().zip(zone_seconds) {
        let percentage = if total_seconds > 0.0 {
            seconds / total_seconds * 100.0
        } else {
            0.0
        };
        zones.insert(
            (*key).to_string(),
            ZoneTime {
                time_seconds: seconds,
                time_minutes: seconds / 60.0,
                percentage,
            },
        );
    }

    let zone_limits = ZONE_KEYS[1..6]
        .iter()
        .zip(bounds)
        .map(|(key, limits)| ((*key).to_string(), limits))
        .collect();

    Ok(HeartRateZoneSummary {
        zones,
        total_time_minutes: total_seconds / 60.0,
        max_hr,
        zone_limits,
    })
}

/// TRIMP training load over a zone distribution
pub fn training_impulse(summary: &HeartRateZoneSummary) -> TrainingImpulse {
    let mut trimp = 0.0;
    let mut total_hours = 0.0;
    for (key, coefficient) in ZONE_KEYS.iter().zip(TRIMP_COEFFICIENTS) {
        if let Some(zone) = summary.zones.get(*key) {
            let hours = zone.time_seconds / 3600.0;
            trimp += hours * coefficient;
            total_hours += hours;
        }
    }
    let intensity_factor = if total_hours > 0.0 {
        trimp / total_hours
    } else {
        0.0
    };
    TrainingImpulse {
        trimp,
        intensity_factor,
        total_time_hours: total_hours,
    }
}

/// Effort score: sum over zones of hours-in-zone weighted by e^zone_weight.
///
/// Higher zones dominate exponentially, so a short hard session scores
/// comparably to a long easy one.
pub fn effort_score(summary: &HeartRateZoneSummary) -> f64 {
    let mut score = 0.0;
    for (key, weight) in ZONE_KEYS.iter().zip(EFFORT_WEIGHTS) {
        if let Some(zone) = summary.zones.get(*key) {
            score += zone.time_seconds / 3600.0 * weight.exp();
        }
    }
    (score * 100.0).round() / 100.0
}

/// Human-readable description of a zone key
pub fn zone_description(key: &str) -> &'static str {
    match key {
        "zone_1" => "Recovery - Regeneration and recovery",
        "zone_2" => "Endurance - Basic endurance development",
        "zone_3" => "Aerobic - Aerobic capacity improvement",
        "zone_4" => "Threshold - Anaerobic threshold development",
        "zone_5" => "Anaerobic - Maximum power development",
        "below_zone_1" => "Below zone 1",
        "above_zone_5" => "Above zone 5",
        _ => "Unknown zone",
    }
}
