use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A single GPS point of a route, in trajectory order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Elevation in meters (0 when the source omits it)
    pub elevation: f64,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        TrackPoint {
            latitude,
            longitude,
            elevation,
        }
    }
}

/// Distance/slope profile derived once per route
///
/// `cumulative_distance` starts at 0 and is non-decreasing;
/// `slopes` holds one percent-grade value per consecutive point pair,
/// so `slopes.len() == cumulative_distance.len() - 1` for non-empty routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeProfile {
    /// Running sum of segment distances in meters
    pub cumulative_distance: Vec<f64>,

    /// Per-segment grade in percent
    pub slopes: Vec<f64>,
}

impl SlopeProfile {
    /// Total route distance in meters
    pub fn total_distance(&self) -> f64 {
        self.cumulative_distance.last().copied().unwrap_or(0.0)
    }

    pub fn segment_count(&self) -> usize {
        self.slopes.len()
    }
}

/// Elevation summary for a route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    /// Noise-filtered cumulative ascent in meters
    pub gain: f64,

    /// Noise-filtered cumulative descent in meters (positive value)
    pub loss: f64,

    /// Lowest elevation on the route
    pub min: f64,

    /// Highest elevation on the route
    pub max: f64,

    /// Net elevation change (last point minus first point)
    pub total_change: f64,
}

/// One best effort reported on an activity, as found in the raw JSON
///
/// Fields are independently optional; unusable entries are skipped during
/// record extraction rather than failing the scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestEffort {
    /// Distance label, e.g. "5k", "800m", "1 mile"
    #[serde(default)]
    pub name: Option<String>,

    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: Option<f64>,
}

/// Historical activity record as supplied by the external activity store
///
/// Stream fields are opaque serialized blobs parsed on demand; any of them
/// may be absent or unreadable without invalidating the activity itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Store-assigned identifier
    pub id: i64,

    /// Activity start date
    pub start_date: NaiveDate,

    /// Total distance in meters
    #[serde(default)]
    pub distance: Option<f64>,

    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: Option<f64>,

    /// Effort score derived from heart-rate zone distribution
    #[serde(default)]
    pub effort_score: Option<f64>,

    /// JSON array of best efforts: [{"name": "5k", "elapsed_time": 1170}, ...]
    #[serde(default)]
    pub best_efforts: Option<String>,

    /// JSON blob {"distance": [...], "altitude": [...]}, distance in km
    #[serde(default)]
    pub elevation_data: Option<String>,

    /// JSON blob {"time": [...], "distance": [...]}, time in s, distance in km
    #[serde(default)]
    pub pace_data: Option<String>,

    /// JSON blob {"time": [...], "heartrate": [...]}
    #[serde(default)]
    pub heartrate_data: Option<String>,
}

/// Elevation-vs-distance stream, each field independently nullable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElevationStream {
    #[serde(default)]
    pub distance: Option<Vec<f64>>,
    #[serde(default)]
    pub altitude: Option<Vec<f64>>,
}

/// Time-vs-distance stream, each field independently nullable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaceStream {
    #[serde(default)]
    pub time: Option<Vec<f64>>,
    #[serde(default)]
    pub distance: Option<Vec<f64>>,
}

/// Heart-rate-vs-time stream, each field independently nullable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartRateStream {
    #[serde(default)]
    pub time: Option<Vec<f64>>,
    #[serde(default)]
    pub heartrate: Option<Vec<f64>>,
}

fn parse_stream<T: serde::de::DeserializeOwned>(
    activity_id: i64,
    stream: &str,
    raw: Option<&String>,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(activity_id, stream, error = %e, "skipping unreadable stream blob");
            None
        }
    }
}

impl Activity {
    /// Parse the elevation stream blob, tolerating absence and bad JSON
    pub fn elevation_stream(&self) -> Option<ElevationStream> {
        parse_stream(self.id, "elevation", self.elevation_data.as_ref())
    }

    /// Parse the pace stream blob, tolerating absence and bad JSON
    pub fn pace_stream(&self) -> Option<PaceStream> {
        parse_stream(self.id, "pace", self.pace_data.as_ref())
    }

    /// Parse the heart-rate stream blob, tolerating absence and bad JSON
    pub fn heart_rate_stream(&self) -> Option<HeartRateStream> {
        parse_stream(self.id, "heartrate", self.heartrate_data.as_ref())
    }
}

/// Per-distance personal records for an athlete
///
/// Keys are distances in meters; values are the minimum elapsed time in
/// seconds seen across the full activity history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecordTable {
    records: BTreeMap<u32, f64>,
}

impl PersonalRecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an effort, keeping the minimum elapsed time per distance
    pub fn record(&mut self, distance_m: u32, elapsed_seconds: f64) {
        self.records
            .entry(distance_m)
            .and_modify(|best| {
                if elapsed_seconds < *best {
                    *best = elapsed_seconds;
                }
            })
            .or_insert(elapsed_seconds);
    }

    /// Best elapsed time in seconds for a distance, if any
    pub fn best_seconds(&self, distance_m: u32) -> Option<f64> {
        self.records.get(&distance_m).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over (distance_m, best_seconds) pairs in ascending distance
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.records.iter().map(|(d, t)| (*d, *t))
    }

    /// Parallel (distances_m, times_minutes) vectors for model fitting
    pub fn fit_series(&self) -> (Vec<f64>, Vec<f64>) {
        let distances = self.records.keys().map(|d| f64::from(*d)).collect();
        let times = self.records.values().map(|t| t / 60.0).collect();
        (distances, times)
    }

    /// String form used at the serialization boundary: "{meters}m" keys
    /// mapping to formatted times
    pub fn to_labeled(&self) -> BTreeMap<String, String> {
        self.records
            .iter()
            .map(|(d, t)| (format!("{}m", d), crate::records::format_time(*t)))
            .collect()
    }
}

/// One dated effort-score observation, input to the training-load models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortObservation {
    pub date: NaiveDate,
    pub effort_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_table_keeps_minimum() {
        let mut table = PersonalRecordTable::new();
        table.record(5000, 1200.0);
        table.record(5000, 1170.0);
        table.record(5000, 1300.0);
        assert_eq!(table.best_seconds(5000), Some(1170.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_fit_series_in_minutes() {
        let mut table = PersonalRecordTable::new();
        table.record(1000, 240.0);
        table.record(5000, 1200.0);
        let (distances, times) = table.fit_series();
        assert_eq!(distances, vec![1000.0, 5000.0]);
        assert_eq!(times, vec![4.0, 20.0]);
    }

    #[test]
    fn test_stream_parsing_tolerates_bad_json() {
        let activity = Activity {
            id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            distance: None,
            moving_time: None,
            effort_score: None,
            best_efforts: None,
            elevation_data: Some("{not json".to_string()),
            pace_data: Some(r#"{"time": [0, 30], "distance": [0.0, 0.1]}"#.to_string()),
            heartrate_data: None,
        };
        assert!(activity.elevation_stream().is_none());
        assert!(activity.heart_rate_stream().is_none());
        let pace = activity.pace_stream().unwrap();
        assert_eq!(pace.time.unwrap().len(), 2);
    }

    #[test]
    fn test_stream_fields_independently_nullable() {
        let stream: ElevationStream = serde_json::from_str(r#"{"distance": [0.0, 1.0]}"#).unwrap();
        assert!(stream.distance.is_some());
        assert!(stream.altitude.is_none());
    }
}
