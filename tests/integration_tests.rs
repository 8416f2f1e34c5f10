//! End-to-end tests over the public library surface

use chrono::NaiveDate;
use std::io::Write;

use pacecast::geometry;
use pacecast::import::MemoryActivityStore;
use pacecast::models::{Activity, TrackPoint};
use pacecast::power_law::PowerLawParams;
use pacecast::predictor::{self, PredictionBasis, PredictorConfig};
use pacecast::records;
use pacecast::training_load::{acwr, AcwrConfig, FfmCalculator, FfmConfig};
use pacecast::zones;

fn activity(id: i64, day: u32) -> Activity {
    Activity {
        id,
        start_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        distance: None,
        moving_time: None,
        effort_score: None,
        best_efforts: None,
        elevation_data: None,
        pace_data: None,
        heartrate_data: None,
    }
}

/// Activities whose best efforts follow a known time-distance model
fn history_from_model(truth: &PowerLawParams) -> Vec<Activity> {
    let distances = [
        ("1k", 1000.0),
        ("1 mile", 1609.34),
        ("5k", 5000.0),
        ("10k", 10000.0),
        ("21.097k", 21097.0),
    ];

    distances
        .iter()
        .enumerate()
        .map(|(i, (label, meters))| {
            let seconds = truth.predicted_time(*meters) * 60.0;
            let mut a = activity(i as i64 + 1, i as u32 + 1);
            a.best_efforts = Some(format!(
                r#"[{{"name": "{}", "elapsed_time": {:.1}}}]"#,
                label, seconds
            ));
            a
        })
        .collect()
}

/// Level route of roughly 10 km sampled every ~100 m
fn flat_route() -> Vec<TrackPoint> {
    (0..=100)
        .map(|i| TrackPoint::new(45.0 + i as f64 * 0.0009, 6.0, 250.0))
        .collect()
}

#[test]
fn test_route_prediction_from_record_history() {
    let truth = PowerLawParams {
        vm: 205.0,
        tc: 11.0,
        gamma_s: 0.12,
        gamma_l: 0.07,
    };
    let store = MemoryActivityStore::new(history_from_model(&truth));
    let route = flat_route();

    let prediction =
        predictor::predict_race_time(&route, &store, &PredictorConfig::default()).unwrap();

    assert_eq!(prediction.basis, PredictionBasis::PowerLaw);
    assert!(prediction.params.is_some());
    // No stream data in the history, so no slope correction was fitted
    assert!(prediction.coefficients.is_none());
    assert!(prediction.slope_adjusted_minutes.is_none());

    let expected = truth.predicted_time(prediction.total_distance_m);
    let relative = (prediction.predicted_minutes - expected).abs() / expected;
    assert!(
        relative < 0.05,
        "predicted {:.2} min vs model {:.2} min",
        prediction.predicted_minutes,
        expected
    );
}

#[test]
fn test_empty_history_uses_flat_pace_fallback() {
    let store = MemoryActivityStore::default();
    let route = flat_route();
    let config = PredictorConfig::default();

    let prediction = predictor::predict_race_time(&route, &store, &config).unwrap();

    assert_eq!(prediction.basis, PredictionBasis::FlatPace);
    assert!(prediction.params.is_none());
    let expected = prediction.total_distance_m / 1000.0 * config.fallback_pace_min_per_km;
    assert!((prediction.predicted_minutes - expected).abs() < 1e-9);
}

#[test]
fn test_gpx_file_round_trip() {
    let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="45.0000" lon="6.0000"><ele>1000.0</ele></trkpt>
    <trkpt lat="45.0045" lon="6.0000"><ele>1040.0</ele></trkpt>
    <trkpt lat="45.0090" lon="6.0000"><ele>1025.0</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(gpx.as_bytes()).unwrap();

    let points = geometry::parse_route(file.path()).unwrap();
    assert_eq!(points.len(), 3);

    let profile = geometry::slope_profile(&points);
    assert!(profile.total_distance() > 900.0);

    let stats = geometry::elevation_stats(&points);
    assert!(stats.gain >= 40.0);
    assert!(stats.loss >= 10.0);
}

#[test]
fn test_records_pipeline_keeps_best_times() {
    let mut slow = activity(1, 1);
    slow.best_efforts = Some(r#"[{"name": "5k", "elapsed_time": 1260}]"#.to_string());
    let mut fast = activity(2, 2);
    fast.best_efforts =
        Some(r#"[{"name": "5k", "elapsed_time": 1185}, {"name": "1k", "elapsed_time": 210}]"#.to_string());

    let table = records::extract_records(&[slow, fast]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.best_seconds(5000), Some(1185.0));

    let labeled = table.to_labeled();
    assert_eq!(labeled.get("5000m"), Some(&"19:45".to_string()));
    assert_eq!(labeled.get("1000m"), Some(&"03:30".to_string()));
}

#[test]
fn test_training_load_pipeline_from_csv() {
    let mut csv = String::from(
        "id,start_date,distance,moving_time,effort_score,best_efforts,elevation_data,pace_data,heartrate_data\n",
    );
    for day in 1..=28 {
        csv.push_str(&format!("{},2024-03-{:02},10.0,3600,30.0,,,,\n", day, day));
    }

    let store = MemoryActivityStore::from_csv_reader(csv.as_bytes()).unwrap();
    let observations = store.effort_observations();
    assert_eq!(observations.len(), 28);

    let series = FfmCalculator::new(FfmConfig::default()).run(&observations);
    assert_eq!(series.samples.len(), 28);
    let last = series.samples.last().unwrap();
    // Constant load accumulates more fitness than fatigue over a month
    assert!(last.fitness > last.fatigue);
    assert!(last.fatigue > 30.0);

    let ratios = acwr(&observations, &AcwrConfig::default());
    let final_ratio = ratios.last().unwrap();
    assert!((final_ratio.acute_load - 30.0).abs() < 1e-9);
    assert!((final_ratio.chronic_load - 30.0).abs() < 1e-9);
    assert_eq!(final_ratio.ratio, Some(1.0));
}

#[test]
fn test_zone_analysis_from_activity_streams() {
    let mut a = activity(7, 7);
    // 30 minutes at 155 bpm, one sample per minute
    let time: Vec<String> = (0..=30).map(|i| (i * 60).to_string()).collect();
    let hr: Vec<String> = (0..=30).map(|_| "155".to_string()).collect();
    a.heartrate_data = Some(format!(
        r#"{{"time": [{}], "heartrate": [{}]}}"#,
        time.join(","),
        hr.join(",")
    ));

    let stream = a.heart_rate_stream().unwrap();
    let summary = zones::calculate_zone_times(&stream, 194.0).unwrap();

    // 155 bpm is just under 80% of a 194 max, so zone 3
    assert!((summary.zones["zone_3"].time_minutes - 30.0).abs() < 1e-9);
    assert!((summary.total_time_minutes - 30.0).abs() < 1e-9);

    let effort = zones::effort_score(&summary);
    assert!((effort - (0.5 * 3.0f64.exp() * 100.0).round() / 100.0).abs() < 1e-9);
}
