//! Route geometry processing
//!
//! Parses GPX tracks into ordered `TrackPoint` sequences and derives the
//! distance/slope profile and elevation statistics used by the route time
//! predictor. Elevation gain/loss accumulation is threshold-filtered to
//! suppress GPS altitude noise.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, RouteError};
use crate::models::{ElevationStats, SlopeProfile, TrackPoint};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Minimum accumulated distance before an ascent segment is evaluated
pub const DEFAULT_MIN_SEGMENT_M: f64 = 30.0;

/// Minimum elevation delta for a segment to count as real ascent
pub const DEFAULT_MIN_ELEVATION_GAIN_M: f64 = 1.5;

/// Segment length used for descent accumulation
pub const LOSS_SEGMENT_M: f64 = 10.0;

/// Parse a GPX route file into an ordered point sequence.
///
/// Missing elevations default to 0. Fails if the file cannot be read or
/// contains no track points.
pub fn parse_route(path: &Path) -> Result<Vec<TrackPoint>> {
    let file = File::open(path).map_err(|_| RouteError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    parse_route_from_reader(BufReader::new(file))
}

/// Parse GPX content from any reader into an ordered point sequence.
pub fn parse_route_from_reader<R: Read>(reader: R) -> Result<Vec<TrackPoint>> {
    let gpx = gpx::read(reader).map_err(|e| RouteError::Unreadable {
        reason: e.to_string(),
    })?;

    let mut points = Vec::new();
    for track in &gpx.tracks {
        for segment in &track.segments {
            for waypoint in &segment.points {
                let location = waypoint.point();
                points.push(TrackPoint::new(
                    location.y(),
                    location.x(),
                    waypoint.elevation.unwrap_or(0.0),
                ));
            }
        }
    }

    if points.is_empty() {
        return Err(RouteError::EmptyRoute.into());
    }

    debug!(point_count = points.len(), "parsed route");
    Ok(points)
}

/// Great-circle distance between two points in meters (haversine formula)
pub fn haversine_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Derive the cumulative-distance/slope profile of a route.
///
/// Zero-length segments contribute slope 0 rather than a division error.
/// Fewer than 2 points yields a zero-valued profile, not an error.
pub fn slope_profile(points: &[TrackPoint]) -> SlopeProfile {
    let mut cumulative_distance = vec![0.0];
    let mut slopes = Vec::new();

    for pair in points.windows(2) {
        let dist = haversine_distance(&pair[0], &pair[1]);
        let elevation_change = pair[1].elevation - pair[0].elevation;
        let slope = if dist > 0.0 {
            (elevation_change / dist) * 100.0
        } else {
            0.0
        };

        let last = *cumulative_distance
            .last()
            .unwrap_or(&0.0);
        cumulative_distance.push(last + dist);
        slopes.push(slope);
    }

    SlopeProfile {
        cumulative_distance,
        slopes,
    }
}

/// Noise-filtered cumulative elevation gain in meters.
///
/// Distance is accumulated along the trajectory; once `min_segment_m` is
/// crossed, the elevation delta over the segment is credited only if it
/// exceeds `min_elevation_gain_m`, and the accumulator restarts from the
/// current point. The trailing partial segment is evaluated once at the end.
pub fn elevation_gain(points: &[TrackPoint], min_segment_m: f64, min_elevation_gain_m: f64) -> f64 {
    accumulate_elevation(points, min_segment_m, min_elevation_gain_m, 1.0)
}

/// Noise-filtered cumulative elevation loss in meters (positive value).
pub fn elevation_loss(points: &[TrackPoint], min_segment_m: f64, min_elevation_drop_m: f64) -> f64 {
    accumulate_elevation(points, min_segment_m, min_elevation_drop_m, -1.0)
}

/// Shared gain/loss accumulator; `sign` selects ascent (+1) or descent (-1).
fn accumulate_elevation(points: &[TrackPoint], min_segment_m: f64, threshold_m: f64, sign: f64) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut accumulated = 0.0;
    let mut segment_start_elevation = points[0].elevation;

    for i in 1..points.len() {
        accumulated += haversine_distance(&points[i - 1], &points[i]);

        if accumulated >= min_segment_m {
            let delta = sign * (points[i].elevation - segment_start_elevation);
            if delta >= threshold_m {
                total += delta;
            }
            accumulated = 0.0;
            segment_start_elevation = points[i].elevation;
        }
    }

    // Trailing partial segment
    if accumulated > 0.0 {
        let last = points[points.len() - 1].elevation;
        let delta = sign * (last - segment_start_elevation);
        if delta >= threshold_m {
            total += delta;
        }
    }

    total
}

/// Elevation summary statistics for a route.
///
/// Fewer than 2 points yields all-zero stats, not an error.
pub fn elevation_stats(points: &[TrackPoint]) -> ElevationStats {
    if points.len() < 2 {
        return ElevationStats {
            gain: 0.0,
            loss: 0.0,
            min: 0.0,
            max: 0.0,
            total_change: 0.0,
        };
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for p in points {
        min = min.min(p.elevation);
        max = max.max(p.elevation);
    }

    ElevationStats {
        gain: elevation_gain(points, DEFAULT_MIN_SEGMENT_M, DEFAULT_MIN_ELEVATION_GAIN_M),
        loss: elevation_loss(points, LOSS_SEGMENT_M, DEFAULT_MIN_ELEVATION_GAIN_M),
        min,
        max,
        total_change: points[points.len() - 1].elevation - points[0].elevation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64, elev: f64) -> TrackPoint {
        TrackPoint::new(lat, lon, elev)
    }

    // Points roughly 111m apart along a meridian
    fn straight_climb() -> Vec<TrackPoint> {
        (0..10)
            .map(|i| p(45.0 + 0.001 * i as f64, 6.0, 100.0 + 5.0 * i as f64))
            .collect()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = p(45.0, 6.0, 0.0);
        assert_eq!(haversine_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_symmetry() {
        let a = p(45.0, 6.0, 0.0);
        let b = p(45.5, 6.5, 0.0);
        let forward = haversine_distance(&a, &b);
        let backward = haversine_distance(&b, &a);
        assert!((forward - backward).abs() < 1e-9);
        assert!(forward > 0.0);
    }

    #[test]
    fn test_known_distance_one_degree_latitude() {
        let a = p(45.0, 6.0, 0.0);
        let b = p(46.0, 6.0, 0.0);
        let d = haversine_distance(&a, &b);
        // One degree of latitude is ~111.2 km
        assert!((d - 111_195.0).abs() < 200.0);
    }

    #[test]
    fn test_slope_profile_shape() {
        let points = straight_climb();
        let profile = slope_profile(&points);
        assert_eq!(profile.cumulative_distance.len(), points.len());
        assert_eq!(profile.slopes.len(), points.len() - 1);
        assert_eq!(profile.cumulative_distance[0], 0.0);
        for w in profile.cumulative_distance.windows(2) {
            assert!(w[1] >= w[0]);
        }
        // ~5m climb over ~111m per segment, slope around 4.5%
        for slope in &profile.slopes {
            assert!(*slope > 3.0 && *slope < 6.0);
        }
    }

    #[test]
    fn test_degenerate_segment_has_zero_slope() {
        let points = vec![p(45.0, 6.0, 100.0), p(45.0, 6.0, 150.0)];
        let profile = slope_profile(&points);
        assert_eq!(profile.slopes, vec![0.0]);
        assert_eq!(profile.total_distance(), 0.0);
    }

    #[test]
    fn test_short_input_yields_zero_profile() {
        let profile = slope_profile(&[]);
        assert_eq!(profile.cumulative_distance, vec![0.0]);
        assert!(profile.slopes.is_empty());

        let stats = elevation_stats(&[p(45.0, 6.0, 100.0)]);
        assert_eq!(stats.gain, 0.0);
        assert_eq!(stats.total_change, 0.0);
    }

    #[test]
    fn test_elevation_gain_on_steady_climb() {
        let points = straight_climb();
        let gain = elevation_gain(&points, DEFAULT_MIN_SEGMENT_M, DEFAULT_MIN_ELEVATION_GAIN_M);
        // 45m of total climb, all real
        assert!((gain - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_elevation_gain_filters_noise() {
        // Small oscillations under the threshold are suppressed
        let points: Vec<TrackPoint> = (0..10)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.0 } else { 0.5 };
                p(45.0 + 0.001 * i as f64, 6.0, 100.0 + wobble)
            })
            .collect();
        let gain = elevation_gain(&points, DEFAULT_MIN_SEGMENT_M, DEFAULT_MIN_ELEVATION_GAIN_M);
        assert_eq!(gain, 0.0);
    }

    #[test]
    fn test_gain_monotonic_in_threshold() {
        let points = straight_climb();
        let strict = elevation_gain(&points, DEFAULT_MIN_SEGMENT_M, 6.0);
        let loose = elevation_gain(&points, DEFAULT_MIN_SEGMENT_M, 1.0);
        assert!(loose >= strict);
    }

    #[test]
    fn test_elevation_stats_descending_route() {
        let points: Vec<TrackPoint> = (0..10)
            .map(|i| p(45.0 + 0.001 * i as f64, 6.0, 200.0 - 8.0 * i as f64))
            .collect();
        let stats = elevation_stats(&points);
        assert_eq!(stats.gain, 0.0);
        assert!(stats.loss > 0.0);
        assert_eq!(stats.min, 128.0);
        assert_eq!(stats.max, 200.0);
        assert_eq!(stats.total_change, -72.0);
    }

    #[test]
    fn test_parse_route_from_reader() {
        let gpx_doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacecast-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="45.0" lon="6.0"><ele>1000</ele></trkpt>
    <trkpt lat="45.001" lon="6.0"><ele>1010</ele></trkpt>
    <trkpt lat="45.002" lon="6.0"/>
  </trkseg></trk>
</gpx>"#;
        let points = parse_route_from_reader(gpx_doc.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].latitude, 45.0);
        assert_eq!(points[1].elevation, 1010.0);
        // Missing elevation defaults to 0
        assert_eq!(points[2].elevation, 0.0);
    }

    #[test]
    fn test_parse_route_rejects_empty_track() {
        let gpx_doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacecast-test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg/></trk>
</gpx>"#;
        let err = parse_route_from_reader(gpx_doc.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PacecastError::Route(RouteError::EmptyRoute)
        ));
    }
}
