//! Route time prediction
//!
//! Composes the route geometry profile, the time-distance power model and
//! the slope-speed correction model into a race-time estimate. The engine
//! is stateless between invocations: every request re-fits both models from
//! the athlete's current history, supplied through the read-only
//! `ActivityStore` capability.
//!
//! Degradation order when history is sparse:
//! 1. fewer than 2 record distances: flat-pace default (5 min/km)
//! 2. unfittable slope-speed model: raw power-law estimate, no
//!    slope-adjusted diagnostic
//! Route parsing failures are the only hard errors.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::geometry::slope_profile;
use crate::models::{Activity, SlopeProfile, TrackPoint};
use crate::power_law::{self, PowerLawParams};
use crate::records::extract_records;
use crate::slope_model::{fit_slope_model, SlopeModelConfig, SlopeSpeedCoefficients};

/// Read-only access to an athlete's stored activity history.
///
/// The core never owns a database connection; callers hand in whatever
/// implementation backs their storage.
pub trait ActivityStore {
    /// Full activity history for the athlete, in any order
    fn activities(&self) -> Result<Vec<Activity>>;
}

/// Tunables of the per-segment time integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Linear fatigue decay per meter of accumulated distance
    pub fatigue_alpha: f64,

    /// Floor multiplier on baseline speed from fatigue alone
    pub fatigue_floor: f64,

    /// Minimum per-segment speed in m/s
    pub min_segment_speed_mps: f64,

    /// Pace used when the record table cannot support a fit, in min/km
    pub fallback_pace_min_per_km: f64,

    /// Filters of the slope-speed fit
    pub slope_model: SlopeModelConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            fatigue_alpha: 0.05,
            fatigue_floor: 0.8,
            min_segment_speed_mps: 0.1,
            fallback_pace_min_per_km: 5.0,
            slope_model: SlopeModelConfig::default(),
        }
    }
}

/// What the returned estimate is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    /// Fitted power-law model over the athlete's records
    PowerLaw,
    /// Flat-pace default, record table too sparse to fit
    FlatPace,
}

/// Race-time prediction for one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePrediction {
    /// Predicted finish time in minutes
    pub predicted_minutes: f64,

    /// Total route distance in meters
    pub total_distance_m: f64,

    /// Slope- and fatigue-adjusted diagnostic time in minutes, present only
    /// when the slope-speed model could be fitted
    pub slope_adjusted_minutes: Option<f64>,

    /// Fitted model parameters, absent on flat-pace fallback
    pub params: Option<PowerLawParams>,

    /// Fitted slope-speed coefficients, absent when defaults were not fittable
    pub coefficients: Option<SlopeSpeedCoefficients>,

    pub basis: PredictionBasis,
}

/// Per-segment time integration over the route profile.
///
/// Baseline speed decays linearly with accumulated distance down to the
/// fatigue floor; uphill segments decay exponentially with grade, downhill
/// segments linearly. Segment speed is clamped to a small positive floor so
/// a pathological grade can never blow up the division.
///
/// Returns (total time in minutes, total distance in meters).
pub fn integrate_route_time(
    profile: &SlopeProfile,
    params: &PowerLawParams,
    coefficients: &SlopeSpeedCoefficients,
    config: &PredictorConfig,
) -> (f64, f64) {
    let flat_speed = params.flat_speed_mps();
    let mut time_total_s = 0.0;
    let mut distance_total = 0.0;

    for i in 1..profile.cumulative_distance.len() {
        let segment_length = profile.cumulative_distance[i] - profile.cumulative_distance[i - 1];
        let slope = profile.slopes[i - 1];

        distance_total += segment_length;
        let fatigue_factor = (1.0 - config.fatigue_alpha * distance_total).max(config.fatigue_floor);
        let speed_fatigued = flat_speed * fatigue_factor;

        let speed = if slope >= 0.0 {
            speed_fatigued * (-coefficients.k1 * slope).exp()
        } else {
            // slope is negative here, so this reduces speed
            speed_fatigued * (1.0 + coefficients.k2 * slope)
        };
        let speed = speed.max(config.min_segment_speed_mps);

        time_total_s += segment_length / speed;
    }

    (time_total_s / 60.0, distance_total)
}

/// Predict the race time for a route against an athlete's history.
///
/// Fails only when the route itself is unusable; sparse history degrades
/// to documented fallbacks instead.
pub fn predict_race_time(
    points: &[TrackPoint],
    store: &dyn ActivityStore,
    config: &PredictorConfig,
) -> Result<RoutePrediction> {
    let profile = slope_profile(points);
    let total_distance = profile.total_distance();

    let activities = store.activities()?;
    let records = extract_records(&activities);

    if records.len() < 2 {
        let predicted = total_distance / 1000.0 * config.fallback_pace_min_per_km;
        warn!(
            record_count = records.len(),
            predicted_minutes = predicted,
            "record table too sparse, using flat-pace fallback"
        );
        return Ok(RoutePrediction {
            predicted_minutes: predicted,
            total_distance_m: total_distance,
            slope_adjusted_minutes: None,
            params: None,
            coefficients: None,
            basis: PredictionBasis::FlatPace,
        });
    }

    let (distances, times) = records.fit_series();
    let params = match power_law::fit(&distances, &times) {
        Ok(params) => params,
        Err(e) if e.is_recoverable() => {
            let predicted = total_distance / 1000.0 * config.fallback_pace_min_per_km;
            warn!(error = %e, "power-law fit failed, using flat-pace fallback");
            return Ok(RoutePrediction {
                predicted_minutes: predicted,
                total_distance_m: total_distance,
                slope_adjusted_minutes: None,
                params: None,
                coefficients: None,
                basis: PredictionBasis::FlatPace,
            });
        }
        Err(e) => return Err(e),
    };

    let predicted_minutes = params.predicted_time(total_distance);

    // The slope-adjusted integration is a refinement diagnostic; when the
    // correction model cannot be fitted the raw power-law estimate stands
    // alone, unmodified.
    let (slope_adjusted_minutes, coefficients) =
        match fit_slope_model(&activities, params.flat_speed_mps(), &config.slope_model) {
            Ok(coefficients) => {
                let (adjusted, _) = integrate_route_time(&profile, &params, &coefficients, config);
                (Some(adjusted), Some(coefficients))
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "slope-speed model unavailable, skipping slope correction");
                (None, None)
            }
            Err(e) => return Err(e),
        };

    info!(
        total_distance,
        predicted_minutes,
        slope_adjusted = ?slope_adjusted_minutes,
        "route prediction complete"
    );

    Ok(RoutePrediction {
        predicted_minutes,
        total_distance_m: total_distance,
        slope_adjusted_minutes,
        params: Some(params),
        coefficients,
        basis: PredictionBasis::PowerLaw,
    })
}
