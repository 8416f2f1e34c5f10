//! Slope-speed correction model
//!
//! Extracts synchronized distance/elevation/pace/heart-rate series from
//! historical activities, pools them, filters to a representative aerobic
//! effort band, and fits separate log-linear uphill/downhill slope-to-speed
//! decay coefficients. Everything operates on explicit struct-of-arrays
//! samples and pure functions; no hidden in-place mutation.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::error::{ModelError, Result};
use crate::models::Activity;

/// Samples slower than this are treated as standing still
pub const MIN_SPEED_MPS: f64 = 0.5;

/// Samples faster than this are GPS glitches, not running
pub const MAX_SPEED_MPS: f64 = 10.0;

/// Pooled z-score cutoff for outlier removal
pub const OUTLIER_Z_SCORE_THRESHOLD: f64 = 3.0;

/// Uphill/downhill speed-decay coefficients, per percent grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeSpeedCoefficients {
    /// Uphill decay rate (speed multiplier exp(-k1 * slope))
    pub k1: f64,

    /// Downhill decay rate (speed multiplier 1 + k2 * slope, slope < 0)
    pub k2: f64,
}

impl Default for SlopeSpeedCoefficients {
    fn default() -> Self {
        SlopeSpeedCoefficients { k1: 0.1, k2: 0.05 }
    }
}

/// Tunable filters of the slope-speed fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeModelConfig {
    /// Lower bound of the aerobic heart-rate band in bpm
    pub hr_band_min: f64,

    /// Upper bound of the aerobic heart-rate band in bpm
    pub hr_band_max: f64,

    /// Physical plausibility bound on |slope| in percent
    pub max_abs_slope: f64,

    /// Minimum pooled sample count after all filters
    pub min_samples: usize,
}

impl Default for SlopeModelConfig {
    fn default() -> Self {
        SlopeModelConfig {
            hr_band_min: 160.0,
            hr_band_max: 180.0,
            max_abs_slope: 30.0,
            min_samples: 3,
        }
    }
}

/// Per-activity synchronized sample arrays, all the same length
#[derive(Debug, Clone, Default)]
pub struct ActivityEffortSample {
    /// Common distance grid in km
    pub distance_ref: Vec<f64>,

    /// Instantaneous grade in percent
    pub slope: Vec<f64>,

    /// Instantaneous speed in m/s
    pub speed_mps: Vec<f64>,

    /// Heart rate interpolated onto the distance grid
    pub heart_rate: Vec<f64>,
}

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Piecewise-linear interpolation of (`xp`, `fp`) at the points `x`.
///
/// `xp` must be ascending; values outside its range clamp to the endpoints.
fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x.iter()
        .map(|&xi| {
            if xi <= xp[0] {
                return fp[0];
            }
            if xi >= xp[xp.len() - 1] {
                return fp[fp.len() - 1];
            }
            let j = match xp.binary_search_by(|v| v.total_cmp(&xi)) {
                Ok(j) => return fp[j],
                Err(j) => j,
            };
            let (x0, x1) = (xp[j - 1], xp[j]);
            let (y0, y1) = (fp[j - 1], fp[j]);
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (xi - x0) / (x1 - x0)
            }
        })
        .collect()
}

/// Discrete gradient dy/dx: central differences inside, one-sided at the
/// ends. Zero-length steps yield non-finite values that downstream masks
/// discard.
fn gradient(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = y.len();
    debug_assert!(n >= 2 && x.len() == n);
    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        out[i] = (y[i + 1] - y[i - 1]) / (x[i + 1] - x[i - 1]);
    }
    out
}

/// Resample one activity's streams onto a common distance grid and derive
/// instantaneous slope and speed.
///
/// Returns `None` when any stream is absent, too short, or the elevation
/// and pace streams have no overlapping distance range; the activity then
/// simply contributes nothing to the pooled fit.
pub fn extract_effort_sample(activity: &Activity) -> Option<ActivityEffortSample> {
    let elevation = activity.elevation_stream()?;
    let pace = activity.pace_stream()?;
    let hr = activity.heart_rate_stream()?;

    let d_alt = elevation.distance?;
    let alt = elevation.altitude?;
    let d_pace = pace.distance?;
    let t_pace = pace.time?;
    let heart_rate = hr.heartrate?;

    if d_alt.len() < 2 || alt.len() != d_alt.len() {
        return None;
    }
    if d_pace.len() < 2 || t_pace.len() != d_pace.len() || heart_rate.len() != d_pace.len() {
        return None;
    }

    let min_common = d_alt[0].max(d_pace[0]);
    let max_common = d_alt[d_alt.len() - 1].min(d_pace[d_pace.len() - 1]);
    if max_common <= min_common {
        return None;
    }

    // Grid resolution bounded by the coarser of the two native streams
    let n = d_alt.len().min(d_pace.len());
    let d_ref = linspace(min_common, max_common, n);

    let alt_ref = interp(&d_ref, &d_alt, &alt);
    let t_ref = interp(&d_ref, &d_pace, &t_pace);
    let hr_ref = interp(&d_ref, &d_pace, &heart_rate);

    // Distances are km in the raw streams; work in meters for gradients
    let d_ref_m: Vec<f64> = d_ref.iter().map(|d| d * 1000.0).collect();
    let slope: Vec<f64> = gradient(&alt_ref, &d_ref_m)
        .into_iter()
        .map(|g| g * 100.0)
        .collect();
    let speed: Vec<f64> = gradient(&d_ref_m, &t_ref);

    let mut sample = ActivityEffortSample::default();
    for i in 0..n {
        let keep = slope[i].is_finite()
            && speed[i].is_finite()
            && hr_ref[i].is_finite()
            && speed[i] > MIN_SPEED_MPS
            && speed[i] < MAX_SPEED_MPS;
        if keep {
            sample.distance_ref.push(d_ref[i]);
            sample.slope.push(slope[i]);
            sample.speed_mps.push(speed[i]);
            sample.heart_rate.push(hr_ref[i]);
        }
    }

    if sample.slope.is_empty() {
        return None;
    }
    Some(sample)
}

/// Keep indices whose slope, speed and heart rate all sit within the
/// pooled z-score cutoff.
fn zscore_mask(slope: &[f64], speed: &[f64], heart_rate: &[f64]) -> Vec<bool> {
    let z = |values: &[f64]| -> Vec<f64> {
        let mean = values.mean();
        let std = values.std_dev();
        values.iter().map(|v| ((v - mean) / std).abs()).collect()
    };
    let z_slope = z(slope);
    let z_speed = z(speed);
    let z_hr = z(heart_rate);

    (0..slope.len())
        .map(|i| {
            z_slope[i] < OUTLIER_Z_SCORE_THRESHOLD
                && z_speed[i] < OUTLIER_Z_SCORE_THRESHOLD
                && z_hr[i] < OUTLIER_Z_SCORE_THRESHOLD
        })
        .collect()
}

/// Ordinary least-squares slope of y against x (intercept absorbed).
/// `None` when x carries no variance.
fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 {
        return None;
    }
    let mean_x = x.mean();
    let mean_y = y.mean();
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        covariance += (xi - mean_x) * (yi - mean_y);
        variance += (xi - mean_x) * (xi - mean_x);
    }
    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

/// Fit the log-linear decay coefficient for one regime. Samples must have
/// strictly positive normalized speed before the logarithm; an empty or
/// degenerate subset falls back to the supplied default.
fn fit_regime(slopes: &[f64], normalized_speeds: &[f64], default: f64, regime: &str) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = slopes
        .iter()
        .zip(normalized_speeds)
        .filter(|(_, &v)| v > 0.0)
        .map(|(&s, &v)| (s, v.ln()))
        .unzip();

    match ols_slope(&xs, &ys) {
        Some(coefficient) => -coefficient,
        None => {
            debug!(regime, default, "no usable samples, using default coefficient");
            default
        }
    }
}

/// Fit uphill/downhill slope-speed decay coefficients from an athlete's
/// history.
///
/// `flat_speed_mps` is the flat-terrain baseline speed the normalized fit
/// is expressed against (vm/60 from the power-law model). Signals
/// `InsufficientData` when fewer than `config.min_samples` pooled samples
/// survive filtering, letting the caller fall back to defaults.
pub fn fit_slope_model(
    activities: &[Activity],
    flat_speed_mps: f64,
    config: &SlopeModelConfig,
) -> Result<SlopeSpeedCoefficients> {
    let samples: Vec<ActivityEffortSample> = activities
        .iter()
        .filter_map(extract_effort_sample)
        .collect();

    if samples.is_empty() {
        return Err(ModelError::InsufficientData {
            model: "slope-speed model".to_string(),
            reason: "no activities with usable streams".to_string(),
        }
        .into());
    }
    debug!(
        activity_count = activities.len(),
        usable = samples.len(),
        "extracted effort samples"
    );

    // Pool across activities
    let mut slope = Vec::new();
    let mut speed = Vec::new();
    let mut heart_rate = Vec::new();
    for sample in &samples {
        slope.extend_from_slice(&sample.slope);
        speed.extend_from_slice(&sample.speed_mps);
        heart_rate.extend_from_slice(&sample.heart_rate);
    }

    // Outlier removal, then the aerobic band, then physical plausibility
    let mask = zscore_mask(&slope, &speed, &heart_rate);
    let mut filtered_slope = Vec::new();
    let mut filtered_speed = Vec::new();
    for i in 0..slope.len() {
        let keep = mask[i]
            && heart_rate[i] >= config.hr_band_min
            && heart_rate[i] <= config.hr_band_max
            && slope[i].abs() <= config.max_abs_slope;
        if keep {
            filtered_slope.push(slope[i]);
            filtered_speed.push(speed[i]);
        }
    }

    if filtered_slope.len() < config.min_samples {
        warn!(
            remaining = filtered_slope.len(),
            required = config.min_samples,
            "too few aerobic-band samples for slope-speed fit"
        );
        return Err(ModelError::InsufficientData {
            model: "slope-speed model".to_string(),
            reason: format!(
                "{} samples after filtering, need {}",
                filtered_slope.len(),
                config.min_samples
            ),
        }
        .into());
    }

    let normalized: Vec<f64> = filtered_speed.iter().map(|v| v / flat_speed_mps).collect();
    let defaults = SlopeSpeedCoefficients::default();

    let (uphill_slope, uphill_norm): (Vec<f64>, Vec<f64>) = filtered_slope
        .iter()
        .zip(&normalized)
        .filter(|(&s, _)| s > 0.0)
        .map(|(&s, &v)| (s, v))
        .unzip();
    let (downhill_slope, downhill_norm): (Vec<f64>, Vec<f64>) = filtered_slope
        .iter()
        .zip(&normalized)
        .filter(|(&s, _)| s < 0.0)
        .map(|(&s, &v)| (s, v))
        .unzip();

    let k1 = fit_regime(&uphill_slope, &uphill_norm, defaults.k1, "uphill");
    let k2 = fit_regime(&downhill_slope, &downhill_norm, defaults.k2, "downhill");

    debug!(k1, k2, samples = filtered_slope.len(), "fitted slope-speed model");
    Ok(SlopeSpeedCoefficients { k1, k2 })
}
