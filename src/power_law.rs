//! Time-distance power model
//!
//! Two-regime critical-velocity model for middle/long-distance running:
//! below the critical distance `dc = vm * tc` the short-distance decay
//! exponent governs, above it the long-distance exponent does. The model
//! is continuous at the boundary, where both regimes reduce to `dc / vm`.
//!
//! Fitting minimizes the sum of squared relative errors over the athlete's
//! personal-record table with a bound-clamped Nelder-Mead simplex.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ModelError, Result};

/// Fitted parameters of the critical-velocity model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawParams {
    /// Maximal sustainable velocity in m/min
    pub vm: f64,

    /// Critical time in minutes
    pub tc: f64,

    /// Short-distance decay exponent
    pub gamma_s: f64,

    /// Long-distance decay exponent
    pub gamma_l: f64,
}

/// Optimizer start point: vm in m/min, tc in min, gamma_s, gamma_l
const INITIAL_PARAMS: [f64; 4] = [200.0, 10.0, 0.1, 0.05];

/// Physical parameter bounds, same order as `INITIAL_PARAMS`
const PARAM_BOUNDS: [(f64, f64); 4] = [(150.0, 250.0), (5.0, 20.0), (0.01, 1.0), (0.01, 1.0)];

/// Objective value assigned to non-physical parameter combinations
const PENALTY: f64 = 1e10;

const MAX_ITERATIONS: usize = 1000;
const CONVERGENCE_TOLERANCE: f64 = 1e-12;

impl PowerLawParams {
    /// Critical distance in meters, partitioning the two regimes
    pub fn critical_distance(&self) -> f64 {
        self.vm * self.tc
    }

    /// Flat-terrain baseline speed in m/s
    pub fn flat_speed_mps(&self) -> f64 {
        self.vm / 60.0
    }

    /// Predicted time in minutes for a race of `distance_m` meters
    pub fn predicted_time(&self, distance_m: f64) -> f64 {
        let dc = self.critical_distance();
        let gamma = if distance_m <= dc {
            self.gamma_s
        } else {
            self.gamma_l
        };
        distance_m / (self.vm * (1.0 - gamma * (distance_m / dc).ln()))
    }
}

/// Sum of squared relative errors of the model against observed times
fn relative_error(params: &PowerLawParams, distances: &[f64], real_times: &[f64]) -> f64 {
    let mut error = 0.0;
    for (&d, &real) in distances.iter().zip(real_times) {
        let pred = params.predicted_time(d);
        if !pred.is_finite() || pred <= 0.0 {
            return PENALTY;
        }
        error += ((real - pred) / real).powi(2);
    }
    error
}

fn clamp_to_bounds(x: &mut [f64; 4]) {
    for (value, (lo, hi)) in x.iter_mut().zip(PARAM_BOUNDS) {
        *value = value.clamp(lo, hi);
    }
}

fn params_from(x: &[f64; 4]) -> PowerLawParams {
    PowerLawParams {
        vm: x[0],
        tc: x[1],
        gamma_s: x[2],
        gamma_l: x[3],
    }
}

/// Fit the model to an athlete's record table.
///
/// `distances` are in meters, `times` in minutes. Requires at least two
/// distinct (distance, time) pairs; callers with an empty record table must
/// fall back to a flat-pace default instead of fitting.
pub fn fit(distances: &[f64], times: &[f64]) -> Result<PowerLawParams> {
    if distances.len() != times.len() {
        return Err(ModelError::InvalidParameter {
            model: "power-law model".to_string(),
            parameter: "series length".to_string(),
            value: format!("{} distances vs {} times", distances.len(), times.len()),
        }
        .into());
    }

    let mut distinct: Vec<f64> = distances.to_vec();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(ModelError::InsufficientData {
            model: "power-law model".to_string(),
            reason: format!("{} distinct record distances, need at least 2", distinct.len()),
        }
        .into());
    }

    let objective = |x: &[f64; 4]| relative_error(&params_from(x), distances, times);
    let best = nelder_mead(objective, INITIAL_PARAMS);
    let fitted = params_from(&best);

    let residual = relative_error(&fitted, distances, times);
    if !residual.is_finite() || residual >= PENALTY {
        warn!(residual, "power-law fit degenerate");
        return Err(ModelError::Degenerate {
            model: "power-law model".to_string(),
        }
        .into());
    }

    debug!(
        vm = fitted.vm,
        tc = fitted.tc,
        gamma_s = fitted.gamma_s,
        gamma_l = fitted.gamma_l,
        residual,
        "fitted power-law model"
    );
    Ok(fitted)
}

/// Bound-clamped Nelder-Mead simplex over the 4-parameter space.
///
/// Every candidate vertex is clamped into `PARAM_BOUNDS` before evaluation.
/// Terminates after `MAX_ITERATIONS` or when the objective spread across
/// the simplex drops below `CONVERGENCE_TOLERANCE`.
fn nelder_mead<F: Fn(&[f64; 4]) -> f64>(objective: F, start: [f64; 4]) -> [f64; 4] {
    const REFLECTION: f64 = 1.0;
    const EXPANSION: f64 = 2.0;
    const CONTRACTION: f64 = 0.5;
    const SHRINK: f64 = 0.5;

    // Initial simplex: start point plus one vertex perturbed per axis
    let mut simplex: Vec<[f64; 4]> = vec![start];
    for axis in 0..4 {
        let mut vertex = start;
        let (lo, hi) = PARAM_BOUNDS[axis];
        vertex[axis] += 0.05 * (hi - lo);
        clamp_to_bounds(&mut vertex);
        simplex.push(vertex);
    }

    let mut values: Vec<f64> = simplex.iter().map(&objective).collect();

    for _ in 0..MAX_ITERATIONS {
        // Order vertices by objective value
        let mut order: Vec<usize> = (0..simplex.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let simplex_sorted: Vec<[f64; 4]> = order.iter().map(|&i| simplex[i]).collect();
        let values_sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        simplex = simplex_sorted;
        values = values_sorted;

        if values[values.len() - 1] - values[0] < CONVERGENCE_TOLERANCE {
            break;
        }

        // Centroid of all but the worst vertex
        let mut centroid = [0.0; 4];
        for vertex in &simplex[..simplex.len() - 1] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
        for c in &mut centroid {
            *c /= (simplex.len() - 1) as f64;
        }

        let worst = simplex[simplex.len() - 1];
        let worst_value = values[values.len() - 1];
        let second_worst_value = values[values.len() - 2];

        let blend = |coef: f64| {
            let mut candidate = [0.0; 4];
            for i in 0..4 {
                candidate[i] = centroid[i] + coef * (centroid[i] - worst[i]);
            }
            clamp_to_bounds(&mut candidate);
            candidate
        };

        let reflected = blend(REFLECTION);
        let reflected_value = objective(&reflected);

        if reflected_value < values[0] {
            // Try expanding further along the same direction
            let expanded = blend(EXPANSION);
            let expanded_value = objective(&expanded);
            let last = simplex.len() - 1;
            if expanded_value < reflected_value {
                simplex[last] = expanded;
                values[last] = expanded_value;
            } else {
                simplex[last] = reflected;
                values[last] = reflected_value;
            }
        } else if reflected_value < second_worst_value {
            let last = simplex.len() - 1;
            simplex[last] = reflected;
            values[last] = reflected_value;
        } else {
            let contracted = blend(-CONTRACTION);
            let contracted_value = objective(&contracted);
            let last = simplex.len() - 1;
            if contracted_value < worst_value {
                simplex[last] = contracted;
                values[last] = contracted_value;
            } else {
                // Shrink every vertex toward the best one
                let best = simplex[0];
                for vertex in simplex.iter_mut().skip(1) {
                    for i in 0..4 {
                        vertex[i] = best[i] + SHRINK * (vertex[i] - best[i]);
                    }
                    clamp_to_bounds(vertex);
                }
                for (value, vertex) in values.iter_mut().zip(&simplex).skip(1) {
                    *value = objective(vertex);
                }
            }
        }
    }

    let best_index = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    simplex[best_index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuity_at_critical_distance() {
        let params = PowerLawParams {
            vm: 200.0,
            tc: 10.0,
            gamma_s: 0.12,
            gamma_l: 0.07,
        };
        let dc = params.critical_distance();
        assert_eq!(dc, 2000.0);

        // Both regimes reduce to dc/vm at the boundary
        let at_boundary = params.predicted_time(dc);
        assert!((at_boundary - dc / params.vm).abs() < 1e-12);

        let just_below = params.predicted_time(dc - 1e-6);
        let just_above = params.predicted_time(dc + 1e-6);
        assert!((just_below - just_above).abs() < 1e-6);
    }

    #[test]
    fn test_longer_races_take_longer() {
        let params = PowerLawParams {
            vm: 210.0,
            tc: 12.0,
            gamma_s: 0.15,
            gamma_l: 0.08,
        };
        let mut previous = 0.0;
        for d in [400.0, 1500.0, 5000.0, 10000.0, 21097.0, 42195.0] {
            let t = params.predicted_time(d);
            assert!(t > previous, "T({}) = {} not increasing", d, t);
            previous = t;
        }
    }

    #[test]
    fn test_fit_requires_two_distinct_distances() {
        assert!(fit(&[], &[]).is_err());
        assert!(fit(&[5000.0, 5000.0], &[20.0, 19.5]).is_err());
        assert!(fit(&[5000.0], &[20.0]).is_err());
    }

    #[test]
    fn test_fit_recovers_synthetic_data() {
        let truth = PowerLawParams {
            vm: 210.0,
            tc: 12.0,
            gamma_s: 0.15,
            gamma_l: 0.08,
        };
        let distances = [800.0, 1500.0, 3000.0, 5000.0, 10000.0, 21097.0];
        let times: Vec<f64> = distances.iter().map(|&d| truth.predicted_time(d)).collect();

        let fitted = fit(&distances, &times).unwrap();

        let residual = relative_error(&fitted, &distances, &times);
        assert!(residual < 1e-6, "residual {} too large", residual);

        for (&d, &t) in distances.iter().zip(&times) {
            let pred = fitted.predicted_time(d);
            assert!(
                ((pred - t) / t).abs() < 0.02,
                "T({}) = {} vs synthetic {}",
                d,
                pred,
                t
            );
        }
    }

    #[test]
    fn test_degenerate_fit_is_recoverable() {
        // A zero observed time blows up the relative-error objective; the
        // caller must be able to fall back instead of hard-failing
        let err = fit(&[1000.0, 5000.0], &[0.0, 20.0]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_fitted_params_respect_bounds() {
        // Wildly inconsistent times still produce in-bounds parameters
        let distances = [1000.0, 5000.0, 10000.0];
        let times = [1.0, 90.0, 95.0];
        let fitted = fit(&distances, &times).unwrap();
        assert!(fitted.vm >= 150.0 && fitted.vm <= 250.0);
        assert!(fitted.tc >= 5.0 && fitted.tc <= 20.0);
        assert!(fitted.gamma_s >= 0.01 && fitted.gamma_s <= 1.0);
        assert!(fitted.gamma_l >= 0.01 && fitted.gamma_l <= 1.0);
    }
}
