//! Training-load modeling
//!
//! Fitness-fatigue (FFM) impulse-response filter over daily effort scores,
//! plus the acute:chronic workload ratio (ACWR) over trailing observation
//! windows. Both operate on the effort-score series produced by the
//! heart-rate zone analysis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::EffortObservation;

/// Sentinel ratio reported when performance capacity is not positive
pub const RATIO_SENTINEL: f64 = 150.0;

/// Fitness-fatigue filter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FfmConfig {
    /// Fatigue time constant in days
    pub fatigue_tau: f64,

    /// Fitness time constant in days
    pub fitness_tau: f64,
}

impl Default for FfmConfig {
    fn default() -> Self {
        Self {
            fatigue_tau: 15.0,
            fitness_tau: 45.0,
        }
    }
}

/// Filter state carried from one day to the next
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FfmState {
    pub fatigue: f64,
    pub fitness: f64,
}

/// One day of fitness-fatigue output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FfmSample {
    pub date: NaiveDate,
    pub effort: f64,
    pub fatigue: f64,
    pub fitness: f64,
    /// (fitness - fatigue) / 2
    pub performance: f64,
    /// fitness - 2 * fatigue
    pub form: f64,
    /// 100 * pre-update fatigue / performance, or the sentinel when
    /// performance is not positive
    pub fatigue_ratio: f64,
}

/// Full fitness-fatigue series with the final carry-over state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmSeries {
    pub samples: Vec<FfmSample>,
    pub final_state: FfmState,
}

/// ACWR window configuration, in trailing observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcwrConfig {
    pub acute_window: usize,
    pub chronic_window: usize,
}

impl Default for AcwrConfig {
    fn default() -> Self {
        Self {
            acute_window: 7,
            chronic_window: 28,
        }
    }
}

/// One observation of the acute:chronic workload ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcwrSample {
    pub date: NaiveDate,
    pub acute_load: f64,
    pub chronic_load: f64,
    /// `None` when the chronic load is zero or either mean is non-finite
    pub ratio: Option<f64>,
}

/// Fitness-fatigue calculator, stateful across batches
#[derive(Debug, Clone, Default)]
pub struct FfmCalculator {
    config: FfmConfig,
    state: FfmState,
}

impl FfmCalculator {
    pub fn new(config: FfmConfig) -> Self {
        Self {
            config,
            state: FfmState::default(),
        }
    }

    pub fn with_state(config: FfmConfig, state: FfmState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> FfmState {
        self.state
    }

    /// Advance the filter by one day with effort `e`.
    ///
    /// The fatigue ratio uses the pre-update fatigue so that today's
    /// session does not count against today's readiness.
    pub fn step(&mut self, date: NaiveDate, effort: f64) -> FfmSample {
        let fatigue_decay = (-1.0 / self.config.fatigue_tau).exp();
        let fitness_decay = (-1.0 / self.config.fitness_tau).exp();

        let fatigue_pre = self.state.fatigue;
        let fatigue = effort + fatigue_decay * self.state.fatigue;
        let fitness = effort + fitness_decay * self.state.fitness;
        self.state = FfmState { fatigue, fitness };

        let performance = (fitness - fatigue) / 2.0;
        let form = fitness - 2.0 * fatigue;
        let fatigue_ratio = if performance > 0.0 {
            100.0 * fatigue_pre / performance
        } else {
            RATIO_SENTINEL
        };

        FfmSample {
            date,
            effort,
            fatigue,
            fitness,
            performance,
            form,
            fatigue_ratio,
        }
    }

    /// Run the filter over a date-ordered effort series
    pub fn run(&mut self, observations: &[EffortObservation]) -> FfmSeries {
        let mut ordered: Vec<&EffortObservation> = observations.iter().collect();
        ordered.sort_by_key(|o| o.date);

        let samples: Vec<FfmSample> = ordered
            .iter()
            .map(|o| self.step(o.date, o.effort_score))
            .collect();

        debug!(
            days = samples.len(),
            fatigue = self.state.fatigue,
            fitness = self.state.fitness,
            "fitness-fatigue filter complete"
        );

        FfmSeries {
            samples,
            final_state: self.state,
        }
    }
}

fn trailing_mean(values: &[f64], end: usize, window: usize) -> f64 {
    let start = (end + 1).saturating_sub(window);
    let slice = &values[start..=end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Acute:chronic workload ratio over a date-ordered effort series.
///
/// Both windows grow from a single observation at the start of the series,
/// so early samples compare partial means rather than being dropped.
pub fn acwr(observations: &[EffortObservation], config: &AcwrConfig) -> Vec<AcwrSample> {
    let mut ordered: Vec<&EffortObservation> = observations.iter().collect();
    ordered.sort_by_key(|o| o.date);
    let efforts: Vec<f64> = ordered.iter().map(|o| o.effort_score).collect();

    ordered
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let acute_load = trailing_mean(&efforts, i, config.acute_window);
            let chronic_load = trailing_mean(&efforts, i, config.chronic_window);
            let ratio = if chronic_load != 0.0 {
                let r = acute_load / chronic_load;
                r.is_finite().then_some(r)
            } else {
                None
            };
            AcwrSample {
                date: obs.date,
                acute_load,
                chronic_load,
                ratio,
            }
        })
        .collect()
}

/// Replace non-finite values with `None` for serialization boundaries
pub fn sanitize_series(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| v.is_finite().then_some(v))
        .collect()
}
