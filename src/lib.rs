// Library interface for the pacecast modules
// This allows integration tests to access the core functionality

pub mod config;
pub mod error;
pub mod geometry;
pub mod import;
pub mod logging;
pub mod models;
pub mod power_law;
pub mod predictor;
pub mod records;
pub mod slope_model;
pub mod training_load;
pub mod zones;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{PacecastError, Result};
pub use import::MemoryActivityStore;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{
    Activity, EffortObservation, ElevationStats, PersonalRecordTable, SlopeProfile, TrackPoint,
};
pub use power_law::PowerLawParams;
pub use predictor::{ActivityStore, PredictionBasis, PredictorConfig, RoutePrediction};
pub use slope_model::{SlopeModelConfig, SlopeSpeedCoefficients};
pub use training_load::{AcwrConfig, FfmCalculator, FfmConfig, FfmSeries};
pub use zones::{HeartRateZoneSummary, TrainingImpulse};
