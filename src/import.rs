//! Activity-log import
//!
//! Loads activity histories from CSV or JSON exports into memory. Rows
//! that fail to deserialize are skipped with a log entry so one corrupt
//! record cannot sink a whole import.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::models::{Activity, EffortObservation};
use crate::predictor::ActivityStore;

/// In-memory activity store backing the predictor and analytics
#[derive(Debug, Clone, Default)]
pub struct MemoryActivityStore {
    activities: Vec<Activity>,
}

impl MemoryActivityStore {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self { activities }
    }

    /// Load from a CSV export with one activity per row
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DataError::UnreadableStream {
            stream: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_csv_reader(BufReader::new(file))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let mut activities = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in csv_reader.deserialize::<Activity>().enumerate() {
            match result {
                Ok(activity) => activities.push(activity),
                Err(e) => {
                    skipped += 1;
                    debug!(row, error = %e, "skipping unparseable activity row");
                }
            }
        }

        info!(
            loaded = activities.len(),
            skipped, "imported activity log from CSV"
        );
        Ok(Self::new(activities))
    }

    /// Load from a JSON export holding an array of activities
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DataError::UnreadableStream {
            stream: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let activities: Vec<Activity> =
            serde_json::from_reader(reader).map_err(|e| DataError::ParseError {
                format: "json".to_string(),
                reason: e.to_string(),
            })?;
        info!(loaded = activities.len(), "imported activity log from JSON");
        Ok(Self::new(activities))
    }

    /// Pick the loader from the file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_path(path),
            _ => Self::from_csv_path(path),
        }
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Daily effort-score observations for the training-load models.
    ///
    /// Activities without a score are treated as rest and skipped.
    pub fn effort_observations(&self) -> Vec<EffortObservation> {
        let mut observations: Vec<EffortObservation> = self
            .activities
            .iter()
            .filter_map(|a| {
                a.effort_score.map(|effort_score| EffortObservation {
                    date: a.start_date,
                    effort_score,
                })
            })
            .collect();
        observations.sort_by_key(|o| o.date);
        observations
    }
}

impl ActivityStore for MemoryActivityStore {
    fn activities(&self) -> Result<Vec<Activity>> {
        Ok(self.activities.clone())
    }
}
