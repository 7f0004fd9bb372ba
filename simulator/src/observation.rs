//! Observation records and the result of one simulation run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::ParameterSet;
use crate::photometry::Band;
use crate::storage::{SimulationStore, StorageError};
use crate::SimulationError;

/// Output convention of the `observed_value` column
///
/// There is deliberately no auto-detection: data files must be read back
/// with the mode they were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// AB magnitudes
    Magnitude,
    /// Flux density in mJy
    FluxDensity,
}

impl DataMode {
    /// Name of the value column in persisted tables
    pub fn value_column(&self) -> &'static str {
        match self {
            DataMode::Magnitude => "magnitude",
            DataMode::FluxDensity => "flux_density",
        }
    }

    /// Name of the uncertainty column in persisted tables
    pub fn error_column(&self) -> &'static str {
        match self {
            DataMode::Magnitude => "magnitude_error",
            DataMode::FluxDensity => "flux_density_error",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value_column())
    }
}

impl FromStr for DataMode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "magnitude" | "mag" => Ok(DataMode::Magnitude),
            "flux_density" | "flux" => Ok(DataMode::FluxDensity),
            _ => Err(SimulationError::InvalidDataMode(s.to_string())),
        }
    }
}

/// One simulated observation
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub time: f64,
    pub band: Band,
    /// Noisy measurement for detections, the limit for non-detections
    pub observed_value: f64,
    pub uncertainty: f64,
    pub limiting_magnitude: f64,
    pub detected: bool,
}

/// Output of one simulation run
///
/// Records are in pointing-table order. The result is not modified after
/// the run that created it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    model: String,
    parameters: ParameterSet,
    data_mode: DataMode,
    records: Vec<ObservationRecord>,
}

impl SimulationResult {
    pub fn new(
        model: impl Into<String>,
        parameters: ParameterSet,
        data_mode: DataMode,
        records: Vec<ObservationRecord>,
    ) -> Self {
        Self {
            model: model.into(),
            parameters,
            data_mode,
            records,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records flagged as detections
    pub fn num_detections(&self) -> usize {
        self.records.iter().filter(|r| r.detected).count()
    }

    /// Save under `./simulated/` keyed by `name`
    pub fn save(&self, name: &str) -> Result<(PathBuf, PathBuf), StorageError> {
        SimulationStore::default().save(self, name)
    }

    /// Save into an explicit store
    pub fn save_to(
        &self,
        store: &SimulationStore,
        name: &str,
    ) -> Result<(PathBuf, PathBuf), StorageError> {
        store.save(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_mode_parsing() {
        assert_eq!("magnitude".parse::<DataMode>().unwrap(), DataMode::Magnitude);
        assert_eq!("Mag".parse::<DataMode>().unwrap(), DataMode::Magnitude);
        assert_eq!("flux".parse::<DataMode>().unwrap(), DataMode::FluxDensity);
        assert_eq!(
            "flux_density".parse::<DataMode>().unwrap(),
            DataMode::FluxDensity
        );
        assert!(matches!(
            "counts".parse::<DataMode>(),
            Err(SimulationError::InvalidDataMode(ref s)) if s == "counts"
        ));
    }

    #[test]
    fn test_column_names() {
        assert_eq!(DataMode::Magnitude.value_column(), "magnitude");
        assert_eq!(DataMode::FluxDensity.error_column(), "flux_density_error");
    }

    #[test]
    fn test_num_detections() {
        let record = |detected| ObservationRecord {
            time: 0.0,
            band: Band::new("g"),
            observed_value: 20.0,
            uncertainty: 0.1,
            limiting_magnitude: 22.0,
            detected,
        };
        let result = SimulationResult::new(
            "constant_magnitude",
            ParameterSet::new(),
            DataMode::Magnitude,
            vec![record(true), record(false), record(true)],
        );

        assert_eq!(result.len(), 3);
        assert_eq!(result.num_detections(), 2);
    }
}
