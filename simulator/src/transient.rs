//! In-memory light curve of one transient, ready for fitting or plotting.

use std::collections::BTreeSet;

use crate::models::ParameterSet;
use crate::observation::{DataMode, ObservationRecord, SimulationResult};
use crate::photometry::Band;
use crate::storage::{SimulationStore, StorageError};

/// Columnar light curve with detection flags
///
/// `values` and `errors` are magnitudes or flux densities according to
/// `data_mode`. For non-detections `values` holds the limit.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientData {
    pub name: String,
    pub data_mode: DataMode,
    pub model: String,
    pub parameters: ParameterSet,
    pub time: Vec<f64>,
    pub band: Vec<Band>,
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
    pub limiting_magnitude: Vec<f64>,
    pub detected: Vec<bool>,
}

impl TransientData {
    pub(crate) fn empty(data_mode: DataMode) -> Self {
        Self {
            name: String::new(),
            data_mode,
            model: String::new(),
            parameters: ParameterSet::new(),
            time: Vec::new(),
            band: Vec::new(),
            values: Vec::new(),
            errors: Vec::new(),
            limiting_magnitude: Vec::new(),
            detected: Vec::new(),
        }
    }

    /// Columnar view of a simulation result
    pub fn from_result(name: impl Into<String>, result: &SimulationResult) -> Self {
        let mut data = Self::empty(result.data_mode());
        data.name = name.into();
        data.model = result.model().to_string();
        data.parameters = result.parameters().clone();
        for record in result.records() {
            data.time.push(record.time);
            data.band.push(record.band.clone());
            data.values.push(record.observed_value);
            data.errors.push(record.uncertainty);
            data.limiting_magnitude.push(record.limiting_magnitude);
            data.detected.push(record.detected);
        }
        data
    }

    /// Load a simulation saved under `./simulated/`
    pub fn load(name: &str, data_mode: DataMode) -> Result<Self, StorageError> {
        SimulationStore::default().load(name, data_mode)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Distinct bands observed
    pub fn bands(&self) -> BTreeSet<Band> {
        self.band.iter().cloned().collect()
    }

    /// Row indices of detections
    pub fn detections(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.detected[i]).collect()
    }

    /// Row indices of non-detections (upper limits)
    pub fn upper_limits(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.detected[i]).collect()
    }

    /// Row indices observed in `band`
    pub fn band_indices(&self, band: &Band) -> Vec<usize> {
        (0..self.len()).filter(|&i| &self.band[i] == band).collect()
    }

    /// Row-oriented copy of the light curve
    pub fn records(&self) -> Vec<ObservationRecord> {
        (0..self.len())
            .map(|i| ObservationRecord {
                time: self.time[i],
                band: self.band[i].clone(),
                observed_value: self.values[i],
                uncertainty: self.errors[i],
                limiting_magnitude: self.limiting_magnitude[i],
                detected: self.detected[i],
            })
            .collect()
    }
}
