//! End-to-end simulation of survey observations of a transient.
//!
//! A run proceeds in fixed order:
//!
//! 1. Preflight: resolve the model, check parameters, filters, cadence
//!    mappings and numeric settings. Nothing random happens before this
//!    succeeds.
//! 2. Build the pointing table (from cadence statistics or a supplied table)
//!    and drop pointings after the end-time cutoff.
//! 3. Evaluate the model once per distinct band.
//! 4. Inject noise and classify detections, pointing by pointing, in table order.
//!
//! All randomness comes from one `StdRng` seeded per run, so a fixed seed
//! reproduces a run exactly. Runs share no state and may be executed
//! concurrently.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{rng, RngCore, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::detection::{DetectionEngine, DEFAULT_SNR_THRESHOLD};
use crate::models::{
    check_inputs, evaluate, resolve, ModelError, ModelOptions, ParameterSet, TransientModel,
};
use crate::observation::{DataMode, ObservationRecord, SimulationResult};
use crate::prior::{Prior, PriorError};
use crate::storage::StorageError;
use crate::survey::{CadenceConfig, PointingTable, SurveyError};

/// Top level error for simulation runs
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Survey(#[from] SurveyError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Prior(#[from] PriorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid data mode '{0}': expected 'magnitude' or 'flux_density'")]
    InvalidDataMode(String),
    #[error("Signal-to-noise threshold must not be NaN")]
    InvalidThreshold,
    #[error("End-time cutoff must not be NaN")]
    InvalidEndTime,
    #[error("Explosion time must be finite, got {0}")]
    InvalidExplosionTime(f64),
}

/// Where the model of a run comes from
#[derive(Clone)]
pub enum ModelSource {
    /// A built-in model, resolved by name
    Named(String),
    /// A caller supplied implementation
    Custom(Arc<dyn TransientModel>),
}

impl ModelSource {
    pub fn resolve(&self) -> Result<Arc<dyn TransientModel>, ModelError> {
        match self {
            ModelSource::Named(name) => resolve(name),
            ModelSource::Custom(model) => Ok(Arc::clone(model)),
        }
    }
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ModelSource::Custom(model) => f.debug_tuple("Custom").field(&model.name()).finish(),
        }
    }
}

impl From<&str> for ModelSource {
    fn from(name: &str) -> Self {
        ModelSource::Named(name.to_string())
    }
}

impl From<String> for ModelSource {
    fn from(name: String) -> Self {
        ModelSource::Named(name)
    }
}

impl From<Arc<dyn TransientModel>> for ModelSource {
    fn from(model: Arc<dyn TransientModel>) -> Self {
        ModelSource::Custom(model)
    }
}

/// Where the pointings of a run come from
#[derive(Debug, Clone)]
pub enum PointingSource {
    /// Generate pointings from per-band cadence statistics
    Cadence(CadenceConfig),
    /// Use a supplied pointing table as is
    Table(PointingTable),
}

impl From<CadenceConfig> for PointingSource {
    fn from(config: CadenceConfig) -> Self {
        PointingSource::Cadence(config)
    }
}

impl From<PointingTable> for PointingSource {
    fn from(table: PointingTable) -> Self {
        PointingSource::Table(table)
    }
}

/// Everything needed to run one simulation
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub model: ModelSource,
    pub parameters: ParameterSet,
    pub pointings: PointingSource,
    /// Detection threshold in σ
    pub snr_threshold: f64,
    /// Pointings after this epoch are dropped entirely
    pub end_time: Option<f64>,
    pub data_mode: DataMode,
    /// Epoch that model time is measured from
    pub explosion_time: f64,
    pub model_options: ModelOptions,
    /// Seed for cadence scatter and noise; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn new(
        model: impl Into<ModelSource>,
        parameters: ParameterSet,
        pointings: impl Into<PointingSource>,
    ) -> Self {
        Self {
            model: model.into(),
            parameters,
            pointings: pointings.into(),
            snr_threshold: DEFAULT_SNR_THRESHOLD,
            end_time: None,
            data_mode: DataMode::Magnitude,
            explosion_time: 0.0,
            model_options: ModelOptions::new(),
            seed: None,
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_snr_threshold(mut self, snr_threshold: f64) -> Self {
        self.snr_threshold = snr_threshold;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_data_mode(mut self, data_mode: DataMode) -> Self {
        self.data_mode = data_mode;
        self
    }

    pub fn with_explosion_time(mut self, explosion_time: f64) -> Self {
        self.explosion_time = explosion_time;
        self
    }

    pub fn with_model_options(mut self, model_options: ModelOptions) -> Self {
        self.model_options = model_options;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configuration checks that need no randomness
    fn preflight(&self) -> Result<Arc<dyn TransientModel>, SimulationError> {
        let model = self.model.resolve()?;

        if self.snr_threshold.is_nan() {
            return Err(SimulationError::InvalidThreshold);
        }
        if self.end_time.is_some_and(f64::is_nan) {
            return Err(SimulationError::InvalidEndTime);
        }
        if !self.explosion_time.is_finite() {
            return Err(SimulationError::InvalidExplosionTime(self.explosion_time));
        }

        let bands = match &self.pointings {
            PointingSource::Cadence(cadence) => {
                cadence.validate()?;
                cadence.bands()
            }
            PointingSource::Table(table) => table.bands(),
        };
        check_inputs(
            model.as_ref(),
            &self.parameters,
            &self.model_options,
            bands.iter(),
        )?;

        Ok(model)
    }
}

/// Run one simulation
///
/// # Returns
/// One observation record per retained pointing, in pointing-table order
///
/// # Errors
/// Configuration problems are reported before any random draw. A model
/// producing an invalid flux aborts the run with the band and epoch.
pub fn simulate(config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    let model = config.preflight()?;

    let seed = config.seed.unwrap_or_else(|| rng().next_u64());
    debug!("Simulating model '{}' with seed {seed}", model.name());
    let mut rng = StdRng::seed_from_u64(seed);

    let table = match &config.pointings {
        PointingSource::Cadence(cadence) => cadence.generate(&mut rng)?,
        PointingSource::Table(table) => table.clone(),
    };
    let table = match config.end_time {
        Some(end_time) => {
            let kept = table.truncated(end_time);
            let dropped = table.len() - kept.len();
            if dropped > 0 {
                info!("Dropped {dropped} pointings after end time {end_time}");
            }
            kept
        }
        None => table,
    };
    if table.is_empty() {
        warn!("No pointings to simulate for model '{}'", model.name());
    }

    let mut noiseless = vec![0.0; table.len()];
    for (band, indices) in table.indices_by_band() {
        let phases: Vec<f64> = indices
            .iter()
            .map(|&i| table.pointings()[i].time - config.explosion_time)
            .collect();
        let flux = evaluate(
            model.as_ref(),
            &phases,
            &band,
            &config.parameters,
            &config.model_options,
            DataMode::FluxDensity,
        )
        .map_err(|e| match e {
            ModelError::InvalidOutput {
                model,
                band,
                time,
                value,
            } => ModelError::InvalidOutput {
                model,
                band,
                time: time + config.explosion_time,
                value,
            },
            other => other,
        })?;
        for (&index, value) in indices.iter().zip(flux) {
            noiseless[index] = value;
        }
        debug!("Evaluated {} pointings in band {band}", indices.len());
    }

    let engine = DetectionEngine::new(config.snr_threshold);
    let records: Vec<ObservationRecord> = table
        .iter()
        .zip(&noiseless)
        .map(|(pointing, &flux)| {
            let measurement = engine.observe(flux, pointing.limiting_magnitude, &mut rng);
            let (observed_value, uncertainty) =
                measurement.reported(pointing.limiting_magnitude, config.data_mode);
            ObservationRecord {
                time: pointing.time,
                band: pointing.band.clone(),
                observed_value,
                uncertainty,
                limiting_magnitude: pointing.limiting_magnitude,
                detected: measurement.detected,
            }
        })
        .collect();

    let result = SimulationResult::new(
        model.name(),
        config.parameters.clone(),
        config.data_mode,
        records,
    );
    info!(
        "Simulated {} observations of '{}' ({} detections)",
        result.len(),
        result.model(),
        result.num_detections()
    );
    Ok(result)
}

/// Simulate `count` independent transients drawn from `prior`
///
/// Draw `i` seeds its own generator with `seed + i`, samples its parameters
/// from it, then seeds the run from the same generator. Results are in draw
/// order and do not depend on how rayon schedules the work.
pub fn simulate_population(
    config: &SimulationConfig,
    prior: &dyn Prior,
    count: usize,
    seed: u64,
) -> Result<Vec<SimulationResult>, SimulationError> {
    config.model.resolve()?;

    (0..count)
        .into_par_iter()
        .map(|i| {
            let mut draw_rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let parameters = prior.sample(&mut draw_rng);
            let run = config
                .clone()
                .with_parameters(parameters)
                .with_seed(draw_rng.next_u64());
            simulate(&run)
        })
        .collect()
}
