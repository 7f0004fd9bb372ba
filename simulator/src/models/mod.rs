//! Transient light-curve models and their evaluation
//!
//! A model is anything implementing [`TransientModel`]: it declares the
//! names of the parameters it consumes and maps observation phases (time
//! since explosion) to flux densities in a given band. Built-in models are
//! registered once in a process-wide table ([`registry`]); callers may also
//! hand their own implementation straight to a simulation.

pub mod analytic;
pub mod evaluate;
pub mod parameters;
pub mod registry;

pub use analytic::{Bazin, ConstantMagnitude, ExponentialDecay, PowerLaw};
pub use evaluate::{check_inputs, evaluate};
pub use parameters::ParameterSet;
pub use registry::{resolve, ModelRegistry};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photometry::Band;

/// Errors raised while resolving, validating, or evaluating a model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown model '{name}' (available: {available})")]
    UnknownModel { name: String, available: String },
    #[error("Model '{model}' requires parameter '{parameter}' which is missing")]
    MissingParameter { model: String, parameter: String },
    #[error("Model '{model}' parameter '{parameter}' must be finite, got {value}")]
    NonFiniteParameter {
        model: String,
        parameter: String,
        value: f64,
    },
    #[error("Model '{model}' parameter '{parameter}' has invalid value {value}: {reason}")]
    InvalidParameter {
        model: String,
        parameter: String,
        value: f64,
        reason: &'static str,
    },
    #[error("Model option '{key}' must be a number")]
    InvalidOption { key: String },
    #[error("Model '{model}' needs a filter frequency but band '{band}' is not a known filter")]
    UnknownFilter { model: String, band: Band },
    #[error("Model '{model}' returned {got} values for {expected} times in band '{band}'")]
    LengthMismatch {
        model: String,
        band: Band,
        expected: usize,
        got: usize,
    },
    #[error("Model '{model}' produced invalid flux density {value} in band '{band}' at time {time}")]
    InvalidOutput {
        model: String,
        band: Band,
        time: f64,
        value: f64,
    },
}

/// Free-form, model specific keyword options passed through to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelOptions(pub serde_json::Map<String, serde_json::Value>);

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Numeric option lookup; absent keys are `Ok(None)`
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ModelError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| ModelError::InvalidOption {
                    key: key.to_string(),
                }),
        }
    }
}

/// A physical transient model
///
/// Implementations are pure: identical inputs must give identical outputs.
/// Noise is injected downstream, never here.
pub trait TransientModel: Send + Sync {
    /// Identifier the model is registered under
    fn name(&self) -> &str;

    /// Names of the parameters the model consumes
    fn parameter_names(&self) -> &[&str];

    /// Whether the model needs the effective frequency of the band
    fn needs_frequency(&self) -> bool {
        false
    }

    /// Check parameter values and options without evaluating the model
    ///
    /// Called before any simulation work starts, whether or not any
    /// pointings end up being evaluated.
    fn validate(
        &self,
        _params: &ParameterSet,
        _options: &ModelOptions,
    ) -> Result<(), ModelError> {
        Ok(())
    }

    /// Flux density in mJy at each phase in `times`
    ///
    /// # Arguments
    /// * `times` - Time since explosion for each requested sample
    /// * `band` - Filter the samples are observed through
    /// * `params` - Parameter values, validated against [`Self::parameter_names`]
    /// * `options` - Model specific keyword options
    fn flux_density(
        &self,
        times: &[f64],
        band: &Band,
        params: &ParameterSet,
        options: &ModelOptions,
    ) -> Result<Vec<f64>, ModelError>;
}
