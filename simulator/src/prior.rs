//! Parameter priors used to draw parameter sets for simulation.
//!
//! A [`Prior`] is an opaque source of [`ParameterSet`]s. [`PriorDict`] is
//! the standard implementation: one independent one-dimensional
//! distribution per parameter. Every built-in model has a default prior,
//! registered once at startup and looked up by model name.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rand::distr::Uniform;
use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ParameterSet;

/// Errors raised while building priors
#[derive(Error, Debug)]
pub enum PriorError {
    #[error("Invalid distribution for parameter '{parameter}': {reason}")]
    InvalidDistribution { parameter: String, reason: String },
    #[error("No default prior registered for model '{0}'")]
    UnknownModel(String),
}

/// Source of parameter sets
pub trait Prior: Send + Sync {
    /// Draw one concrete parameter set
    fn sample(&self, rng: &mut dyn RngCore) -> ParameterSet;
}

/// One-dimensional prior distribution of a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution1D {
    Uniform { minimum: f64, maximum: f64 },
    Gaussian { mu: f64, sigma: f64 },
    /// Uniform in log10 between two positive bounds
    LogUniform { minimum: f64, maximum: f64 },
    Fixed { value: f64 },
}

/// Validated, ready-to-sample form of a [`Distribution1D`]
#[derive(Debug, Clone)]
enum Sampler {
    Uniform(Uniform<f64>),
    Gaussian(Normal<f64>),
    LogUniform(Uniform<f64>),
    Fixed(f64),
}

impl Sampler {
    fn build(parameter: &str, distribution: Distribution1D) -> Result<Self, PriorError> {
        let invalid = |reason: String| PriorError::InvalidDistribution {
            parameter: parameter.to_string(),
            reason,
        };
        let uniform = |minimum: f64, maximum: f64| {
            if !(minimum.is_finite() && maximum.is_finite() && minimum < maximum) {
                return Err(invalid(format!(
                    "bounds must be finite with minimum < maximum, got [{minimum}, {maximum}]"
                )));
            }
            Uniform::new(minimum, maximum).map_err(|e| invalid(e.to_string()))
        };

        match distribution {
            Distribution1D::Uniform { minimum, maximum } => {
                Ok(Sampler::Uniform(uniform(minimum, maximum)?))
            }
            Distribution1D::LogUniform { minimum, maximum } => {
                if minimum <= 0.0 {
                    return Err(invalid(format!(
                        "log-uniform bounds must be positive, got minimum {minimum}"
                    )));
                }
                Ok(Sampler::LogUniform(uniform(minimum.log10(), maximum.log10())?))
            }
            Distribution1D::Gaussian { mu, sigma } => {
                if !(mu.is_finite() && sigma.is_finite() && sigma > 0.0) {
                    return Err(invalid(format!(
                        "gaussian needs finite mu and positive sigma, got mu {mu}, sigma {sigma}"
                    )));
                }
                Normal::new(mu, sigma)
                    .map(Sampler::Gaussian)
                    .map_err(|e| invalid(e.to_string()))
            }
            Distribution1D::Fixed { value } => {
                if !value.is_finite() {
                    return Err(invalid(format!("fixed value must be finite, got {value}")));
                }
                Ok(Sampler::Fixed(value))
            }
        }
    }

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        match self {
            Sampler::Uniform(u) => u.sample(rng),
            Sampler::Gaussian(n) => n.sample(rng),
            Sampler::LogUniform(u) => 10f64.powf(u.sample(rng)),
            Sampler::Fixed(value) => *value,
        }
    }
}

/// Independent per-parameter prior
#[derive(Debug, Clone)]
pub struct PriorDict {
    distributions: BTreeMap<String, Distribution1D>,
    samplers: BTreeMap<String, Sampler>,
}

impl PriorDict {
    /// Build a prior from per-parameter distributions
    pub fn new(distributions: BTreeMap<String, Distribution1D>) -> Result<Self, PriorError> {
        let samplers = distributions
            .iter()
            .map(|(name, &dist)| Ok((name.clone(), Sampler::build(name, dist)?)))
            .collect::<Result<BTreeMap<_, _>, PriorError>>()?;
        Ok(Self {
            distributions,
            samplers,
        })
    }

    /// A prior that always returns `parameters`
    pub fn fixed(parameters: &ParameterSet) -> Result<Self, PriorError> {
        Self::new(
            parameters
                .iter()
                .map(|(name, value)| (name.to_string(), Distribution1D::Fixed { value }))
                .collect(),
        )
    }

    /// Parse a prior from a JSON object of `name -> distribution`
    pub fn from_json(json: &str) -> Result<Self, PriorError> {
        let distributions: BTreeMap<String, Distribution1D> =
            serde_json::from_str(json).map_err(|e| PriorError::InvalidDistribution {
                parameter: "<file>".to_string(),
                reason: e.to_string(),
            })?;
        Self::new(distributions)
    }

    pub fn distributions(&self) -> &BTreeMap<String, Distribution1D> {
        &self.distributions
    }
}

impl Prior for PriorDict {
    fn sample(&self, rng: &mut dyn RngCore) -> ParameterSet {
        self.samplers
            .iter()
            .map(|(name, sampler)| (name.clone(), sampler.sample(rng)))
            .collect()
    }
}

type PriorTable = BTreeMap<&'static str, Vec<(&'static str, Distribution1D)>>;

fn uniform(minimum: f64, maximum: f64) -> Distribution1D {
    Distribution1D::Uniform { minimum, maximum }
}

static DEFAULT_PRIORS: Lazy<PriorTable> = Lazy::new(|| {
    BTreeMap::from([
        ("constant_magnitude", vec![("magnitude", uniform(16.0, 26.0))]),
        (
            "power_law",
            vec![
                ("log10_f0", uniform(-2.0, 1.0)),
                ("alpha", uniform(0.8, 1.6)),
                ("beta", uniform(0.5, 1.2)),
            ],
        ),
        (
            "bazin",
            vec![
                ("log10_amplitude", uniform(-2.5, 0.5)),
                ("t_peak", uniform(5.0, 30.0)),
                ("t_rise", uniform(1.0, 10.0)),
                ("t_fall", uniform(15.0, 80.0)),
                ("beta", uniform(-1.0, 1.0)),
            ],
        ),
        (
            "exponential_decay",
            vec![
                ("log10_f0", uniform(-2.0, 1.0)),
                ("tau", uniform(1.0, 20.0)),
                ("beta", uniform(-0.5, 1.5)),
            ],
        ),
    ])
});

/// Default prior registered for a built-in model
pub fn default_prior(model: &str) -> Result<PriorDict, PriorError> {
    let entries = DEFAULT_PRIORS
        .get(model)
        .ok_or_else(|| PriorError::UnknownModel(model.to_string()))?;
    PriorDict::new(
        entries
            .iter()
            .map(|&(name, dist)| (name.to_string(), dist))
            .collect(),
    )
}
