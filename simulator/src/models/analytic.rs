//! Built-in analytic light-curve models
//!
//! These cover the common phenomenological shapes used when simulating
//! survey data: a constant source, an afterglow-like power law, a
//! supernova-like Bazin rise and decline, and a simple exponential cooling
//! transient. Chromatic models scale with a spectral index β relative to a
//! reference frequency: F_ν ∝ (ν / ν_ref)^(-β).

use super::{ModelError, ModelOptions, ParameterSet, TransientModel};
use crate::photometry::{ab_mag_to_flux_density, Band};

/// Reference frequency used when the `reference_frequency_hz` option is absent
/// Units: Hz (close to the effective frequency of an r filter)
pub const DEFAULT_REFERENCE_FREQUENCY_HZ: f64 = 4.8e14;

const REFERENCE_FREQUENCY_OPTION: &str = "reference_frequency_hz";

/// Reference frequency of a chromatic model, from options or the default
fn reference_frequency(model: &str, options: &ModelOptions) -> Result<f64, ModelError> {
    let reference = options
        .get_f64(REFERENCE_FREQUENCY_OPTION)?
        .unwrap_or(DEFAULT_REFERENCE_FREQUENCY_HZ);
    if !(reference.is_finite() && reference > 0.0) {
        return Err(ModelError::InvalidParameter {
            model: model.to_string(),
            parameter: REFERENCE_FREQUENCY_OPTION.to_string(),
            value: reference,
            reason: "reference frequency must be positive",
        });
    }
    Ok(reference)
}

/// Chromatic scaling factor (ν / ν_ref)^(-β) for a band
fn spectral_scaling(
    model: &str,
    band: &Band,
    beta: f64,
    options: &ModelOptions,
) -> Result<f64, ModelError> {
    let frequency = band.frequency_hz().ok_or_else(|| ModelError::UnknownFilter {
        model: model.to_string(),
        band: band.clone(),
    })?;
    let reference = reference_frequency(model, options)?;
    Ok((frequency / reference).powf(-beta))
}

fn positive(model: &str, params: &ParameterSet, parameter: &str) -> Result<f64, ModelError> {
    let value = params.require(model, parameter)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidParameter {
            model: model.to_string(),
            parameter: parameter.to_string(),
            value,
            reason: "must be finite and positive",
        })
    }
}

/// Source of constant AB magnitude in every band and at every time
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantMagnitude;

impl TransientModel for ConstantMagnitude {
    fn name(&self) -> &str {
        "constant_magnitude"
    }

    fn parameter_names(&self) -> &[&str] {
        &["magnitude"]
    }

    fn flux_density(
        &self,
        times: &[f64],
        _band: &Band,
        params: &ParameterSet,
        _options: &ModelOptions,
    ) -> Result<Vec<f64>, ModelError> {
        let flux = ab_mag_to_flux_density(params.require(self.name(), "magnitude")?);
        Ok(vec![flux; times.len()])
    }
}

/// Afterglow-like power law: F = F₀ t^(-α) (ν / ν_ref)^(-β) for t > 0
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerLaw;

impl TransientModel for PowerLaw {
    fn name(&self) -> &str {
        "power_law"
    }

    fn parameter_names(&self) -> &[&str] {
        &["log10_f0", "alpha", "beta"]
    }

    fn needs_frequency(&self) -> bool {
        true
    }

    fn validate(&self, _params: &ParameterSet, options: &ModelOptions) -> Result<(), ModelError> {
        reference_frequency(self.name(), options).map(|_| ())
    }

    fn flux_density(
        &self,
        times: &[f64],
        band: &Band,
        params: &ParameterSet,
        options: &ModelOptions,
    ) -> Result<Vec<f64>, ModelError> {
        let f0 = 10f64.powf(params.require(self.name(), "log10_f0")?);
        let alpha = params.require(self.name(), "alpha")?;
        let beta = params.require(self.name(), "beta")?;
        let scale = f0 * spectral_scaling(self.name(), band, beta, options)?;

        Ok(times
            .iter()
            .map(|&t| if t > 0.0 { scale * t.powf(-alpha) } else { 0.0 })
            .collect())
    }
}

/// Bazin et al. (2009) rise and decline, commonly used for supernovae
///
/// F = A exp(-(t - t_peak) / t_fall) / (1 + exp(-(t - t_peak) / t_rise)),
/// scaled chromatically, and zero before explosion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bazin;

impl TransientModel for Bazin {
    fn name(&self) -> &str {
        "bazin"
    }

    fn parameter_names(&self) -> &[&str] {
        &["log10_amplitude", "t_peak", "t_rise", "t_fall", "beta"]
    }

    fn needs_frequency(&self) -> bool {
        true
    }

    fn validate(&self, params: &ParameterSet, options: &ModelOptions) -> Result<(), ModelError> {
        positive(self.name(), params, "t_rise")?;
        positive(self.name(), params, "t_fall")?;
        reference_frequency(self.name(), options).map(|_| ())
    }

    fn flux_density(
        &self,
        times: &[f64],
        band: &Band,
        params: &ParameterSet,
        options: &ModelOptions,
    ) -> Result<Vec<f64>, ModelError> {
        let amplitude = 10f64.powf(params.require(self.name(), "log10_amplitude")?);
        let t_peak = params.require(self.name(), "t_peak")?;
        let t_rise = positive(self.name(), params, "t_rise")?;
        let t_fall = positive(self.name(), params, "t_fall")?;
        let beta = params.require(self.name(), "beta")?;
        let scale = amplitude * spectral_scaling(self.name(), band, beta, options)?;

        Ok(times
            .iter()
            .map(|&t| {
                if t <= 0.0 {
                    return 0.0;
                }
                let dt = t - t_peak;
                scale * (-dt / t_fall).exp() / (1.0 + (-dt / t_rise).exp())
            })
            .collect())
    }
}

/// Exponentially cooling transient: F = F₀ exp(-t / τ) (ν / ν_ref)^(-β) for t > 0
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialDecay;

impl TransientModel for ExponentialDecay {
    fn name(&self) -> &str {
        "exponential_decay"
    }

    fn parameter_names(&self) -> &[&str] {
        &["log10_f0", "tau", "beta"]
    }

    fn needs_frequency(&self) -> bool {
        true
    }

    fn validate(&self, params: &ParameterSet, options: &ModelOptions) -> Result<(), ModelError> {
        positive(self.name(), params, "tau")?;
        reference_frequency(self.name(), options).map(|_| ())
    }

    fn flux_density(
        &self,
        times: &[f64],
        band: &Band,
        params: &ParameterSet,
        options: &ModelOptions,
    ) -> Result<Vec<f64>, ModelError> {
        let f0 = 10f64.powf(params.require(self.name(), "log10_f0")?);
        let tau = positive(self.name(), params, "tau")?;
        let beta = params.require(self.name(), "beta")?;
        let scale = f0 * spectral_scaling(self.name(), band, beta, options)?;

        Ok(times
            .iter()
            .map(|&t| if t > 0.0 { scale * (-t / tau).exp() } else { 0.0 })
            .collect())
    }
}
