//! Evaluation of a model at requested times in one band.

use log::warn;

use super::{ModelError, ModelOptions, ParameterSet, TransientModel};
use crate::observation::DataMode;
use crate::photometry::{flux_density_to_ab_mag, Band};

/// Check that a model can be evaluated before any simulation work starts
///
/// Every declared parameter must be present, every value must be finite,
/// the model's own value checks must pass and, for chromatic models, every
/// band must resolve to a known filter. Extra parameters are tolerated and
/// reported at `warn` level.
pub fn check_inputs<'a>(
    model: &dyn TransientModel,
    params: &ParameterSet,
    options: &ModelOptions,
    bands: impl IntoIterator<Item = &'a Band>,
) -> Result<(), ModelError> {
    let declared = model.parameter_names();

    for name in declared {
        params.require(model.name(), name)?;
    }

    // Non-finite values cannot be written to the parameter file
    if let Some((name, value)) = params.iter().find(|(_, value)| !value.is_finite()) {
        return Err(ModelError::NonFiniteParameter {
            model: model.name().to_string(),
            parameter: name.to_string(),
            value,
        });
    }

    for name in params.names() {
        if !declared.contains(&name) {
            warn!(
                "Parameter '{name}' is not used by model '{}' and will be ignored",
                model.name()
            );
        }
    }

    model.validate(params, options)?;

    if model.needs_frequency() {
        for band in bands {
            if band.frequency_hz().is_none() {
                return Err(ModelError::UnknownFilter {
                    model: model.name().to_string(),
                    band: band.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Evaluate `model` at `times` in `band` in the requested output convention
///
/// The model's flux densities are checked before conversion: each value must
/// be finite and non-negative. Magnitudes of zero flux are `f64::INFINITY`.
///
/// # Returns
/// One value per time: flux density in mJy or AB magnitude
pub fn evaluate(
    model: &dyn TransientModel,
    times: &[f64],
    band: &Band,
    params: &ParameterSet,
    options: &ModelOptions,
    mode: DataMode,
) -> Result<Vec<f64>, ModelError> {
    let flux = model.flux_density(times, band, params, options)?;

    if flux.len() != times.len() {
        return Err(ModelError::LengthMismatch {
            model: model.name().to_string(),
            band: band.clone(),
            expected: times.len(),
            got: flux.len(),
        });
    }

    if let Some((&time, &value)) = times
        .iter()
        .zip(&flux)
        .find(|(_, value)| !value.is_finite() || **value < 0.0)
    {
        return Err(ModelError::InvalidOutput {
            model: model.name().to_string(),
            band: band.clone(),
            time,
            value,
        });
    }

    Ok(match mode {
        DataMode::FluxDensity => flux,
        DataMode::Magnitude => flux.into_iter().map(flux_density_to_ab_mag).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstantMagnitude, ExponentialDecay, PowerLaw};
    use approx::assert_relative_eq;

    struct Broken;

    impl TransientModel for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn parameter_names(&self) -> &[&str] {
            &[]
        }

        fn flux_density(
            &self,
            times: &[f64],
            _band: &Band,
            _params: &ParameterSet,
            _options: &ModelOptions,
        ) -> Result<Vec<f64>, ModelError> {
            Ok(times
                .iter()
                .map(|&t| if t > 1.0 { f64::NAN } else { 1.0 })
                .collect())
        }
    }

    #[test]
    fn test_magnitude_convention() {
        let params = ParameterSet::new().with("magnitude", 19.5);
        let mags = evaluate(
            &ConstantMagnitude,
            &[0.0, 1.0],
            &Band::new("g"),
            &params,
            &ModelOptions::new(),
            DataMode::Magnitude,
        )
        .unwrap();

        for mag in mags {
            assert_relative_eq!(mag, 19.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_zero_flux_is_infinite_magnitude() {
        let params = ParameterSet::new()
            .with("log10_f0", 0.0)
            .with("alpha", 1.0)
            .with("beta", 0.0);
        let mags = evaluate(
            &PowerLaw,
            &[-1.0],
            &Band::new("r"),
            &params,
            &ModelOptions::new(),
            DataMode::Magnitude,
        )
        .unwrap();

        assert_eq!(mags, vec![f64::INFINITY]);
    }

    #[test]
    fn test_invalid_output_names_time_and_band() {
        let err = evaluate(
            &Broken,
            &[0.5, 2.0],
            &Band::new("i"),
            &ParameterSet::new(),
            &ModelOptions::new(),
            DataMode::FluxDensity,
        )
        .unwrap_err();

        match err {
            ModelError::InvalidOutput { band, time, .. } => {
                assert_eq!(band.as_str(), "i");
                assert_eq!(time, 2.0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_check_inputs_missing_parameter() {
        let params = ParameterSet::new().with("log10_f0", 0.0).with("alpha", 1.0);
        let err = check_inputs(&PowerLaw, &params, &ModelOptions::new(), [&Band::new("g")]).unwrap_err();

        assert!(matches!(
            err,
            ModelError::MissingParameter { ref parameter, .. } if parameter == "beta"
        ));
    }

    #[test]
    fn test_check_inputs_unknown_filter() {
        let params = ParameterSet::new()
            .with("log10_f0", 0.0)
            .with("alpha", 1.0)
            .with("beta", 0.0);
        let bands = [Band::new("g"), Band::new("w1")];
        let err = check_inputs(&PowerLaw, &params, &ModelOptions::new(), bands.iter()).unwrap_err();

        assert!(matches!(err, ModelError::UnknownFilter { ref band, .. } if band.as_str() == "w1"));
    }

    #[test]
    fn test_check_inputs_tolerates_extra_parameters() {
        let params = ParameterSet::new()
            .with("magnitude", 18.0)
            .with("redshift", 0.1);
        let options = ModelOptions::new();
        assert!(check_inputs(&ConstantMagnitude, &params, &options, [&Band::new("x")]).is_ok());
    }

    #[test]
    fn test_check_inputs_rejects_non_finite_values() {
        let options = ModelOptions::new();
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let declared = ParameterSet::new().with("magnitude", bad);
            let extra = ParameterSet::new()
                .with("magnitude", 18.0)
                .with("redshift", bad);

            for params in [declared, extra] {
                let err = check_inputs(&ConstantMagnitude, &params, &options, [&Band::new("g")])
                    .unwrap_err();
                assert!(matches!(err, ModelError::NonFiniteParameter { .. }));
            }
        }
    }

    #[test]
    fn test_check_inputs_runs_model_validation() {
        let params = ParameterSet::new()
            .with("log10_f0", 0.0)
            .with("tau", -2.0)
            .with("beta", 0.0);
        let err = check_inputs(&ExponentialDecay, &params, &ModelOptions::new(), [])
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::InvalidParameter { ref parameter, .. } if parameter == "tau"
        ));
    }
}
