use crate::detection::DEFAULT_SNR_THRESHOLD;
use crate::models::ParameterSet;
use crate::observation::DataMode;
use crate::survey::{CadenceConfig, PointingTable};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Parse a parameter assignment in format "name=value"
pub fn parse_parameter(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| "Parameters must be in format 'name=value'".to_string())?;

    let name = name.trim();
    if name.is_empty() {
        return Err("Parameter name cannot be empty".to_string());
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid value for parameter '{name}': {}", value.trim()))?;

    if !value.is_finite() {
        return Err(format!("Parameter '{name}' must be finite"));
    }

    Ok((name.to_string(), value))
}

/// Collect parsed parameter assignments into a parameter set
pub fn parameters_from_args(assignments: &[(String, f64)]) -> ParameterSet {
    assignments
        .iter()
        .map(|(name, value)| (name.clone(), *value))
        .collect()
}

/// Output convention selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DataModeArg {
    /// AB magnitudes - Default
    Magnitude,
    /// Flux density in mJy
    FluxDensity,
}

impl std::fmt::Display for DataModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataModeArg::Magnitude => write!(f, "magnitude"),
            DataModeArg::FluxDensity => write!(f, "flux-density"),
        }
    }
}

impl DataModeArg {
    pub fn to_data_mode(self) -> DataMode {
        match self {
            DataModeArg::Magnitude => DataMode::Magnitude,
            DataModeArg::FluxDensity => DataMode::FluxDensity,
        }
    }
}

/// Common arguments shared across simulation binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedSimulationArgs {
    /// Detection threshold in units of sigma
    #[arg(long, default_value_t = DEFAULT_SNR_THRESHOLD)]
    pub snr_threshold: f64,

    /// Drop pointings after this epoch
    #[arg(long)]
    pub end_time: Option<f64>,

    /// Epoch the model's time axis starts from
    #[arg(long, default_value_t = 0.0)]
    pub explosion_time: f64,

    /// Output convention of the observation table
    #[arg(long, value_enum, default_value_t = DataModeArg::Magnitude)]
    pub data_mode: DataModeArg,

    /// Random seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Root directory; results are written to <output-dir>/simulated
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Enable debug output
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

/// Load a survey cadence description from a JSON file
///
/// # Example
/// ```no_run
/// use transient_simulator::shared_args::load_survey;
/// use std::path::Path;
///
/// let survey = load_survey(Path::new("survey.json"), true)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_survey(path: &Path, debug: bool) -> Result<CadenceConfig, Box<dyn std::error::Error>> {
    if debug {
        println!("Loading survey from: {}", path.display());
    }

    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read survey from '{}': {}", path.display(), e))?;
    let survey: CadenceConfig = serde_json::from_str(&json)
        .map_err(|e| format!("Failed to parse survey '{}': {}", path.display(), e))?;
    survey.validate()?;

    if debug {
        println!("Loaded survey with {} bands", survey.bands().len());
    }

    Ok(survey)
}

/// Load a pointing table from a CSV file
pub fn load_pointings(
    path: &Path,
    debug: bool,
) -> Result<PointingTable, Box<dyn std::error::Error>> {
    if debug {
        println!("Loading pointings from: {}", path.display());
    }

    let table = PointingTable::read_csv(path)
        .map_err(|e| format!("Failed to load pointings from '{}': {}", path.display(), e))?;

    if debug {
        println!("Loaded {} pointings", table.len());
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_parsing() {
        assert_eq!(
            parse_parameter("alpha=1.5").unwrap(),
            ("alpha".to_string(), 1.5)
        );
        assert_eq!(
            parse_parameter(" log10_f0 = -2 ").unwrap(),
            ("log10_f0".to_string(), -2.0)
        );

        assert!(parse_parameter("alpha").is_err());
        assert!(parse_parameter("=1.0").is_err());
        assert!(parse_parameter("alpha=fast").is_err());
        assert!(parse_parameter("alpha=inf").is_err());
    }

    #[test]
    fn test_parameters_from_args() {
        let params = parameters_from_args(&[("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
        assert_eq!(params.get("b"), Some(2.0));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_data_mode_arg_conversion() {
        assert_eq!(DataModeArg::Magnitude.to_data_mode(), DataMode::Magnitude);
        assert_eq!(
            DataModeArg::FluxDensity.to_data_mode(),
            DataMode::FluxDensity
        );
    }

    #[test]
    fn test_load_survey_rejects_inconsistent_bands() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(
            &path,
            r#"{"start_time": 0.0,
                "num_obs": {"g": 3},
                "average_cadence": {"g": 1.0},
                "cadence_scatter": {},
                "limiting_magnitudes": {"g": 24.0}}"#,
        )
        .unwrap();

        assert!(load_survey(&path, false).is_err());
    }
}
