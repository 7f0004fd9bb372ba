//! Persistence of simulation results.
//!
//! A saved simulation is a pair of files under `<root>/simulated/`:
//!
//! - `<name>.csv`: the observation table
//! - `<name>_injection_parameters.json`: the model and parameters that produced it
//!
//! Both files are first written to hidden temporary siblings and only then
//! renamed into place, so a failed save never leaves a lone table or
//! parameter file behind.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ParameterSet;
use crate::observation::{DataMode, SimulationResult};
use crate::photometry::Band;
use crate::transient::TransientData;

const SIMULATED_DIR: &str = "simulated";
const PARAMETERS_SUFFIX: &str = "_injection_parameters.json";

/// Errors raised while saving or loading simulations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid simulation name '{0}': must be non-empty and contain no path separators")]
    InvalidName(String),
    #[error("Simulation file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Column '{column}' missing from {}", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("Malformed value '{value}' in column '{column}' at row {row} of {}", .path.display())]
    MalformedValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
    #[error("Malformed parameter file {}: {source}", .path.display())]
    MalformedParameters {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error on {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

/// Contents of the parameter file saved next to an observation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionParameters {
    pub model: String,
    pub parameters: ParameterSet,
}

/// Directory layout for saved simulations
///
/// Defaults to `./simulated/`; [`SimulationStore::with_path`] picks another root.
#[derive(Debug, Clone)]
pub struct SimulationStore {
    /// Root directory; files live in `<root>/simulated`
    root_path: PathBuf,
}

impl Default for SimulationStore {
    fn default() -> Self {
        Self::with_path(PathBuf::from("."))
    }
}

impl SimulationStore {
    /// Create a store rooted at a custom path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Directory holding all saved simulations
    pub fn simulated_dir(&self) -> PathBuf {
        self.root_path.join(SIMULATED_DIR)
    }

    fn check_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Path of the observation table for `name`
    pub fn data_path(&self, name: &str) -> PathBuf {
        self.simulated_dir().join(format!("{name}.csv"))
    }

    /// Path of the parameter file for `name`
    pub fn parameters_path(&self, name: &str) -> PathBuf {
        self.simulated_dir().join(format!("{name}{PARAMETERS_SUFFIX}"))
    }

    fn hidden_sibling(path: &Path, suffix: &str) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{file_name}.{suffix}"))
    }

    /// Save a simulation result under `name`
    ///
    /// Either both new files are in place afterwards or neither is. When
    /// `name` already exists, its previous pair is kept aside until the new
    /// pair is in place and restored if the save fails.
    ///
    /// # Returns
    /// Paths of the observation table and the parameter file
    pub fn save(
        &self,
        result: &SimulationResult,
        name: &str,
    ) -> Result<(PathBuf, PathBuf), StorageError> {
        Self::check_name(name)?;

        let dir = self.simulated_dir();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let data_path = self.data_path(name);
        let parameters_path = self.parameters_path(name);
        let data_tmp = Self::hidden_sibling(&data_path, "tmp");
        let parameters_tmp = Self::hidden_sibling(&parameters_path, "tmp");

        let staged = write_table(result, &data_tmp)
            .and_then(|()| write_parameters(result, &parameters_tmp));
        if let Err(e) = staged {
            remove_quietly(&data_tmp);
            remove_quietly(&parameters_tmp);
            return Err(e);
        }

        let mut backups = Vec::with_capacity(2);
        for path in [&data_path, &parameters_path] {
            match move_aside(path) {
                Ok(Some(backup)) => backups.push((backup, path.clone())),
                Ok(None) => {}
                Err(e) => {
                    remove_quietly(&data_tmp);
                    remove_quietly(&parameters_tmp);
                    restore(&backups);
                    return Err(e);
                }
            }
        }

        for (tmp, path) in [(&data_tmp, &data_path), (&parameters_tmp, &parameters_path)] {
            if let Err(source) = fs::rename(tmp, path) {
                remove_quietly(&data_tmp);
                remove_quietly(&parameters_tmp);
                if path == &parameters_path {
                    remove_quietly(&data_path);
                }
                restore(&backups);
                return Err(StorageError::Io {
                    path: path.clone(),
                    source,
                });
            }
        }

        for (backup, _) in &backups {
            remove_quietly(backup);
        }

        info!(
            "Saved {} observations to {} and parameters to {}",
            result.len(),
            data_path.display(),
            parameters_path.display()
        );
        Ok((data_path, parameters_path))
    }

    /// Load a saved simulation, reading the value columns in `data_mode`
    pub fn load(&self, name: &str, data_mode: DataMode) -> Result<TransientData, StorageError> {
        Self::check_name(name)?;

        let data_path = self.data_path(name);
        let parameters_path = self.parameters_path(name);
        for path in [&data_path, &parameters_path] {
            if !path.is_file() {
                return Err(StorageError::MissingFile(path.clone()));
            }
        }

        let injection = read_parameters(&parameters_path)?;
        let mut data = read_table(&data_path, data_mode)?;
        data.name = name.to_string();
        data.model = injection.model;
        data.parameters = injection.parameters;

        debug!("Loaded {} observations from {}", data.len(), data_path.display());
        Ok(data)
    }

    /// Names of all complete simulations in the store
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.simulated_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StorageError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|s| s.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') && self.parameters_path(stem).is_file() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

/// Rename an existing file to a hidden backup next to it
fn move_aside(path: &Path) -> Result<Option<PathBuf>, StorageError> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = SimulationStore::hidden_sibling(path, "bak");
    fs::rename(path, &backup).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(backup))
}

/// Put backed up files back where they came from
fn restore(backups: &[(PathBuf, PathBuf)]) {
    for (backup, original) in backups {
        if let Err(e) = fs::rename(backup, original) {
            warn!(
                "Failed to restore {} from {}: {e}",
                original.display(),
                backup.display()
            );
        }
    }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> StorageError + '_ {
    move |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn write_table(result: &SimulationResult, path: &Path) -> Result<(), StorageError> {
    let mode = result.data_mode();
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;

    writer
        .write_record([
            "time",
            "band",
            mode.value_column(),
            mode.error_column(),
            "limiting_magnitude",
            "detected",
        ])
        .map_err(csv_error(path))?;

    for record in result.records() {
        writer
            .write_record([
                record.time.to_string(),
                record.band.to_string(),
                record.observed_value.to_string(),
                record.uncertainty.to_string(),
                record.limiting_magnitude.to_string(),
                u8::from(record.detected).to_string(),
            ])
            .map_err(csv_error(path))?;
    }

    writer.flush().map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_parameters(result: &SimulationResult, path: &Path) -> Result<(), StorageError> {
    let injection = InjectionParameters {
        model: result.model().to_string(),
        parameters: result.parameters().clone(),
    };
    let json = serde_json::to_string_pretty(&injection).map_err(|source| {
        StorageError::MalformedParameters {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_parameters(path: &Path) -> Result<InjectionParameters, StorageError> {
    let json = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| StorageError::MalformedParameters {
        path: path.to_path_buf(),
        source,
    })
}

/// Typed access to the cells of one CSV row
struct RowReader<'a> {
    path: &'a Path,
    row: &'a csv::StringRecord,
    row_number: usize,
}

impl<'a> RowReader<'a> {
    fn malformed(&self, column: &str, value: &str) -> StorageError {
        StorageError::MalformedValue {
            path: self.path.to_path_buf(),
            row: self.row_number,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn text(&self, col: usize, column: &str) -> Result<&'a str, StorageError> {
        self.row
            .get(col)
            .map(str::trim)
            .ok_or_else(|| self.malformed(column, ""))
    }

    fn number(&self, col: usize, column: &str) -> Result<f64, StorageError> {
        let raw = self.text(col, column)?;
        raw.parse::<f64>().map_err(|_| self.malformed(column, raw))
    }
}

fn read_table(path: &Path, mode: DataMode) -> Result<TransientData, StorageError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error(path))?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| StorageError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let time_col = column("time")?;
    let band_col = column("band")?;
    let value_col = column(mode.value_column())?;
    let error_col = column(mode.error_column())?;
    let limit_col = column("limiting_magnitude")?;
    let detected_col = column("detected")?;

    let mut data = TransientData::empty(mode);

    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(csv_error(path))?;
        let cells = RowReader {
            path,
            row: &row,
            // 1-based, excluding the header
            row_number: index + 1,
        };

        let detected_raw = cells.text(detected_col, "detected")?;
        let detected = match detected_raw.to_ascii_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => return Err(cells.malformed("detected", detected_raw)),
        };

        data.time.push(cells.number(time_col, "time")?);
        data.band.push(Band::new(cells.text(band_col, "band")?));
        data.values.push(cells.number(value_col, mode.value_column())?);
        data.errors.push(cells.number(error_col, mode.error_column())?);
        data.limiting_magnitude
            .push(cells.number(limit_col, "limiting_magnitude")?);
        data.detected.push(detected);
    }

    Ok(data)
}
