//! Survey schedules: cadence-driven pointing generation and pointing tables

pub mod cadence;
pub mod pointings;

pub use cadence::CadenceConfig;
pub use pointings::{Pointing, PointingTable};

use crate::photometry::Band;
use thiserror::Error;

/// Errors raised while building or loading a survey schedule
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Band '{band}' is missing from the '{field}' mapping")]
    MissingBand { band: Band, field: &'static str },
    #[error("Cadence configuration does not name any bands")]
    NoBands,
    #[error("Average cadence for band '{band}' must be finite and positive, got {value}")]
    InvalidCadence { band: Band, value: f64 },
    #[error("Cadence scatter for band '{band}' must be finite and non-negative, got {value}")]
    InvalidScatter { band: Band, value: f64 },
    #[error("Limiting magnitude for band '{band}' must be finite, got {value}")]
    InvalidLimitingMagnitude { band: Band, value: f64 },
    #[error("Total number of observations across bands overflows")]
    TooManyObservations,
    #[error("Invalid pointing at row {index}: {reason}")]
    InvalidPointing { index: usize, reason: String },
    #[error("Pointing table I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pointing table CSV error: {0}")]
    Csv(#[from] csv::Error),
}
