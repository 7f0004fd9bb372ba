//! Photometry models and utilities

pub mod filters;
pub mod magnitude;

pub use filters::{Band, Filter, FILTERS};
pub use magnitude::{ab_mag_to_flux_density, flux_density_to_ab_mag, flux_error_to_mag_error, AB};
