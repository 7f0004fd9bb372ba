//! Photometric filter identifiers and their effective wavelengths
//!
//! A [`Band`] is a categorical filter label as it appears in a pointing
//! table (`"g"`, `"ztfr"`, `"V"`, ...). Models that depend on the observing
//! frequency resolve the label against the built-in [`FILTERS`] table.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::magnitude::wavelength_nm_to_frequency_hz;

/// Categorical filter identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Band(String);

impl Band {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Effective frequency of this filter in Hz, if the filter is known
    pub fn frequency_hz(&self) -> Option<f64> {
        FILTERS.get(self.as_str()).map(|f| f.frequency_hz())
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Band {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Band {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A photometric filter reduced to its effective wavelength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    /// Effective wavelength in nanometers
    pub effective_wavelength_nm: f64,
}

impl Filter {
    pub const fn new(effective_wavelength_nm: f64) -> Self {
        Self {
            effective_wavelength_nm,
        }
    }

    pub fn frequency_hz(&self) -> f64 {
        wavelength_nm_to_frequency_hz(self.effective_wavelength_nm)
    }
}

/// Built-in filters keyed by band label
pub static FILTERS: Lazy<HashMap<&'static str, Filter>> = Lazy::new(|| {
    HashMap::from([
        // SDSS / LSST
        ("u", Filter::new(354.3)),
        ("g", Filter::new(477.0)),
        ("r", Filter::new(623.1)),
        ("i", Filter::new(762.5)),
        ("z", Filter::new(913.4)),
        ("y", Filter::new(1004.0)),
        // ZTF
        ("ztfg", Filter::new(472.3)),
        ("ztfr", Filter::new(633.3)),
        ("ztfi", Filter::new(788.7)),
        // Bessell
        ("B", Filter::new(445.0)),
        ("V", Filter::new(551.0)),
        ("R", Filter::new(658.0)),
        ("I", Filter::new(806.0)),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_band_frequency() {
        let g = Band::new("g");
        let freq = g.frequency_hz().unwrap();
        assert!(freq > 6.0e14 && freq < 6.5e14, "g-band frequency {freq}");
    }

    #[test]
    fn test_unknown_band_has_no_frequency() {
        assert!(Band::new("not-a-filter").frequency_hz().is_none());
    }

    #[test]
    fn test_bluer_filters_have_higher_frequency() {
        let u = Band::from("u").frequency_hz().unwrap();
        let z = Band::from("z").frequency_hz().unwrap();
        assert!(u > z);
    }

    #[test]
    fn test_band_serializes_as_plain_string() {
        let json = serde_json::to_string(&Band::new("ztfr")).unwrap();
        assert_eq!(json, "\"ztfr\"");
    }
}
