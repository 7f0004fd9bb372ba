//! Cadence-driven generation of survey pointings.
//!
//! Each band is scheduled independently: starting at the survey start time,
//! every subsequent epoch is the previous epoch plus the band's average
//! cadence plus a zero-mean Gaussian perturbation with the band's scatter.
//! The per-band schedules are then merged into one time-ordered table.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::pointings::{Pointing, PointingTable};
use super::SurveyError;
use crate::photometry::Band;

/// Per-band cadence statistics describing a survey schedule
///
/// The four per-band mappings must name exactly the same bands; a band
/// present in one mapping and absent from another is a configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Epoch of the first observation in every band (e.g. MJD)
    pub start_time: f64,
    /// Right ascension of the field in degrees
    #[serde(default)]
    pub ra_deg: f64,
    /// Declination of the field in degrees
    #[serde(default)]
    pub dec_deg: f64,
    /// Number of observations per band
    pub num_obs: BTreeMap<Band, usize>,
    /// Mean spacing between consecutive observations per band
    pub average_cadence: BTreeMap<Band, f64>,
    /// Standard deviation of the spacing per band
    pub cadence_scatter: BTreeMap<Band, f64>,
    /// 5σ limiting magnitude per band
    pub limiting_magnitudes: BTreeMap<Band, f64>,
}

impl CadenceConfig {
    /// Create an empty configuration starting at `start_time`
    pub fn new(start_time: f64) -> Self {
        Self {
            start_time,
            ra_deg: 0.0,
            dec_deg: 0.0,
            num_obs: BTreeMap::new(),
            average_cadence: BTreeMap::new(),
            cadence_scatter: BTreeMap::new(),
            limiting_magnitudes: BTreeMap::new(),
        }
    }

    /// Set the fixed sky position of the field
    pub fn with_coordinates(mut self, ra_deg: f64, dec_deg: f64) -> Self {
        self.ra_deg = ra_deg;
        self.dec_deg = dec_deg;
        self
    }

    /// Add a band to all four mappings at once
    pub fn with_band(
        mut self,
        band: impl Into<Band>,
        num_obs: usize,
        average_cadence: f64,
        cadence_scatter: f64,
        limiting_magnitude: f64,
    ) -> Self {
        let band = band.into();
        self.num_obs.insert(band.clone(), num_obs);
        self.average_cadence.insert(band.clone(), average_cadence);
        self.cadence_scatter.insert(band.clone(), cadence_scatter);
        self.limiting_magnitudes.insert(band, limiting_magnitude);
        self
    }

    /// All bands named by any of the per-band mappings
    pub fn bands(&self) -> BTreeSet<Band> {
        self.num_obs
            .keys()
            .chain(self.average_cadence.keys())
            .chain(self.cadence_scatter.keys())
            .chain(self.limiting_magnitudes.keys())
            .cloned()
            .collect()
    }

    /// Check that the per-band mappings are consistent and physically sensible
    pub fn validate(&self) -> Result<(), SurveyError> {
        let bands = self.bands();
        if bands.is_empty() {
            return Err(SurveyError::NoBands);
        }

        for band in &bands {
            let missing = |field: &'static str| SurveyError::MissingBand {
                band: band.clone(),
                field,
            };
            if !self.num_obs.contains_key(band) {
                return Err(missing("num_obs"));
            }
            let cadence = *self
                .average_cadence
                .get(band)
                .ok_or_else(|| missing("average_cadence"))?;
            let scatter = *self
                .cadence_scatter
                .get(band)
                .ok_or_else(|| missing("cadence_scatter"))?;
            let limiting_mag = *self
                .limiting_magnitudes
                .get(band)
                .ok_or_else(|| missing("limiting_magnitudes"))?;

            if !cadence.is_finite() || cadence <= 0.0 {
                return Err(SurveyError::InvalidCadence {
                    band: band.clone(),
                    value: cadence,
                });
            }
            if !scatter.is_finite() || scatter < 0.0 {
                return Err(SurveyError::InvalidScatter {
                    band: band.clone(),
                    value: scatter,
                });
            }
            if !limiting_mag.is_finite() {
                return Err(SurveyError::InvalidLimitingMagnitude {
                    band: band.clone(),
                    value: limiting_mag,
                });
            }
        }

        self.num_obs
            .values()
            .try_fold(0usize, |total, &n| total.checked_add(n))
            .ok_or(SurveyError::TooManyObservations)?;

        if !self.start_time.is_finite() {
            return Err(SurveyError::InvalidPointing {
                index: 0,
                reason: format!("survey start time must be finite, got {}", self.start_time),
            });
        }

        Ok(())
    }

    /// Generate the pointing table for this schedule
    ///
    /// Validation happens before any random draw. A band with zero scatter
    /// consumes no randomness and is perfectly periodic.
    ///
    /// # Arguments
    /// * `rng` - Source of the cadence perturbations
    ///
    /// # Returns
    /// Pointings for every band, merged and ordered by time
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PointingTable, SurveyError> {
        self.validate()?;

        let mut pointings = Vec::new();

        for (band, &count) in &self.num_obs {
            // Presence of the remaining keys was checked by validate()
            let cadence = self.average_cadence[band];
            let scatter = self.cadence_scatter[band];
            let limiting_magnitude = self.limiting_magnitudes[band];

            let jitter = if scatter > 0.0 {
                Some(Normal::new(0.0, scatter).map_err(|_| SurveyError::InvalidScatter {
                    band: band.clone(),
                    value: scatter,
                })?)
            } else {
                None
            };

            let mut time = self.start_time;
            for _ in 0..count {
                pointings.push(Pointing {
                    time,
                    band: band.clone(),
                    limiting_magnitude,
                    cadence: Some(cadence),
                });
                let perturbation = match &jitter {
                    Some(normal) => normal.sample(rng),
                    None => 0.0,
                };
                time += cadence + perturbation;
            }

            debug!(
                "Scheduled {count} pointings in band {band} (cadence {cadence}, scatter {scatter})"
            );
        }

        PointingTable::with_coordinates(pointings, self.ra_deg, self.dec_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn band_times(table: &PointingTable, band: &str) -> Vec<f64> {
        table
            .iter()
            .filter(|p| p.band.as_str() == band)
            .map(|p| p.time)
            .collect()
    }

    #[test]
    fn test_zero_scatter_is_periodic() {
        let config = CadenceConfig::new(0.0).with_band("g", 5, 2.0, 0.0, 24.0);
        let mut rng = StdRng::seed_from_u64(1);

        let table = config.generate(&mut rng).unwrap();

        assert_eq!(band_times(&table, "g"), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!(table.iter().all(|p| p.limiting_magnitude == 24.0));
    }

    #[test]
    fn test_zero_scatter_spacing_matches_cadence() {
        let config = CadenceConfig::new(59000.5)
            .with_band("r", 20, 0.75, 0.0, 23.0)
            .with_band("i", 7, 3.0, 0.0, 22.5);
        let mut rng = StdRng::seed_from_u64(7);

        let table = config.generate(&mut rng).unwrap();

        for (band, cadence) in [("r", 0.75), ("i", 3.0)] {
            let times = band_times(&table, band);
            for pair in times.windows(2) {
                assert!(((pair[1] - pair[0]) - cadence).abs() < 1e-9);
            }
        }
        assert_eq!(table.len(), 27);
    }

    #[test]
    fn test_table_is_time_ordered() {
        let config = CadenceConfig::new(0.0)
            .with_band("g", 30, 1.0, 0.3, 24.0)
            .with_band("r", 30, 1.5, 0.5, 23.5);
        let mut rng = StdRng::seed_from_u64(42);

        let table = config.generate(&mut rng).unwrap();

        let times: Vec<f64> = table.iter().map(|p| p.time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_scatter_perturbs_spacing() {
        let config = CadenceConfig::new(0.0).with_band("g", 50, 2.0, 0.5, 24.0);
        let mut rng = StdRng::seed_from_u64(3);

        let times = band_times(&config.generate(&mut rng).unwrap(), "g");
        let spacings: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = spacings.iter().sum::<f64>() / spacings.len() as f64;

        assert!(spacings.iter().any(|s| (s - 2.0).abs() > 1e-6));
        assert!((mean - 2.0).abs() < 0.3, "mean spacing {mean}");
    }

    #[test]
    fn test_same_seed_reproduces_schedule() {
        let config = CadenceConfig::new(0.0).with_band("g", 10, 1.0, 0.2, 24.0);

        let a = config.generate(&mut StdRng::seed_from_u64(9)).unwrap();
        let b = config.generate(&mut StdRng::seed_from_u64(9)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_band_in_one_mapping() {
        let mut config = CadenceConfig::new(0.0).with_band("g", 5, 2.0, 0.0, 24.0);
        config.cadence_scatter.clear();

        let err = config.generate(&mut StdRng::seed_from_u64(0)).unwrap_err();

        assert!(matches!(
            err,
            SurveyError::MissingBand { ref band, field: "cadence_scatter" } if band.as_str() == "g"
        ));
    }

    #[test]
    fn test_band_only_in_limits_is_rejected() {
        let mut config = CadenceConfig::new(0.0).with_band("g", 5, 2.0, 0.0, 24.0);
        config.limiting_magnitudes.insert(Band::new("r"), 23.0);

        let err = config.validate().unwrap_err();

        assert!(matches!(
            err,
            SurveyError::MissingBand { ref band, field: "num_obs" } if band.as_str() == "r"
        ));
    }

    #[test]
    fn test_empty_config_is_rejected() {
        assert!(matches!(
            CadenceConfig::new(0.0).validate(),
            Err(SurveyError::NoBands)
        ));
    }

    #[test]
    fn test_negative_scatter_is_rejected() {
        let config = CadenceConfig::new(0.0).with_band("g", 5, 2.0, -0.1, 24.0);
        assert!(matches!(
            config.validate(),
            Err(SurveyError::InvalidScatter { .. })
        ));
    }

    #[test]
    fn test_overflowing_observation_count_is_rejected() {
        let config = CadenceConfig::new(0.0)
            .with_band("g", usize::MAX, 1.0, 0.0, 24.0)
            .with_band("r", 1, 1.0, 0.0, 24.0);

        assert!(matches!(
            config.generate(&mut StdRng::seed_from_u64(0)),
            Err(SurveyError::TooManyObservations)
        ));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "start_time": 60000.0,
            "num_obs": {"g": 3, "r": 2},
            "average_cadence": {"g": 1.0, "r": 2.0},
            "cadence_scatter": {"g": 0.0, "r": 0.0},
            "limiting_magnitudes": {"g": 24.5, "r": 24.0}
        }"#;

        let config: CadenceConfig = serde_json::from_str(json).unwrap();
        let table = config.generate(&mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(band_times(&table, "r"), vec![60000.0, 60002.0]);
    }
}
