//! Noise injection and detection classification for simulated photometry.
//!
//! Every observation is simulated in flux density space. The pointing's
//! limiting magnitude is taken to be a 5σ depth, which fixes the 1σ flux
//! uncertainty of that observation:
//!
//! ```text
//! F_lim = F_AB,0 × 10^(-0.4 m_lim)        σ = F_lim / 5
//! F_obs ~ Normal(F_true, σ)
//! SNR   = max(F_obs, 0) / σ
//! detected ⇔ SNR ≥ threshold
//! ```
//!
//! The fractional uncertainty σ / F therefore grows as the source
//! approaches the limiting magnitude. Degenerate inputs are resolved by
//! formula rather than by error:
//!
//! - σ ≤ 0: SNR is `+∞` for a positive flux and `0` otherwise.
//! - threshold ≤ 0: every observation is detected, since SNR is never negative.
//!
//! Sources fainter than the limit before noise still get a noise draw, so a
//! marginal source can scatter above or below threshold.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::observation::DataMode;
use crate::photometry::{ab_mag_to_flux_density, flux_density_to_ab_mag, flux_error_to_mag_error, AB};

/// Default detection threshold in units of σ
pub const DEFAULT_SNR_THRESHOLD: f64 = 5.0;

/// Flux density in mJy corresponding to a limiting magnitude
pub fn limiting_flux_density(limiting_magnitude: f64) -> f64 {
    ab_mag_to_flux_density(limiting_magnitude)
}

/// 1σ flux density uncertainty of an observation with the given 5σ depth
pub fn flux_uncertainty(limiting_magnitude: f64) -> f64 {
    limiting_flux_density(limiting_magnitude) / AB::LIMITING_MAGNITUDE_SIGMA
}

/// Signal-to-noise ratio of a measured flux, never negative
pub fn signal_to_noise(flux: f64, sigma: f64) -> f64 {
    if sigma > 0.0 {
        flux.max(0.0) / sigma
    } else if flux > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Outcome of one noisy observation, in flux density space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Flux density after noise injection (mJy)
    pub flux: f64,
    /// 1σ flux density uncertainty (mJy)
    pub flux_error: f64,
    /// Signal-to-noise of `flux` against `flux_error`
    pub snr: f64,
    pub detected: bool,
}

impl Measurement {
    /// Value and uncertainty reported for this observation
    ///
    /// Detections report the noisy measurement. Non-detections report the
    /// limit itself (limiting magnitude, or its flux density) with the 1σ
    /// uncertainty at the limit.
    pub fn reported(&self, limiting_magnitude: f64, mode: DataMode) -> (f64, f64) {
        match (mode, self.detected) {
            (DataMode::FluxDensity, true) => (self.flux, self.flux_error),
            (DataMode::FluxDensity, false) => {
                (limiting_flux_density(limiting_magnitude), self.flux_error)
            }
            (DataMode::Magnitude, true) => (
                flux_density_to_ab_mag(self.flux),
                flux_error_to_mag_error(self.flux, self.flux_error),
            ),
            (DataMode::Magnitude, false) => (
                limiting_magnitude,
                AB::MAG_ERROR_PER_FRACTIONAL_FLUX / AB::LIMITING_MAGNITUDE_SIGMA,
            ),
        }
    }
}

/// Injects photometric noise and classifies detections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEngine {
    snr_threshold: f64,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SNR_THRESHOLD)
    }
}

impl DetectionEngine {
    /// Create an engine that detects at or above `snr_threshold` σ
    ///
    /// Zero and negative thresholds are valid and detect everything.
    pub fn new(snr_threshold: f64) -> Self {
        Self { snr_threshold }
    }

    pub fn snr_threshold(&self) -> f64 {
        self.snr_threshold
    }

    pub fn is_detected(&self, snr: f64) -> bool {
        snr >= self.snr_threshold
    }

    /// Simulate one observation of a source with noiseless flux `true_flux`
    ///
    /// # Arguments
    /// * `true_flux` - Noiseless model flux density in mJy
    /// * `limiting_magnitude` - 5σ depth of the observation
    /// * `rng` - Noise source; no draw is made when the uncertainty is zero
    pub fn observe<R: Rng + ?Sized>(
        &self,
        true_flux: f64,
        limiting_magnitude: f64,
        rng: &mut R,
    ) -> Measurement {
        let flux_error = flux_uncertainty(limiting_magnitude);

        let flux = match Normal::new(true_flux, flux_error) {
            Ok(normal) if flux_error > 0.0 => normal.sample(rng),
            _ => true_flux,
        };

        let snr = signal_to_noise(flux, flux_error);
        Measurement {
            flux,
            flux_error,
            snr,
            detected: self.is_detected(snr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_source_at_limit_is_five_sigma() {
        let m_lim = 23.0;
        let flux = limiting_flux_density(m_lim);
        assert_relative_eq!(signal_to_noise(flux, flux_uncertainty(m_lim)), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bright_source_always_detected() {
        let engine = DetectionEngine::default();
        let mut rng = StdRng::seed_from_u64(11);
        let flux = ab_mag_to_flux_density(15.0);

        for _ in 0..1000 {
            let m = engine.observe(flux, 24.0, &mut rng);
            assert!(m.detected, "snr {}", m.snr);
        }
    }

    #[test]
    fn test_dark_source_never_detected() {
        let engine = DetectionEngine::default();
        let mut rng = StdRng::seed_from_u64(12);

        for _ in 0..1000 {
            let m = engine.observe(0.0, 22.0, &mut rng);
            assert!(!m.detected, "snr {}", m.snr);
        }
    }

    #[test]
    fn test_zero_threshold_always_detects() {
        let engine = DetectionEngine::new(0.0);
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..1000 {
            assert!(engine.observe(0.0, 22.0, &mut rng).detected);
        }
    }

    #[test]
    fn test_negative_threshold_always_detects() {
        let engine = DetectionEngine::new(-3.0);
        let mut rng = StdRng::seed_from_u64(14);
        assert!(engine.observe(0.0, 20.0, &mut rng).detected);
    }

    #[test]
    fn test_zero_uncertainty_is_deterministic() {
        assert_eq!(signal_to_noise(1.0, 0.0), f64::INFINITY);
        assert_eq!(signal_to_noise(0.0, 0.0), 0.0);
        assert_eq!(signal_to_noise(-1.0, -2.0), 0.0);
    }

    #[test]
    fn test_infinitely_deep_limit_has_no_noise() {
        // m_lim = +inf gives zero flux uncertainty: no draw, infinite SNR
        let engine = DetectionEngine::default();
        let mut rng = StdRng::seed_from_u64(15);

        let m = engine.observe(2.0, f64::INFINITY, &mut rng);

        assert_eq!(m.flux, 2.0);
        assert_eq!(m.flux_error, 0.0);
        assert!(m.detected);
    }

    #[test]
    fn test_marginal_source_scatters_both_ways() {
        // A source right at the 5σ limit is detected about half the time
        let engine = DetectionEngine::default();
        let mut rng = StdRng::seed_from_u64(16);
        let flux = limiting_flux_density(22.0);

        let detected = (0..2000)
            .filter(|_| engine.observe(flux, 22.0, &mut rng).detected)
            .count();

        assert!(detected > 800 && detected < 1200, "detected {detected}/2000");
    }

    #[test]
    fn test_noise_matches_uncertainty() {
        let engine = DetectionEngine::default();
        let mut rng = StdRng::seed_from_u64(17);
        let true_flux = 0.05;
        let sigma = flux_uncertainty(21.0);

        let samples: Vec<f64> = (0..20000)
            .map(|_| engine.observe(true_flux, 21.0, &mut rng).flux)
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert_relative_eq!(mean, true_flux, max_relative = 0.02);
        assert_relative_eq!(var.sqrt(), sigma, max_relative = 0.03);
    }

    #[test]
    fn test_non_detection_reports_limit() {
        let m = Measurement {
            flux: 1e-6,
            flux_error: 1e-3,
            snr: 0.001,
            detected: false,
        };

        let (mag, mag_err) = m.reported(23.5, DataMode::Magnitude);
        assert_eq!(mag, 23.5);
        assert_relative_eq!(mag_err, 0.2171472, epsilon = 1e-6);

        let (flux, flux_err) = m.reported(23.5, DataMode::FluxDensity);
        assert_eq!(flux, limiting_flux_density(23.5));
        assert_eq!(flux_err, 1e-3);
    }

    #[test]
    fn test_detection_reports_measurement() {
        let m = Measurement {
            flux: ab_mag_to_flux_density(20.0),
            flux_error: ab_mag_to_flux_density(20.0) / 10.0,
            snr: 10.0,
            detected: true,
        };

        let (mag, mag_err) = m.reported(23.0, DataMode::Magnitude);
        assert_relative_eq!(mag, 20.0, epsilon = 1e-10);
        assert_relative_eq!(mag_err, 0.10857362, epsilon = 1e-6);
    }

    proptest! {
        #[test]
        fn detected_iff_snr_reaches_threshold(
            seed in any::<u64>(),
            magnitude in 14.0f64..30.0,
            limiting_magnitude in 18.0f64..26.0,
            threshold in prop_oneof![Just(0.0), -5.0f64..20.0],
        ) {
            let engine = DetectionEngine::new(threshold);
            let mut rng = StdRng::seed_from_u64(seed);

            let m = engine.observe(ab_mag_to_flux_density(magnitude), limiting_magnitude, &mut rng);

            prop_assert!(m.snr >= 0.0);
            prop_assert_eq!(m.detected, m.snr >= threshold);
            prop_assert_eq!(m.snr, signal_to_noise(m.flux, m.flux_error));
            if threshold <= 0.0 {
                prop_assert!(m.detected);
            }
        }
    }
}
