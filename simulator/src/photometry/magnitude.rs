//! AB magnitude and flux density conversions
//!
//! All flux densities in this crate are expressed in millijansky (mJy).
//! Magnitudes are AB magnitudes, whose zero point is 3631 Jy at every
//! frequency.

/// Photometric constants used across the crate
pub struct AB {}

impl AB {
    /// AB magnitude system zero-point flux density
    /// Units: 3631 Jy = 3.631e6 mJy
    pub const ZERO_POINT_MJY: f64 = 3631e3;

    /// Conversion from a fractional flux error to a magnitude error: 2.5 / ln(10)
    pub const MAG_ERROR_PER_FRACTIONAL_FLUX: f64 = 1.085_736_204_758_129_6;

    /// Significance, in sigma, at which limiting magnitudes are quoted
    pub const LIMITING_MAGNITUDE_SIGMA: f64 = 5.0;
}

/// Speed of light in vacuum
/// Units: 2.99792458e8 m/s
pub const SPEED_OF_LIGHT_M_S: f64 = 2.99792458e8;

/// Convert an AB magnitude to a flux density in mJy
///
/// F_ν = F_ν,0 * 10^(-0.4 * AB)
pub fn ab_mag_to_flux_density(ab_mag: f64) -> f64 {
    AB::ZERO_POINT_MJY * 10f64.powf(-0.4 * ab_mag)
}

/// Convert a flux density in mJy to an AB magnitude
///
/// Non-positive flux has no finite magnitude and maps to `f64::INFINITY`
/// (infinitely faint).
pub fn flux_density_to_ab_mag(flux_density_mjy: f64) -> f64 {
    if flux_density_mjy <= 0.0 {
        return f64::INFINITY;
    }
    -2.5 * (flux_density_mjy / AB::ZERO_POINT_MJY).log10()
}

/// Propagate a flux density uncertainty into a magnitude uncertainty
///
/// Uses the first order approximation σ_m = (2.5 / ln 10) σ_F / F. A
/// non-positive flux yields `f64::INFINITY`.
pub fn flux_error_to_mag_error(flux_density_mjy: f64, flux_error_mjy: f64) -> f64 {
    if flux_density_mjy <= 0.0 {
        return f64::INFINITY;
    }
    AB::MAG_ERROR_PER_FRACTIONAL_FLUX * flux_error_mjy / flux_density_mjy
}

/// Convert a wavelength in nanometers to a frequency in Hz
pub fn wavelength_nm_to_frequency_hz(wavelength_nm: f64) -> f64 {
    SPEED_OF_LIGHT_M_S / (wavelength_nm * 1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_magnitude_is_zero_point() {
        assert_relative_eq!(ab_mag_to_flux_density(0.0), 3631e3, epsilon = 1e-6);
    }

    #[test]
    fn test_mag_flux_inverse() {
        for mag in [-5.0, 0.0, 12.5, 21.3, 27.0] {
            let flux = ab_mag_to_flux_density(mag);
            assert_relative_eq!(flux_density_to_ab_mag(flux), mag, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_five_magnitudes_is_factor_hundred() {
        let bright = ab_mag_to_flux_density(15.0);
        let faint = ab_mag_to_flux_density(20.0);
        assert_relative_eq!(bright / faint, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nonpositive_flux_is_infinitely_faint() {
        assert_eq!(flux_density_to_ab_mag(0.0), f64::INFINITY);
        assert_eq!(flux_density_to_ab_mag(-1.0), f64::INFINITY);
        assert_eq!(flux_error_to_mag_error(0.0, 1.0), f64::INFINITY);
    }

    #[test]
    fn test_mag_error_at_five_sigma() {
        // A 5 sigma measurement has a ~0.217 mag uncertainty
        let err = flux_error_to_mag_error(5.0, 1.0);
        assert_relative_eq!(err, 0.2171472, epsilon = 1e-6);
    }

    #[test]
    fn test_wavelength_to_frequency() {
        // 500 nm is ~6e14 Hz
        assert_relative_eq!(
            wavelength_nm_to_frequency_hz(500.0),
            5.99584916e14,
            max_relative = 1e-8
        );
    }
}
