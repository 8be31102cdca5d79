//! Redshift to luminosity distance conversion.

use once_cell::sync::Lazy;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Simpson intervals used for the comoving distance integral.
const INTEGRATION_STEPS: usize = 256;

/// Flat ΛCDM cosmology without radiation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatLambdaCdm {
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    /// Matter density parameter; dark energy is `1 - omega_m`.
    pub omega_m: f64,
}

/// WMAP nine-year parameters.
pub static WMAP9: Lazy<FlatLambdaCdm> = Lazy::new(|| FlatLambdaCdm::new(69.32, 0.2865));

impl FlatLambdaCdm {
    pub fn new(h0: f64, omega_m: f64) -> Self {
        Self { h0, omega_m }
    }

    pub fn hubble_distance_mpc(&self) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.h0
    }

    fn inv_efunc(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        let e2 = self.omega_m * zp1 * zp1 * zp1 + (1.0 - self.omega_m);
        1.0 / e2.sqrt()
    }

    /// Line-of-sight comoving distance in Mpc.
    pub fn comoving_distance_mpc(&self, z: f64) -> f64 {
        if z == 0.0 {
            return 0.0;
        }
        let n = INTEGRATION_STEPS;
        let h = z / n as f64;
        let mut sum = self.inv_efunc(0.0) + self.inv_efunc(z);
        for i in 1..n {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.inv_efunc(i as f64 * h);
        }
        self.hubble_distance_mpc() * sum * h / 3.0
    }

    /// Luminosity distance in Mpc.
    pub fn luminosity_distance_mpc(&self, z: f64) -> f64 {
        (1.0 + z) * self.comoving_distance_mpc(z)
    }

    /// Luminosity distance for a recession velocity `cz` in km/s.
    pub fn distance_from_velocity_mpc(&self, cz_km_s: f64) -> f64 {
        self.luminosity_distance_mpc(cz_km_s / SPEED_OF_LIGHT_KM_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_redshift() {
        assert_eq!(WMAP9.luminosity_distance_mpc(0.0), 0.0);
    }

    #[test]
    fn test_low_redshift_matches_series() {
        // D_L ≈ (c/H0) (1 + z) (z - 3/4 Ωm z²) for small z.
        let z: f64 = 0.01;
        let expected = WMAP9.hubble_distance_mpc()
            * (1.0 + z)
            * (z - 0.75 * WMAP9.omega_m * z * z);
        assert_abs_diff_eq!(WMAP9.luminosity_distance_mpc(z), expected, epsilon = 0.01);
        assert_abs_diff_eq!(WMAP9.luminosity_distance_mpc(z), 43.586, epsilon = 0.01);
    }

    #[test]
    fn test_velocity_conversion() {
        let d = WMAP9.distance_from_velocity_mpc(2953.0);
        assert!(d > 42.0 && d < 44.0, "d = {}", d);
    }

    #[test]
    fn test_einstein_de_sitter_closed_form() {
        // Ωm = 1: D_C = 2 (c/H0) (1 - 1/sqrt(1+z))
        let eds = FlatLambdaCdm::new(70.0, 1.0);
        let z: f64 = 1.0;
        let expected = 2.0 * eds.hubble_distance_mpc() * (1.0 - 1.0 / (1.0 + z).sqrt());
        assert_abs_diff_eq!(eds.comoving_distance_mpc(z), expected, epsilon = 1e-6);
    }
}
