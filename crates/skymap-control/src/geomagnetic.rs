//! Main-field geomagnetic model
//!
//! Spherical-harmonic expansion of the Earth's magnetic field using the
//! WMM2020 Gauss coefficients truncated to degree 4, with linear secular
//! variation. Evaluated at sea level on a spherical Earth, which is plenty for
//! turning a compass heading into a true heading.

use skymap_core::{LatLong, Timestamp};

const MAX_DEGREE: usize = 4;

/// Model epoch, decimal year
const EPOCH: f64 = 2020.0;

struct Coefficient {
    n: usize,
    m: usize,
    g: f64,
    h: f64,
    g_dot: f64,
    h_dot: f64,
}

const fn c(n: usize, m: usize, g: f64, h: f64, g_dot: f64, h_dot: f64) -> Coefficient {
    Coefficient {
        n,
        m,
        g,
        h,
        g_dot,
        h_dot,
    }
}

/// nT and nT/year
const WMM2020: [Coefficient; 14] = [
    c(1, 0, -29404.5, 0.0, 6.7, 0.0),
    c(1, 1, -1450.7, 4652.9, 7.7, -25.1),
    c(2, 0, -2500.0, 0.0, -11.5, 0.0),
    c(2, 1, 2982.0, -2991.6, -7.1, -30.2),
    c(2, 2, 1676.8, -734.8, -2.2, -23.9),
    c(3, 0, 1363.9, 0.0, 2.8, 0.0),
    c(3, 1, -2381.0, -82.2, -6.2, 5.7),
    c(3, 2, 1236.2, 241.8, 3.4, -1.0),
    c(3, 3, 525.7, -542.9, -12.2, 1.1),
    c(4, 0, 903.1, 0.0, -1.1, 0.0),
    c(4, 1, 809.4, 282.0, -1.6, 0.2),
    c(4, 2, 86.2, -158.4, -6.0, 6.9),
    c(4, 3, -309.4, 199.8, 5.4, 3.7),
    c(4, 4, 47.9, -350.1, -5.5, -5.6),
];

type Table = [[f64; MAX_DEGREE + 1]; MAX_DEGREE + 1];

/// Factors converting Gauss-normalized Legendre functions to Schmidt
/// semi-normalized ones
fn schmidt_factors() -> Table {
    let mut s = [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1];
    s[0][0] = 1.0;
    for n in 1..=MAX_DEGREE {
        s[n][0] = s[n - 1][0] * (2 * n - 1) as f64 / n as f64;
        for m in 1..=n {
            let delta = if m == 1 { 2.0 } else { 1.0 };
            s[n][m] = s[n][m - 1] * (((n - m + 1) as f64 * delta) / (n + m) as f64).sqrt();
        }
    }
    s
}

/// Gauss-normalized associated Legendre functions of cos(colatitude) and
/// their colatitude derivatives
fn legendre(colatitude: f64) -> (Table, Table) {
    let (s, c) = colatitude.sin_cos();
    let mut p = [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1];
    let mut dp = [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1];
    p[0][0] = 1.0;

    for n in 1..=MAX_DEGREE {
        for m in 0..=n {
            if n == m {
                p[n][m] = s * p[n - 1][m - 1];
                dp[n][m] = s * dp[n - 1][m - 1] + c * p[n - 1][m - 1];
            } else if n == 1 {
                p[n][m] = c * p[n - 1][m];
                dp[n][m] = c * dp[n - 1][m] - s * p[n - 1][m];
            } else {
                let k = ((n - 1) * (n - 1) - m * m) as f64 / ((2 * n - 1) * (2 * n - 3)) as f64;
                p[n][m] = c * p[n - 1][m] - k * p[n - 2][m];
                dp[n][m] = c * dp[n - 1][m] - s * p[n - 1][m] - k * dp[n - 2][m];
            }
        }
    }
    (p, dp)
}

/// Horizontal field at one place and time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeomagneticField {
    /// Northward component, nT
    north: f64,
    /// Eastward component, nT
    east: f64,
}

impl GeomagneticField {
    pub fn new(location: &LatLong, time: Timestamp) -> Self {
        let dt = time.decimal_year() - EPOCH;
        let colatitude = (90.0 - location.latitude).to_radians();
        // Keep the east component finite at the poles
        let sin_colatitude = colatitude.sin().max(1e-9);
        let longitude = location.longitude.to_radians();

        let schmidt = schmidt_factors();
        let (p, dp) = legendre(colatitude);

        let mut north = 0.0;
        let mut east = 0.0;
        for coefficient in &WMM2020 {
            let (n, m) = (coefficient.n, coefficient.m);
            let g = schmidt[n][m] * (coefficient.g + coefficient.g_dot * dt);
            let h = schmidt[n][m] * (coefficient.h + coefficient.h_dot * dt);
            let (sin_ml, cos_ml) = (m as f64 * longitude).sin_cos();

            north += (g * cos_ml + h * sin_ml) * dp[n][m];
            east += m as f64 * (g * sin_ml - h * cos_ml) * p[n][m] / sin_colatitude;
        }

        GeomagneticField { north, east }
    }

    /// Angle from true north to magnetic north, degrees, east positive
    pub fn declination(&self) -> f64 {
        self.east.atan2(self.north).to_degrees()
    }

    /// Horizontal intensity, nT
    pub fn horizontal_intensity(&self) -> f64 {
        self.north.hypot(self.east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2024-01-01T00:00:00Z
    const JAN_2024: Timestamp = Timestamp(1_704_067_200_000);

    fn declination(latitude: f64, longitude: f64) -> f64 {
        GeomagneticField::new(&LatLong::new(latitude, longitude), JAN_2024).declination()
    }

    #[test]
    fn test_schmidt_factors() {
        let s = schmidt_factors();
        assert_eq!(s[1][0], 1.0);
        assert!((s[1][1] - 1.0).abs() < 1e-12);
        assert!((s[2][0] - 1.5).abs() < 1e-12);
        assert!((s[2][1] - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_low_degree_legendre() {
        let theta = 0.7_f64;
        let (p, dp) = legendre(theta);
        assert!((p[1][0] - theta.cos()).abs() < 1e-12);
        assert!((dp[1][0] + theta.sin()).abs() < 1e-12);
        assert!((p[1][1] - theta.sin()).abs() < 1e-12);
        assert!((dp[1][1] - theta.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_declination_signs_across_north_america() {
        // West coast points east of true north, east coast west of it
        let san_francisco = declination(37.77, -122.42);
        assert!(san_francisco > 5.0 && san_francisco < 20.0, "{san_francisco}");

        let new_york = declination(40.7, -74.0);
        assert!(new_york > -20.0 && new_york < -5.0, "{new_york}");
    }

    #[test]
    fn test_declination_small_near_greenwich() {
        let london = declination(51.5, -0.13);
        assert!(london.abs() < 5.0, "{london}");
    }

    #[test]
    fn test_field_is_finite_at_poles() {
        for latitude in [90.0, -90.0] {
            let field = GeomagneticField::new(&LatLong::new(latitude, 0.0), JAN_2024);
            assert!(field.declination().is_finite());
            assert!(field.horizontal_intensity().is_finite());
        }
    }

    #[test]
    fn test_secular_variation_is_slow() {
        let here = LatLong::new(37.77, -122.42);
        let a = GeomagneticField::new(&here, Timestamp(1_577_836_800_000)).declination();
        let b = GeomagneticField::new(&here, JAN_2024).declination();
        assert!((a - b).abs() < 2.0);
    }

    #[test]
    fn test_horizontal_intensity_magnitude() {
        // Equatorial horizontal field is tens of microtesla
        let field = GeomagneticField::new(&LatLong::new(0.0, 0.0), JAN_2024);
        let h = field.horizontal_intensity();
        assert!(h > 15_000.0 && h < 45_000.0, "{h}");
    }
}
