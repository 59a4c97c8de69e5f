//! Geographic and celestial coordinate primitives
//!
//! Celestial directions are unit vectors in the geocentric equatorial frame:
//! x towards RA 0h on the equator, z towards the north celestial pole.

use nalgebra::{Rotation3, Unit};
use serde::{Deserialize, Serialize};

use crate::{SkyMapError, SkyMapResult};

/// 3-vector used for every direction in the workspace
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix used for frame changes
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Observer position on Earth, degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLong {
    /// Unchecked constructor; latitude is clamped into [-90, 90]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LatLong {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude,
        }
    }

    /// Constructor for values coming from user input
    pub fn checked(latitude: f64, longitude: f64) -> SkyMapResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SkyMapError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=360.0).contains(&longitude) {
            return Err(SkyMapError::InvalidLongitude(longitude));
        }
        Ok(LatLong {
            latitude,
            longitude,
        })
    }

    /// Angular distance to another position, degrees
    pub fn distance_from(&self, other: &LatLong) -> f64 {
        let a = EquatorialCoordinates::new(self.longitude, self.latitude).to_geocentric();
        let b = EquatorialCoordinates::new(other.longitude, other.latitude).to_geocentric();
        a.dot(&b).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Right ascension and declination, degrees
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EquatorialCoordinates {
    pub ra: f64,
    pub dec: f64,
}

impl EquatorialCoordinates {
    pub fn new(ra: f64, dec: f64) -> Self {
        EquatorialCoordinates { ra, dec }
    }

    /// Unit vector for this direction
    pub fn to_geocentric(&self) -> Vector3 {
        let ra = self.ra.to_radians();
        let dec = self.dec.to_radians();
        Vector3::new(ra.cos() * dec.cos(), ra.sin() * dec.cos(), dec.sin())
    }

    /// Inverse of [`to_geocentric`](Self::to_geocentric); `v` need not be normalized
    pub fn from_geocentric(v: &Vector3) -> Self {
        let norm = v.norm();
        if norm == 0.0 {
            return EquatorialCoordinates::default();
        }
        let dec = (v.z / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let ra = normalize_degrees(v.y.atan2(v.x).to_degrees());
        EquatorialCoordinates { ra, dec }
    }
}

/// Normalize an angle into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let remainder = angle % 360.0;
    if remainder < 0.0 {
        remainder + 360.0
    } else {
        remainder
    }
}

/// Rotation by `degrees` about `axis`, clockwise when looking along the axis
/// from its tip.
///
/// This is the sense used throughout the pointing code: applying it with the
/// magnetic declination about the zenith turns true north towards the east.
pub fn rotation_about(axis: &Vector3, degrees: f64) -> Matrix3 {
    match Unit::try_new(*axis, f64::EPSILON) {
        Some(axis) => Rotation3::from_axis_angle(&axis, -degrees.to_radians()).into_inner(),
        None => Matrix3::identity(),
    }
}

/// Normalize in place, leaving zero vectors untouched
pub fn normalized_or_self(v: Vector3) -> Vector3 {
    v.try_normalize(f64::EPSILON).unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equatorial_roundtrip() {
        let c = EquatorialCoordinates::new(123.0, -45.0);
        let back = EquatorialCoordinates::from_geocentric(&c.to_geocentric());
        assert!((back.ra - 123.0).abs() < 1e-9);
        assert!((back.dec + 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_checked_latlong_rejects_out_of_range() {
        assert!(LatLong::checked(91.0, 0.0).is_err());
        assert!(LatLong::checked(0.0, f64::NAN).is_err());
        assert!(LatLong::checked(51.5, -0.1).is_ok());
    }

    #[test]
    fn test_distance_from() {
        let a = LatLong::new(0.0, 0.0);
        let b = LatLong::new(0.0, 90.0);
        assert!((a.distance_from(&b) - 90.0).abs() < 1e-9);
        assert!(a.distance_from(&a).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_turns_north_towards_east() {
        let north = Vector3::new(1.0, 0.0, 0.0);
        let up = Vector3::new(0.0, 1.0, 0.0);
        let east = north.cross(&up);

        let rotated = rotation_about(&up, 90.0) * north;
        assert!((rotated - east).norm() < 1e-12);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-30.0), 330.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_rotation_preserves_length(
            x in -10.0f64..10.0, y in -10.0f64..10.0, z in -10.0f64..10.0,
            degrees in -720.0f64..720.0,
        ) {
            let v = Vector3::new(x, y, z);
            let axis = Vector3::new(0.3, -0.2, 0.9);
            let rotated = rotation_about(&axis, degrees) * v;
            prop_assert!((rotated.norm() - v.norm()).abs() < 1e-9);
            prop_assert!((rotated.dot(&axis) - v.dot(&axis)).abs() < 1e-9);
        }

        #[test]
        fn prop_geocentric_is_unit_length(ra in -360.0f64..720.0, dec in -90.0f64..=90.0) {
            let v = EquatorialCoordinates::new(ra, dec).to_geocentric();
            prop_assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }
}
