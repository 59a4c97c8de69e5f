//! Sidereal time and the observer's zenith

use crate::geo::{normalize_degrees, EquatorialCoordinates, LatLong, Vector3};
use crate::time::{Timestamp, JULIAN_DAY_J2000};

/// Julian centuries since J2000.0
#[inline]
pub fn julian_centuries(julian_day: f64) -> f64 {
    (julian_day - JULIAN_DAY_J2000) / 36525.0
}

/// Local mean sidereal time in degrees, [0, 360).
///
/// Meeus, Astronomical Algorithms, eq. 12.4. Longitude is east-positive.
pub fn mean_sidereal_time(t: Timestamp, longitude: f64) -> f64 {
    let jd = t.julian_day();
    let c = julian_centuries(jd);
    let c2 = c * c;
    let c3 = c2 * c;
    let gst = 280.460_618_37 + 360.985_647_366_29 * (jd - JULIAN_DAY_J2000) + 0.000_387_933 * c2
        - c3 / 38_710_000.0;
    normalize_degrees(gst + longitude)
}

/// Zenith of an observer as equatorial coordinates
pub fn zenith(t: Timestamp, location: &LatLong) -> EquatorialCoordinates {
    EquatorialCoordinates::new(mean_sidereal_time(t, location.longitude), location.latitude)
}

/// Zenith of an observer as a unit geocentric vector
pub fn zenith_vector(t: Timestamp, location: &LatLong) -> Vector3 {
    zenith(t, location).to_geocentric()
}
