//! Error types for SkyMap

use thiserror::Error;

/// Core SkyMap errors
///
/// None of these cross the per-frame query boundary: clocks and pointing
/// queries are infallible, and sensor-path errors are logged and dropped.
#[derive(Error, Debug)]
pub enum SkyMapError {
    // Location errors
    #[error("Latitude out of range: {0}")]
    InvalidLatitude(f64),

    #[error("Longitude out of range: {0}")]
    InvalidLongitude(f64),

    // Configuration errors
    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    // Sensor errors
    #[error("Degenerate {sensor} vector: squared length {length2}")]
    DegenerateSensorVector { sensor: &'static str, length2: f64 },
}

impl From<serde_json::Error> for SkyMapError {
    fn from(err: serde_json::Error) -> Self {
        SkyMapError::InvalidPreferences(err.to_string())
    }
}

/// Result type for SkyMap operations
pub type SkyMapResult<T> = Result<T, SkyMapError>;
