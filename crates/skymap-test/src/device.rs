//! Simulated phone - sensor readings with configurable noise
//!
//! The phone is held upright with the screen vertical, turned some heading
//! east of magnetic north. Readings use the pointing model's phone frame:
//! x to the right, y up the screen, z out of the screen, acceleration
//! pointing down and the raw compass z axis reversed.

use std::time::Duration;

use nalgebra::{Matrix3, Rotation3, UnitQuaternion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skymap_control::{SensorEvent, SensorKind};
use skymap_core::normalize_degrees;

pub const STANDARD_GRAVITY: f32 = 9.81;

/// Noise added to each reading
#[derive(Clone, Debug, PartialEq)]
pub struct SensorNoiseModel {
    /// Uniform noise per accelerometer component (m/s²)
    pub accelerometer: f32,
    /// Uniform noise per compass component, relative to the horizontal field
    pub magnetic_field: f32,
    /// Uniform heading noise of the fused rotation vector (degrees)
    pub heading_degrees: f64,
}

impl SensorNoiseModel {
    pub fn new(accelerometer: f32, magnetic_field: f32, heading_degrees: f64) -> Self {
        SensorNoiseModel {
            accelerometer,
            magnetic_field,
            heading_degrees,
        }
    }

    /// Noise-free sensors
    pub fn perfect() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Phone resting on a tripod
    pub fn quiet() -> Self {
        Self::new(0.02, 0.005, 0.05)
    }

    /// Phone held at arm's length
    pub fn typical() -> Self {
        Self::new(0.15, 0.03, 0.3)
    }

    /// Cold hands, or a nearby car
    pub fn shaky() -> Self {
        Self::new(0.6, 0.1, 1.5)
    }

    fn sample(amplitude: f32, rng: &mut StdRng) -> f32 {
        if amplitude > 0.0 {
            rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        }
    }
}

/// A phone producing readings for whichever sensors are registered
pub struct SimulatedDevice {
    /// Degrees east of magnetic north
    heading: f64,
    /// Degrees per second
    pan_rate: f64,
    /// Downward field component relative to the horizontal one
    dip: f32,
    noise: SensorNoiseModel,
    rng: StdRng,
}

impl SimulatedDevice {
    pub fn new(heading: f64, noise: SensorNoiseModel, seed: u64) -> Self {
        SimulatedDevice {
            heading: normalize_degrees(heading),
            pan_rate: 0.0,
            dip: 0.5,
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Keep turning at `degrees_per_second` as time advances
    pub fn with_pan_rate(mut self, degrees_per_second: f64) -> Self {
        self.pan_rate = degrees_per_second;
        self
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn set_pan_rate(&mut self, degrees_per_second: f64) {
        self.pan_rate = degrees_per_second;
    }

    pub fn advance(&mut self, dt: Duration) {
        self.heading = normalize_degrees(self.heading + self.pan_rate * dt.as_secs_f64());
    }

    /// One reading per registered sensor, in registration order
    pub fn events(&mut self, registered: &[SensorKind]) -> Vec<SensorEvent> {
        registered
            .iter()
            .map(|kind| match kind {
                SensorKind::Accelerometer => self.accelerometer(),
                SensorKind::MagneticField => self.magnetic_field(),
                SensorKind::RotationVector => self.rotation_vector(),
            })
            .collect()
    }

    pub fn accelerometer(&mut self) -> SensorEvent {
        let amplitude = self.noise.accelerometer;
        let rng = &mut self.rng;
        SensorEvent::Accelerometer([
            SensorNoiseModel::sample(amplitude, rng),
            -STANDARD_GRAVITY + SensorNoiseModel::sample(amplitude, rng),
            SensorNoiseModel::sample(amplitude, rng),
        ])
    }

    pub fn magnetic_field(&mut self) -> SensorEvent {
        let (sin, cos) = self.heading.to_radians().sin_cos();
        let amplitude = self.noise.magnetic_field;
        let rng = &mut self.rng;
        SensorEvent::MagneticField([
            sin as f32 + SensorNoiseModel::sample(amplitude, rng),
            -self.dip + SensorNoiseModel::sample(amplitude, rng),
            -cos as f32 + SensorNoiseModel::sample(amplitude, rng),
        ])
    }

    /// Fused orientation as an (x, y, z, w) quaternion
    pub fn rotation_vector(&mut self) -> SensorEvent {
        let amplitude = self.noise.heading_degrees;
        let jitter = if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        };
        let q = device_to_world(self.heading + jitter).coords;
        SensorEvent::RotationVector([q.x as f32, q.y as f32, q.z as f32], Some(q.w as f32))
    }
}

/// Rotation whose matrix rows are east, north and up in the phone frame
fn device_to_world(heading: f64) -> UnitQuaternion<f64> {
    let (s, c) = heading.to_radians().sin_cos();
    #[rustfmt::skip]
    let rows = Matrix3::new(
        c,   0.0, -s,
        -s,  0.0, -c,
        0.0, 1.0, 0.0,
    );
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rows))
}
