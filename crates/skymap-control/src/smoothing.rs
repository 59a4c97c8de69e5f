//! Sensor smoothing and the adaptor that feeds the model
//!
//! Raw accelerometer and magnetometer readings are too noisy to point by at
//! the rates a smooth view needs. Each stream goes through its own
//! [`ExponentiallyWeightedSmoother`] before the [`PlainSmootherModelAdaptor`]
//! pairs them up and hands them to the [`AstronomerModel`].

use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::{SensorDamping, Vector3};
use tracing::{debug, error, warn};

use crate::{AstronomerModel, SensorKind};

/// Receives three-component sensor values
pub trait SensorSink: Send + Sync {
    fn on_sensor_values(&self, kind: SensorKind, values: [f32; 3]);
}

/// Smoothing strength: `damping` scales the correction, `exponent` bends it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorDampingSettings {
    pub damping: f32,
    pub exponent: u32,
}

const fn settings(damping: f32, exponent: u32) -> SensorDampingSettings {
    SensorDampingSettings { damping, exponent }
}

/// Indexed by [`SensorDamping::index`]
pub const ACC_DAMPING_SETTINGS: [SensorDampingSettings; 4] = [
    settings(0.7, 3),
    settings(0.7, 3),
    settings(0.1, 3),
    settings(0.1, 3),
];

/// Indexed by [`SensorDamping::index`]
pub const MAG_DAMPING_SETTINGS: [SensorDampingSettings; 4] = [
    settings(0.05, 3),
    settings(0.001, 4),
    settings(0.0001, 5),
    settings(0.000001, 5),
];

impl SensorDampingSettings {
    pub fn accelerometer(level: SensorDamping) -> Self {
        ACC_DAMPING_SETTINGS[level.index()]
    }

    pub fn magnetic_field(level: SensorDamping) -> Self {
        MAG_DAMPING_SETTINGS[level.index()]
    }
}

/// Moves each component toward the raw value by
/// `diff * damping * |diff|^(exponent - 1)`, never overshooting.
///
/// Small wobbles are damped hard while large, deliberate movements pass
/// almost straight through.
pub struct ExponentiallyWeightedSmoother {
    sink: Arc<dyn SensorSink>,
    settings: SensorDampingSettings,
    current: Mutex<[f32; 3]>,
}

impl ExponentiallyWeightedSmoother {
    pub fn new(sink: Arc<dyn SensorSink>, settings: SensorDampingSettings) -> Self {
        debug!(
            alpha = settings.damping,
            exponent = settings.exponent,
            "Exponentially weighted smoother"
        );
        ExponentiallyWeightedSmoother {
            sink,
            settings,
            current: Mutex::new([0.0; 3]),
        }
    }

    /// Fold in a raw reading and return the smoothed value
    pub fn smooth(&self, raw: [f32; 3]) -> [f32; 3] {
        let mut current = self.current.lock();
        for (value, target) in current.iter_mut().zip(raw) {
            let diff = target - *value;
            let mut correction = diff * self.settings.damping;
            for _ in 1..self.settings.exponent {
                correction *= diff.abs();
            }
            if correction.abs() > diff.abs() {
                correction = diff;
            }
            *value += correction;
        }
        *current
    }

    pub fn current(&self) -> [f32; 3] {
        *self.current.lock()
    }
}

impl SensorSink for ExponentiallyWeightedSmoother {
    fn on_sensor_values(&self, kind: SensorKind, values: [f32; 3]) {
        let smoothed = self.smooth(values);
        self.sink.on_sensor_values(kind, smoothed);
    }
}

fn to_vector(values: [f32; 3]) -> Vector3 {
    Vector3::new(values[0].into(), values[1].into(), values[2].into())
}

#[derive(Clone, Copy, Debug)]
struct PairedReadings {
    acceleration: Vector3,
    magnetic_field: Vector3,
}

/// Keeps the latest acceleration and magnetic field and pushes the pair into
/// the model whenever either changes.
pub struct PlainSmootherModelAdaptor {
    model: Arc<AstronomerModel>,
    reverse_magnetic_z: bool,
    readings: Mutex<PairedReadings>,
}

impl PlainSmootherModelAdaptor {
    pub fn new(model: Arc<AstronomerModel>, reverse_magnetic_z: bool) -> Self {
        PlainSmootherModelAdaptor {
            model,
            reverse_magnetic_z,
            readings: Mutex::new(PairedReadings {
                acceleration: Vector3::new(0.0, -1.0, -9.0),
                magnetic_field: Vector3::new(0.0, -1.0, 0.0),
            }),
        }
    }

    /// Latest (acceleration, magnetic field) as handed to the model
    pub fn readings(&self) -> (Vector3, Vector3) {
        let readings = self.readings.lock();
        (readings.acceleration, readings.magnetic_field)
    }
}

impl SensorSink for PlainSmootherModelAdaptor {
    fn on_sensor_values(&self, kind: SensorKind, values: [f32; 3]) {
        let paired = {
            let mut readings = self.readings.lock();
            match kind {
                SensorKind::Accelerometer => readings.acceleration = to_vector(values),
                SensorKind::MagneticField => {
                    // The magnetometer z axis is opposite to the accelerometer's,
                    // except on devices that already flip it
                    let mut field = to_vector(values);
                    if !self.reverse_magnetic_z {
                        field.z = -field.z;
                    }
                    readings.magnetic_field = field;
                }
                SensorKind::RotationVector => {
                    error!(%kind, "Adaptor is receiving values that aren't accel or magnetic");
                    return;
                }
            }
            *readings
        };

        if let Err(e) = self
            .model
            .set_phone_sensor_values(paired.acceleration, paired.magnetic_field)
        {
            warn!(error = %e, "Dropping sensor update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZeroMagneticDeclinationCalculator;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(SensorKind, [f32; 3])>>,
    }

    impl SensorSink for Recorder {
        fn on_sensor_values(&self, kind: SensorKind, values: [f32; 3]) {
            self.seen.lock().push((kind, values));
        }
    }

    fn smoother(settings: SensorDampingSettings) -> (Arc<Recorder>, ExponentiallyWeightedSmoother) {
        let recorder = Arc::new(Recorder::default());
        let smoother = ExponentiallyWeightedSmoother::new(recorder.clone(), settings);
        (recorder, smoother)
    }

    #[test]
    fn test_large_jump_passes_through() {
        let (_, smoother) = smoother(settings(0.7, 3));
        assert_eq!(smoother.smooth([10.0, -10.0, 0.0]), [10.0, -10.0, 0.0]);
    }

    #[test]
    fn test_small_wobble_is_damped() {
        let (_, smoother) = smoother(settings(0.7, 3));
        smoother.smooth([10.0, 0.0, 0.0]);
        let [x, y, z] = smoother.smooth([10.5, 0.0, 0.0]);
        // 0.5 * 0.7 * 0.5^2
        assert!((x - 10.0875).abs() < 1e-5);
        assert_eq!((y, z), (0.0, 0.0));
    }

    #[test]
    fn test_never_overshoots() {
        let (_, smoother) = smoother(settings(0.05, 3));
        for _ in 0..100 {
            let [x, _, _] = smoother.smooth([3.0, 0.0, 0.0]);
            assert!(x <= 3.0);
        }
    }

    #[test]
    fn test_forwards_smoothed_values() {
        let (recorder, smoother) = smoother(settings(0.7, 3));
        smoother.on_sensor_values(SensorKind::Accelerometer, [10.0, 0.0, 0.0]);
        smoother.on_sensor_values(SensorKind::Accelerometer, [10.5, 0.0, 0.0]);

        let seen = recorder.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, SensorKind::Accelerometer);
        assert_eq!(seen[1].1, smoother.current());
        assert!(seen[1].1[0] < 10.5);
    }

    #[test]
    fn test_damping_tables() {
        assert_eq!(
            SensorDampingSettings::accelerometer(SensorDamping::Standard),
            settings(0.7, 3)
        );
        assert_eq!(
            SensorDampingSettings::magnetic_field(SensorDamping::ReallyHigh),
            settings(0.000001, 5)
        );
        // Stronger damping never loosens either table
        for i in 1..4 {
            assert!(ACC_DAMPING_SETTINGS[i].damping <= ACC_DAMPING_SETTINGS[i - 1].damping);
            assert!(MAG_DAMPING_SETTINGS[i].damping <= MAG_DAMPING_SETTINGS[i - 1].damping);
        }
    }

    fn adaptor(reverse_magnetic_z: bool) -> (Arc<AstronomerModel>, PlainSmootherModelAdaptor) {
        let model = Arc::new(AstronomerModel::new(Arc::new(ZeroMagneticDeclinationCalculator)));
        let adaptor = PlainSmootherModelAdaptor::new(model.clone(), reverse_magnetic_z);
        (model, adaptor)
    }

    #[test]
    fn test_adaptor_flips_magnetic_z() {
        let (_, adaptor) = adaptor(false);
        adaptor.on_sensor_values(SensorKind::MagneticField, [1.0, 2.0, 3.0]);
        assert_eq!(adaptor.readings().1, Vector3::new(1.0, 2.0, -3.0));

        let (_, adaptor) = self::adaptor(true);
        adaptor.on_sensor_values(SensorKind::MagneticField, [1.0, 2.0, 3.0]);
        assert_eq!(adaptor.readings().1, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_adaptor_drives_model() {
        let (model, adaptor) = adaptor(false);
        adaptor.on_sensor_values(SensorKind::Accelerometer, [0.0, -9.8, 0.0]);
        adaptor.on_sensor_values(SensorKind::MagneticField, [0.0, -0.5, -1.0]);

        let los = model.pointing().line_of_sight;
        assert!((los - model.north()).norm() < 1e-6);
    }

    #[test]
    fn test_adaptor_ignores_rotation_vector() {
        let (_, adaptor) = adaptor(false);
        let before = adaptor.readings();
        adaptor.on_sensor_values(SensorKind::RotationVector, [1.0, 1.0, 1.0]);
        assert_eq!(adaptor.readings(), before);
    }

    #[test]
    fn test_adaptor_drops_degenerate_pair() {
        let (model, adaptor) = adaptor(false);
        adaptor.on_sensor_values(SensorKind::Accelerometer, [0.0, -9.8, 0.0]);
        adaptor.on_sensor_values(SensorKind::MagneticField, [0.0, -0.5, -1.0]);
        let before = model.pointing();

        adaptor.on_sensor_values(SensorKind::Accelerometer, [0.0, 0.0, 0.0]);
        assert_eq!(model.pointing(), before);
    }

    proptest! {
        #[test]
        fn prop_smoothed_value_stays_between_old_and_new(
            start in -100.0f32..100.0,
            target in -100.0f32..100.0,
            level in 0usize..4,
        ) {
            let damping = [
                SensorDamping::Standard,
                SensorDamping::High,
                SensorDamping::ExtraHigh,
                SensorDamping::ReallyHigh,
            ][level];
            let (_, smoother) = smoother(SensorDampingSettings::magnetic_field(damping));
            smoother.smooth([start; 3]);
            let [x, _, _] = smoother.smooth([target; 3]);
            let (lo, hi) = if start < target { (start, target) } else { (target, start) };
            prop_assert!(x >= lo - 1e-4 && x <= hi + 1e-4);
        }
    }
}
