//! Sensor-driven pointing

use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::PreferenceStore;
use tracing::{debug, trace, warn};

use crate::controller::EnabledFlag;
use crate::{
    AstronomerModel, Controller, ExponentiallyWeightedSmoother, PlainSmootherModelAdaptor,
    SensorDampingSettings, SensorEvent, SensorHub, SensorKind, SensorRate, SensorSink,
};

/// Sensors registered by the last `start`
enum ActiveSensors {
    Stopped,
    RotationVector,
    Classic {
        accelerometer: ExponentiallyWeightedSmoother,
        compass: ExponentiallyWeightedSmoother,
    },
}

impl ActiveSensors {
    fn kinds(&self) -> &'static [SensorKind] {
        match self {
            ActiveSensors::Stopped => &[],
            ActiveSensors::RotationVector => &[SensorKind::RotationVector],
            ActiveSensors::Classic { .. } => {
                &[SensorKind::Accelerometer, SensorKind::MagneticField]
            }
        }
    }
}

/// Feeds the model from the rotation-vector sensor, or from smoothed
/// accelerometer and magnetometer readings when the gyro is disabled or
/// missing.
pub struct SensorOrientationController {
    model: Arc<AstronomerModel>,
    preferences: Arc<PreferenceStore>,
    hub: Arc<dyn SensorHub>,
    active: Mutex<ActiveSensors>,
    enabled: EnabledFlag,
}

impl SensorOrientationController {
    pub fn new(
        model: Arc<AstronomerModel>,
        preferences: Arc<PreferenceStore>,
        hub: Arc<dyn SensorHub>,
    ) -> Self {
        SensorOrientationController {
            model,
            preferences,
            hub,
            active: Mutex::new(ActiveSensors::Stopped),
            enabled: EnabledFlag::default(),
        }
    }

    /// True while readings are flowing from the rotation-vector sensor
    pub fn using_rotation_vector(&self) -> bool {
        matches!(*self.active.lock(), ActiveSensors::RotationVector)
    }

    /// Sensor reading from the platform
    pub fn on_sensor_event(&self, event: SensorEvent) {
        if !self.enabled.get() {
            return;
        }
        let active = self.active.lock();
        match (&*active, event) {
            (ActiveSensors::RotationVector, SensorEvent::RotationVector([x, y, z], w)) => {
                match w {
                    Some(w) => self.model.set_rotation_vector(&[x, y, z, w]),
                    None => self.model.set_rotation_vector(&[x, y, z]),
                }
            }
            (ActiveSensors::Classic { accelerometer, .. }, SensorEvent::Accelerometer(values)) => {
                accelerometer.on_sensor_values(SensorKind::Accelerometer, values);
            }
            (ActiveSensors::Classic { compass, .. }, SensorEvent::MagneticField(values)) => {
                compass.on_sensor_values(SensorKind::MagneticField, values);
            }
            (_, event) => trace!(kind = %event.kind(), "Ignoring unregistered sensor"),
        }
    }

    fn start_classic(&self) -> ActiveSensors {
        let prefs = self.preferences.get();
        debug!(
            damping = ?prefs.sensor_damping,
            speed = ?prefs.sensor_speed,
            "Using classic sensors with exponentially weighted smoothers"
        );
        let adaptor: Arc<dyn SensorSink> = Arc::new(PlainSmootherModelAdaptor::new(
            self.model.clone(),
            prefs.reverse_magnetic_z,
        ));
        let rate = SensorRate::from(prefs.sensor_speed);
        let accelerometer = ExponentiallyWeightedSmoother::new(
            adaptor.clone(),
            SensorDampingSettings::accelerometer(prefs.sensor_damping),
        );
        let compass = ExponentiallyWeightedSmoother::new(
            adaptor,
            SensorDampingSettings::magnetic_field(prefs.sensor_damping),
        );
        for kind in [SensorKind::Accelerometer, SensorKind::MagneticField] {
            if !self.hub.register(kind, rate) {
                warn!(%kind, "Sensor not available");
            }
        }
        ActiveSensors::Classic {
            accelerometer,
            compass,
        }
    }
}

impl Controller for SensorOrientationController {
    fn name(&self) -> &'static str {
        "sensor orientation"
    }

    fn start(&self) {
        let mut active = self.active.lock();
        for &kind in active.kinds() {
            self.hub.unregister(kind);
        }

        let disable_gyro = self.preferences.with(|p| p.disable_gyro);
        let rotation_vector =
            !disable_gyro && self.hub.register(SensorKind::RotationVector, SensorRate::Game);
        *active = if rotation_vector {
            debug!("Using rotation sensor");
            ActiveSensors::RotationVector
        } else {
            if !disable_gyro {
                warn!("No rotation vector sensor, falling back to classic sensors");
            }
            self.start_classic()
        };
        debug!("Registered sensor listener");
    }

    fn stop(&self) {
        let mut active = self.active.lock();
        debug!("Unregistering sensor listeners");
        for &kind in active.kinds() {
            self.hub.unregister(kind);
        }
        *active = ActiveSensors::Stopped;
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(self.name(), enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}
