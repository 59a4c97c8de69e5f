//! Sensor events, the platform sensor seam, and compass accuracy monitoring

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::{SensorSpeed, Timestamp};
use skymap_time::Clock;
use tracing::{debug, warn};

/// Orientation sensors the core understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    MagneticField,
    /// Fused gyro/compass/accelerometer attitude
    RotationVector,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::MagneticField => "magnetic field",
            SensorKind::RotationVector => "rotation vector",
        })
    }
}

/// Requested delivery rate, slowest to fastest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorRate {
    Normal,
    Ui,
    Game,
    Fastest,
}

impl From<SensorSpeed> for SensorRate {
    fn from(speed: SensorSpeed) -> Self {
        match speed {
            SensorSpeed::Slow => SensorRate::Normal,
            SensorSpeed::Standard => SensorRate::Game,
            SensorSpeed::High => SensorRate::Fastest,
        }
    }
}

/// One reading, phone coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorEvent {
    Accelerometer([f32; 3]),
    MagneticField([f32; 3]),
    /// Vector part and, when the device reports it, the scalar part
    RotationVector([f32; 3], Option<f32>),
}

impl SensorEvent {
    /// Build from raw platform values. Returns `None` when too few values
    /// arrive; components past the ones used are ignored.
    pub fn from_values(kind: SensorKind, values: &[f32]) -> Option<Self> {
        let xyz = [*values.first()?, *values.get(1)?, *values.get(2)?];
        Some(match kind {
            SensorKind::Accelerometer => SensorEvent::Accelerometer(xyz),
            SensorKind::MagneticField => SensorEvent::MagneticField(xyz),
            SensorKind::RotationVector => SensorEvent::RotationVector(xyz, values.get(3).copied()),
        })
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorEvent::Accelerometer(_) => SensorKind::Accelerometer,
            SensorEvent::MagneticField(_) => SensorKind::MagneticField,
            SensorEvent::RotationVector(..) => SensorKind::RotationVector,
        }
    }
}

/// Platform sensor registration.
///
/// Readings for registered sensors are delivered back into the core by the
/// platform layer; an absent sensor simply never produces any.
pub trait SensorHub: Send + Sync {
    fn has_sensor(&self, kind: SensorKind) -> bool;

    /// Start delivery of `kind`. Returns false if the sensor is absent.
    fn register(&self, kind: SensorKind, rate: SensorRate) -> bool;

    fn unregister(&self, kind: SensorKind);
}

/// Reported reliability of a sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

impl SensorAccuracy {
    /// Good enough to navigate by
    pub fn is_acceptable(self) -> bool {
        matches!(self, SensorAccuracy::Medium | SensorAccuracy::High)
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorAccuracy::Unreliable => "Unreliable",
            SensorAccuracy::Low => "Low",
            SensorAccuracy::Medium => "Medium",
            SensorAccuracy::High => "High",
        }
    }
}

impl fmt::Display for SensorAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Minimum time between two calibration warnings
pub const MIN_INTERVAL_BETWEEN_WARNINGS_MILLIS: i64 = 180_000;

#[derive(Debug, Default)]
struct MonitorState {
    started: bool,
    has_reading: bool,
    last_warned: Option<Timestamp>,
}

/// Watches the compass accuracy and decides when the user should be asked
/// to calibrate.
pub struct CompassAccuracyMonitor {
    clock: Arc<dyn Clock>,
    state: Mutex<MonitorState>,
}

impl CompassAccuracyMonitor {
    /// `clock` should be wall time, not the sky clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        CompassAccuracyMonitor {
            clock,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        if !state.started {
            debug!("Starting monitoring compass accuracy");
            state.started = true;
        }
    }

    pub fn stop(&self) {
        debug!("Stopping monitoring compass accuracy");
        let mut state = self.state.lock();
        state.started = false;
        state.has_reading = false;
    }

    /// A compass reading arrived. Until an accuracy change has been seen,
    /// the reading's own accuracy is evaluated.
    pub fn on_reading(&self, accuracy: SensorAccuracy) -> bool {
        let has_reading = self.state.lock().has_reading;
        if has_reading {
            return false;
        }
        self.on_accuracy_changed(accuracy)
    }

    /// Returns true when a calibration warning should be shown now
    pub fn on_accuracy_changed(&self, accuracy: SensorAccuracy) -> bool {
        let mut state = self.state.lock();
        if !state.started {
            return false;
        }
        state.has_reading = true;
        if accuracy.is_acceptable() {
            return false;
        }

        let now = self.clock.now();
        if let Some(last) = state.last_warned {
            if now - last < MIN_INTERVAL_BETWEEN_WARNINGS_MILLIS {
                debug!(%accuracy, "Compass accuracy insufficient, but too soon to warn again");
                return false;
            }
        }
        state.last_warned = Some(now);
        warn!(%accuracy, "Inaccurate compass - please calibrate");
        true
    }
}
