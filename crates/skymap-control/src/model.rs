//! Astronomer model - where the device is pointing in the sky
//!
//! Combines the observer's location, the clock, a declination calculator and
//! the latest orientation readings into a line of sight and a screen-up
//! vector in geocentric celestial coordinates.
//!
//! Each field has its own lock. Writers from different threads are
//! last-writer-wins per field; no lock spans the whole model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use skymap_core::{
    normalized_or_self, rotation_about, zenith_vector, EquatorialCoordinates, LatLong, Matrix3,
    SkyMapError, SkyMapResult, Timestamp, Vector3,
};
use skymap_time::{Clock, RealClock};
use tracing::trace;

use crate::MagneticDeclinationCalculator;

/// The local frame is rebuilt at most this often unless forced
pub const MINIMUM_TIME_BETWEEN_CELESTIAL_COORD_UPDATES_MILLIS: i64 = 60_000;

pub const DEFAULT_FIELD_OF_VIEW: f64 = 70.0;

fn pointing_dir_in_phone() -> Vector3 {
    Vector3::new(0.0, 0.0, -1.0)
}

fn screen_up_in_phone(rotate_horizon: bool) -> Vector3 {
    if rotate_horizon {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    }
}

fn axis_of_earths_rotation() -> Vector3 {
    Vector3::new(0.0, 0.0, 1.0)
}

/// Direction into the screen and direction of screen-up, celestial frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointing {
    pub line_of_sight: Vector3,
    pub perpendicular: Vector3,
}

impl Default for Pointing {
    fn default() -> Self {
        Pointing {
            line_of_sight: Vector3::new(1.0, 0.0, 0.0),
            perpendicular: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Latest orientation input, phone frame
#[derive(Clone, Copy, Debug)]
struct SensorReadings {
    /// Points down
    acceleration: Vector3,
    /// Points magnetic south
    magnetic_field: Vector3,
    /// Unit quaternion (x, y, z, w)
    rotation_vector: [f64; 4],
    use_rotation_vector: bool,
}

impl Default for SensorReadings {
    fn default() -> Self {
        SensorReadings {
            acceleration: Vector3::new(0.0, -1.0, -9.0),
            magnetic_field: Vector3::new(0.0, -1.0, 0.0),
            rotation_vector: [1.0, 0.0, 0.0, 0.0],
            use_rotation_vector: false,
        }
    }
}

/// Local horizon axes in celestial coordinates
#[derive(Clone, Copy, Debug)]
struct CelestialFrame {
    true_north: Vector3,
    up: Vector3,
    true_east: Vector3,
    /// Columns: magnetic north, up, magnetic east
    axes_magnetic: Matrix3,
    last_updated: Option<Timestamp>,
}

impl Default for CelestialFrame {
    fn default() -> Self {
        CelestialFrame {
            true_north: Vector3::new(1.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            true_east: axis_of_earths_rotation(),
            axes_magnetic: Matrix3::identity(),
            last_updated: None,
        }
    }
}

/// Phone-frame north, up and east, packed as the rows of the inverse of
/// the phone's axes matrix.
struct PhoneAxes {
    inverse: Matrix3,
    up: Vector3,
}

impl SensorReadings {
    fn phone_axes(&self) -> PhoneAxes {
        let (north, up, east) = if self.use_rotation_vector {
            let r = rotation_matrix_from_vector(&self.rotation_vector);
            // Rows are east, north, up
            (
                Vector3::new(r[3], r[4], r[5]),
                Vector3::new(r[6], r[7], r[8]),
                Vector3::new(r[0], r[1], r[2]),
            )
        } else {
            let down = normalized_or_self(self.acceleration);
            // The field runs from north to south
            let to_north = normalized_or_self(-self.magnetic_field);
            let north = normalized_or_self(to_north - down * to_north.dot(&down));
            let up = -down;
            (north, up, north.cross(&up))
        };
        PhoneAxes {
            inverse: Matrix3::from_rows(&[north.transpose(), up.transpose(), east.transpose()]),
            up,
        }
    }
}

/// Row-major rotation matrix from a rotation-vector quaternion
fn rotation_matrix_from_vector(q: &[f64; 4]) -> [f64; 9] {
    let [x, y, z, w] = *q;
    let (xx, yy, zz) = (2.0 * x * x, 2.0 * y * y, 2.0 * z * z);
    let (xy, xz, yz) = (2.0 * x * y, 2.0 * x * z, 2.0 * y * z);
    let (xw, yw, zw) = (2.0 * x * w, 2.0 * y * w, 2.0 * z * w);
    [
        1.0 - yy - zz,
        xy - zw,
        xz + yw,
        xy + zw,
        1.0 - xx - zz,
        yz - xw,
        xz - yw,
        yz + xw,
        1.0 - xx - yy,
    ]
}

fn check_sensor_vector(sensor: &'static str, v: &Vector3) -> SkyMapResult<()> {
    let length2 = v.norm_squared();
    if !length2.is_finite() || length2 < f64::EPSILON {
        return Err(SkyMapError::DegenerateSensorVector { sensor, length2 });
    }
    Ok(())
}

/// The shared pointing model
pub struct AstronomerModel {
    clock: RwLock<Arc<dyn Clock>>,
    calculator: RwLock<Arc<dyn MagneticDeclinationCalculator>>,
    location: RwLock<LatLong>,
    readings: Mutex<SensorReadings>,
    frame: Mutex<CelestialFrame>,
    pointing: RwLock<Pointing>,
    field_of_view: RwLock<f64>,
    auto_update_pointing: AtomicBool,
    rotate_horizon: AtomicBool,
}

impl AstronomerModel {
    pub fn new(calculator: Arc<dyn MagneticDeclinationCalculator>) -> Self {
        let model = AstronomerModel {
            clock: RwLock::new(Arc::new(RealClock::new())),
            calculator: RwLock::new(calculator),
            location: RwLock::new(LatLong::default()),
            readings: Mutex::new(SensorReadings::default()),
            frame: Mutex::new(CelestialFrame::default()),
            pointing: RwLock::new(Pointing::default()),
            field_of_view: RwLock::new(DEFAULT_FIELD_OF_VIEW),
            auto_update_pointing: AtomicBool::new(true),
            rotate_horizon: AtomicBool::new(false),
        };
        model.refresh_frame(true);
        model
    }

    // === Inputs ===

    pub fn set_location(&self, location: LatLong) {
        *self.location.write() = location;
        self.refresh_frame(true);
    }

    pub fn location(&self) -> LatLong {
        *self.location.read()
    }

    pub fn set_clock(&self, clock: Arc<dyn Clock>) {
        *self.clock.write() = clock;
        self.refresh_frame(true);
    }

    pub fn set_magnetic_declination_calculator(
        &self,
        calculator: Arc<dyn MagneticDeclinationCalculator>,
    ) {
        *self.calculator.write() = calculator;
        self.refresh_frame(true);
    }

    /// When false, [`pointing`](Self::pointing) returns whatever was last
    /// set instead of computing from the sensors
    pub fn set_auto_update_pointing(&self, auto_update: bool) {
        self.auto_update_pointing.store(auto_update, Ordering::SeqCst);
    }

    pub fn auto_update_pointing(&self) -> bool {
        self.auto_update_pointing.load(Ordering::SeqCst)
    }

    /// Use the phone's long side as screen-up
    pub fn set_horizontal_rotation(&self, rotate_horizon: bool) {
        self.rotate_horizon.store(rotate_horizon, Ordering::SeqCst);
    }

    /// Accelerometer (pointing down) and magnetometer (pointing south)
    /// readings in phone coordinates
    pub fn set_phone_sensor_values(
        &self,
        acceleration: Vector3,
        magnetic_field: Vector3,
    ) -> SkyMapResult<()> {
        check_sensor_vector("acceleration", &acceleration)?;
        check_sensor_vector("magnetic field", &magnetic_field)?;
        let mut readings = self.readings.lock();
        readings.acceleration = acceleration;
        readings.magnetic_field = magnetic_field;
        readings.use_rotation_vector = false;
        Ok(())
    }

    /// Fused rotation-vector reading.
    ///
    /// Only the first four components are used. With three, the scalar part
    /// is reconstructed from the unit-length constraint.
    pub fn set_rotation_vector(&self, values: &[f32]) {
        let get = |i: usize| values.get(i).copied().map(f64::from);
        let (Some(x), Some(y), Some(z)) = (get(0), get(1), get(2)) else {
            trace!(len = values.len(), "Ignoring short rotation vector");
            return;
        };
        let w = get(3).unwrap_or_else(|| (1.0 - x * x - y * y - z * z).max(0.0).sqrt());
        let mut readings = self.readings.lock();
        readings.rotation_vector = [x, y, z, w];
        readings.use_rotation_vector = true;
    }

    /// Up in phone coordinates, from the current readings
    pub fn phone_up_direction(&self) -> Vector3 {
        self.readings.lock().phone_axes().up
    }

    // === Outputs ===

    pub fn time(&self) -> Timestamp {
        let clock = self.clock.read().clone();
        clock.now()
    }

    pub fn magnetic_correction(&self) -> f64 {
        self.calculator.read().declination()
    }

    pub fn field_of_view(&self) -> f64 {
        *self.field_of_view.read()
    }

    pub fn set_field_of_view(&self, degrees: f64) {
        *self.field_of_view.write() = degrees;
    }

    /// Current pointing, recomputed from the sensors in auto mode
    pub fn pointing(&self) -> Pointing {
        if self.auto_update_pointing() {
            let frame = self.refresh_frame(false);
            let phone = self.readings.lock().phone_axes();
            let transform = frame.axes_magnetic * phone.inverse;
            let screen_up = screen_up_in_phone(self.rotate_horizon.load(Ordering::SeqCst));

            let pointing = Pointing {
                line_of_sight: transform * pointing_dir_in_phone(),
                perpendicular: transform * screen_up,
            };
            *self.pointing.write() = pointing;
            return pointing;
        }
        *self.pointing.read()
    }

    pub fn set_pointing(&self, line_of_sight: Vector3, perpendicular: Vector3) {
        *self.pointing.write() = Pointing {
            line_of_sight,
            perpendicular,
        };
    }

    /// Line of sight as RA/Dec, from the last computed pointing
    pub fn equatorial_coordinates(&self) -> EquatorialCoordinates {
        EquatorialCoordinates::from_geocentric(&self.pointing.read().line_of_sight)
    }

    pub fn north(&self) -> Vector3 {
        self.refresh_frame(false).true_north
    }

    pub fn south(&self) -> Vector3 {
        -self.refresh_frame(false).true_north
    }

    pub fn east(&self) -> Vector3 {
        self.refresh_frame(false).true_east
    }

    pub fn west(&self) -> Vector3 {
        -self.refresh_frame(false).true_east
    }

    pub fn zenith(&self) -> Vector3 {
        self.refresh_frame(false).up
    }

    pub fn nadir(&self) -> Vector3 {
        -self.refresh_frame(false).up
    }

    /// Rebuild local north/east/up in celestial coordinates if the cached
    /// frame is stale, or unconditionally when `force` is set.
    ///
    /// Magnetic correction rotates the celestial axes about up instead of
    /// correcting the phone's axes.
    fn refresh_frame(&self, force: bool) -> CelestialFrame {
        // Clock and calculator are read before the frame lock is taken
        let now = self.time();
        let calculator = self.calculator.read().clone();
        let location = self.location();

        let mut frame = self.frame.lock();
        if !force {
            if let Some(last) = frame.last_updated {
                let since = (now - last).saturating_abs();
                if since < MINIMUM_TIME_BETWEEN_CELESTIAL_COORD_UPDATES_MILLIS {
                    return *frame;
                }
            }
        }

        calculator.set_location_and_time(&location, now);
        let up = zenith_vector(now, &location);
        let z = axis_of_earths_rotation();
        // At the poles any horizontal direction will do
        let true_north = (z - up * up.dot(&z))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| Vector3::new(1.0, 0.0, 0.0));
        let true_east = true_north.cross(&up);

        let magnetic_north = rotation_about(&up, calculator.declination()) * true_north;
        let magnetic_east = magnetic_north.cross(&up);

        *frame = CelestialFrame {
            true_north,
            up,
            true_east,
            axes_magnetic: Matrix3::from_columns(&[magnetic_north, up, magnetic_east]),
            last_updated: Some(now),
        };
        trace!(time = now.as_millis(), "Recomputed local celestial frame");
        *frame
    }
}

impl std::fmt::Debug for AstronomerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstronomerModel")
            .field("location", &self.location())
            .field("calculator", &*self.calculator.read())
            .field("pointing", &*self.pointing.read())
            .field("field_of_view", &self.field_of_view())
            .field("auto_update_pointing", &self.auto_update_pointing())
            .finish()
    }
}
