//! Sky Simulator - frame-loop harness for the pointing pipeline
//!
//! Simulates:
//! - A phone delivering readings for whatever sensors the controllers register
//! - A render loop querying time and pointing once per frame
//! - An unsmoothed reference model fed the same readings
//!
//! Wall time is a `ManualClock`, so runs are deterministic for a given seed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skymap_control::{
    AstronomerModel, ControllerGroup, PlainSmootherModelAdaptor, Platform, SensorEvent, SensorHub,
    SensorKind, SensorRate, SensorSink, ZeroMagneticDeclinationCalculator,
};
use skymap_core::{LatLong, PreferenceStore, SkyPreferences, Timestamp, Vector3};
use skymap_time::{Clock, ClockMode, ManualClock};
use tracing::debug;

use crate::{SensorNoiseModel, SimulatedDevice};

/// Sensor hub that accepts every sensor the phone has
#[derive(Default)]
pub struct RecordingHub {
    missing: Vec<SensorKind>,
    registered: Mutex<Vec<(SensorKind, SensorRate)>>,
}

impl RecordingHub {
    /// A phone lacking `kind`
    pub fn without(kind: SensorKind) -> Self {
        RecordingHub {
            missing: vec![kind],
            ..RecordingHub::default()
        }
    }

    pub fn registered(&self) -> Vec<SensorKind> {
        self.registered.lock().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn rate(&self, kind: SensorKind) -> Option<SensorRate> {
        self.registered
            .lock()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, rate)| *rate)
    }
}

impl SensorHub for RecordingHub {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        !self.missing.contains(&kind)
    }

    fn register(&self, kind: SensorKind, rate: SensorRate) -> bool {
        if !self.has_sensor(kind) {
            return false;
        }
        let mut registered = self.registered.lock();
        registered.retain(|(k, _)| *k != kind);
        registered.push((kind, rate));
        true
    }

    fn unregister(&self, kind: SensorKind) {
        self.registered.lock().retain(|(k, _)| *k != kind);
    }
}

/// What the render loop saw in one frame
#[derive(Clone, Copy, Debug)]
pub struct FrameSample {
    pub sky_time: Timestamp,
    pub mode: ClockMode,
    pub line_of_sight: Vector3,
    /// Line of sight of the unsmoothed reference model
    pub raw_line_of_sight: Vector3,
}

/// Frame-loop simulation around a `ControllerGroup`
pub struct SkySimulator {
    wall: Arc<ManualClock>,
    preferences: Arc<PreferenceStore>,
    hub: Arc<RecordingHub>,
    group: Arc<ControllerGroup>,
    raw_model: Arc<AstronomerModel>,
    raw_adaptor: PlainSmootherModelAdaptor,
    device: SimulatedDevice,
    frame_interval: Duration,
}

impl SkySimulator {
    pub fn new(
        preferences: SkyPreferences,
        hub: RecordingHub,
        device: SimulatedDevice,
        frame_interval: Duration,
        start: Timestamp,
    ) -> Self {
        let wall = Arc::new(ManualClock::new(start));
        let location = LatLong::new(preferences.latitude, preferences.longitude);
        let reverse_magnetic_z = preferences.reverse_magnetic_z;
        let preferences = Arc::new(PreferenceStore::new(preferences));
        let hub = Arc::new(hub);

        let model = Arc::new(AstronomerModel::new(Arc::new(
            ZeroMagneticDeclinationCalculator,
        )));
        let group = ControllerGroup::new(
            model,
            preferences.clone(),
            Platform {
                sensors: hub.clone(),
                locations: None,
                clock: wall.clone(),
            },
        );

        let raw_model = Arc::new(AstronomerModel::new(Arc::new(
            ZeroMagneticDeclinationCalculator,
        )));
        raw_model.set_clock(wall.clone());
        raw_model.set_location(location);
        let raw_adaptor = PlainSmootherModelAdaptor::new(raw_model.clone(), reverse_magnetic_z);

        SkySimulator {
            wall,
            preferences,
            hub,
            group,
            raw_model,
            raw_adaptor,
            device,
            frame_interval,
        }
    }

    pub fn start(&self) {
        self.group.start();
    }

    pub fn stop(&self) {
        self.group.stop();
    }

    /// Run `frames` frames and collect statistics
    pub fn run(&mut self, frames: usize) -> SimulationResult {
        let mut result = SimulationResult::new();
        for _ in 0..frames {
            self.tick(&mut result);
        }
        result.finalize();
        debug!(
            frames,
            jitter = result.avg_jitter_degrees,
            raw_jitter = result.avg_raw_jitter_degrees,
            "Simulation run complete"
        );
        result
    }

    /// Run frames until the clock reaches `mode`, giving up after
    /// `max_frames`. Returns true if the mode was reached.
    pub fn run_until(&mut self, mode: ClockMode, max_frames: usize) -> bool {
        let mut result = SimulationResult::new();
        for _ in 0..max_frames {
            self.tick(&mut result);
            if result.samples.last().map(|s| s.mode) == Some(mode) {
                return true;
            }
        }
        false
    }

    fn tick(&mut self, result: &mut SimulationResult) {
        self.wall.advance(self.frame_interval);
        self.device.advance(self.frame_interval);

        for event in self.device.events(&self.hub.registered()) {
            match event {
                SensorEvent::Accelerometer(values) | SensorEvent::MagneticField(values) => {
                    self.raw_adaptor.on_sensor_values(event.kind(), values);
                }
                SensorEvent::RotationVector([x, y, z], Some(w)) => {
                    self.raw_model.set_rotation_vector(&[x, y, z, w]);
                }
                SensorEvent::RotationVector([x, y, z], None) => {
                    self.raw_model.set_rotation_vector(&[x, y, z]);
                }
            }
            self.group.on_sensor_event(event);
        }

        let sky_time = self.group.now();
        result.record_frame(FrameSample {
            sky_time,
            mode: self.group.clock_mode(),
            line_of_sight: self.group.model().pointing().line_of_sight,
            raw_line_of_sight: self.raw_model.pointing().line_of_sight,
        });
    }

    pub fn group(&self) -> &Arc<ControllerGroup> {
        &self.group
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    pub fn hub(&self) -> &Arc<RecordingHub> {
        &self.hub
    }

    pub fn device_mut(&mut self) -> &mut SimulatedDevice {
        &mut self.device
    }

    pub fn wall_time(&self) -> Timestamp {
        self.wall.now()
    }
}

/// Simulation result and statistics
#[derive(Debug, Default)]
pub struct SimulationResult {
    pub total_frames: u64,
    pub samples: Vec<FrameSample>,
    /// Mean angle between consecutive lines of sight (degrees)
    pub avg_jitter_degrees: f64,
    pub max_jitter_degrees: f64,
    /// Same, for the unsmoothed reference
    pub avg_raw_jitter_degrees: f64,
    pub max_raw_jitter_degrees: f64,
}

impl SimulationResult {
    pub fn new() -> Self {
        SimulationResult::default()
    }

    fn record_frame(&mut self, sample: FrameSample) {
        self.total_frames += 1;
        self.samples.push(sample);
    }

    /// Calculate final statistics
    pub fn finalize(&mut self) {
        let steps = self.samples.len().saturating_sub(1);
        if steps == 0 {
            return;
        }
        let mut sum = 0.0;
        let mut raw_sum = 0.0;
        for pair in self.samples.windows(2) {
            let step = pair[0].line_of_sight.angle(&pair[1].line_of_sight).to_degrees();
            let raw_step = pair[0]
                .raw_line_of_sight
                .angle(&pair[1].raw_line_of_sight)
                .to_degrees();
            sum += step;
            raw_sum += raw_step;
            self.max_jitter_degrees = self.max_jitter_degrees.max(step);
            self.max_raw_jitter_degrees = self.max_raw_jitter_degrees.max(raw_step);
        }
        self.avg_jitter_degrees = sum / steps as f64;
        self.avg_raw_jitter_degrees = raw_sum / steps as f64;
    }

    pub fn sky_times(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.samples.iter().map(|s| s.sky_time)
    }
}

/// Predefined test scenarios
pub mod scenarios {
    use super::*;

    pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

    /// 2024-01-01T00:00:00Z
    pub const START: Timestamp = Timestamp(1_704_067_200_000);

    fn san_francisco() -> SkyPreferences {
        SkyPreferences {
            no_auto_locate: true,
            latitude: 37.77,
            longitude: -122.42,
            ..SkyPreferences::default()
        }
    }

    /// Phone held still facing north, accelerometer and compass only
    pub fn steady_classic(noise: SensorNoiseModel) -> SkySimulator {
        let preferences = SkyPreferences {
            disable_gyro: true,
            ..san_francisco()
        };
        SkySimulator::new(
            preferences,
            RecordingHub::default(),
            SimulatedDevice::new(0.0, noise, 7),
            FRAME_INTERVAL,
            START,
        )
    }

    /// Phone with a rotation-vector sensor, panning east
    pub fn panning_rotation_vector(degrees_per_second: f64) -> SkySimulator {
        SkySimulator::new(
            san_francisco(),
            RecordingHub::default(),
            SimulatedDevice::new(0.0, SensorNoiseModel::perfect(), 11)
                .with_pan_rate(degrees_per_second),
            FRAME_INTERVAL,
            START,
        )
    }

    /// Older phone without a gyro
    pub fn no_gyro() -> SkySimulator {
        SkySimulator::new(
            san_francisco(),
            RecordingHub::without(SensorKind::RotationVector),
            SimulatedDevice::new(45.0, SensorNoiseModel::quiet(), 13),
            FRAME_INTERVAL,
            START,
        )
    }

    /// Quiet phone for driving the time controls
    pub fn time_travel_sweep() -> SkySimulator {
        SkySimulator::new(
            san_francisco(),
            RecordingHub::default(),
            SimulatedDevice::new(0.0, SensorNoiseModel::quiet(), 17),
            FRAME_INTERVAL,
            START,
        )
    }
}
