//! Controller group - one facade over every controller and the clocks
//!
//! Builds the clock stack, owns the sub-controllers, fans lifecycle calls
//! out to them and switches between sensor-driven and touch-driven
//! pointing.

use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::{
    LatLong, PreferenceKey, PreferenceListener, PreferenceStore, SkyPreferences, Timestamp,
    Vector3,
};
use skymap_time::{Clock, ClockMode, TimeTravelClock, TransitioningCompositeClock};
use tracing::info;

use crate::{
    AstronomerModel, CompassAccuracyMonitor, Controller, LocationController, LocationFix,
    LocationProvider, MagneticDeclinationSwitcher, ManualOrientationController, SensorAccuracy,
    SensorEvent, SensorHub, SensorOrientationController, TeleportingController, ZoomController,
};

/// Platform collaborators handed to the group
pub struct Platform {
    pub sensors: Arc<dyn SensorHub>,
    pub locations: Option<Arc<dyn LocationProvider>>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

pub struct ControllerGroup {
    model: Arc<AstronomerModel>,
    time_travel: Arc<TimeTravelClock>,
    clock: Arc<TransitioningCompositeClock>,
    location: LocationController,
    sensor: SensorOrientationController,
    manual: ManualOrientationController,
    zoom: ZoomController,
    teleport: TeleportingController,
    compass_monitor: CompassAccuracyMonitor,
    _declination: Arc<MagneticDeclinationSwitcher>,
    /// Current mode; held across a mode switch so switches never interleave
    auto_mode: Mutex<bool>,
}

impl ControllerGroup {
    /// Wire the controllers to `model`, install the composite clock and
    /// subscribe to `preferences`.
    pub fn new(
        model: Arc<AstronomerModel>,
        preferences: Arc<PreferenceStore>,
        platform: Platform,
    ) -> Arc<Self> {
        let time_travel = Arc::new(TimeTravelClock::new(platform.clock.clone()));
        let clock = Arc::new(TransitioningCompositeClock::new(
            time_travel.clone(),
            platform.clock.clone(),
        ));
        model.set_clock(clock.clone());

        let declination = MagneticDeclinationSwitcher::new(model.clone(), &preferences);
        let prefs = preferences.get();
        model.set_horizontal_rotation(prefs.rotate_horizon);

        let group = Arc::new(ControllerGroup {
            location: LocationController::new(
                model.clone(),
                preferences.clone(),
                platform.locations,
            ),
            sensor: SensorOrientationController::new(
                model.clone(),
                preferences.clone(),
                platform.sensors,
            ),
            manual: ManualOrientationController::new(model.clone()),
            zoom: ZoomController::new(model.clone()),
            teleport: TeleportingController::new(model.clone()),
            compass_monitor: CompassAccuracyMonitor::new(platform.clock),
            _declination: declination,
            model,
            time_travel,
            clock,
            auto_mode: Mutex::new(prefs.auto_mode),
        });
        group.set_auto_mode(prefs.auto_mode);
        preferences.register(&group);
        group
    }

    fn controllers(&self) -> [&dyn Controller; 5] {
        [
            &self.location,
            &self.sensor,
            &self.manual,
            &self.zoom,
            &self.teleport,
        ]
    }

    pub fn model(&self) -> &Arc<AstronomerModel> {
        &self.model
    }

    pub fn clock(&self) -> &Arc<TransitioningCompositeClock> {
        &self.clock
    }

    // === Lifecycle ===

    pub fn start(&self) {
        info!("Starting controllers");
        for controller in self.controllers() {
            controller.start();
        }
        self.compass_monitor.start();
    }

    pub fn stop(&self) {
        info!("Stopping controllers");
        for controller in self.controllers() {
            controller.stop();
        }
        self.compass_monitor.stop();
    }

    /// Enable or disable every controller. When enabling, only the
    /// orientation source for the current mode is switched on.
    pub fn set_enabled(&self, enabled: bool) {
        let auto_mode = self.auto_mode.lock();
        info!(enabled, "Setting all controllers enabled");
        for controller in [
            &self.location as &dyn Controller,
            &self.zoom,
            &self.teleport,
        ] {
            controller.set_enabled(enabled);
        }
        self.sensor.set_enabled(enabled && *auto_mode);
        self.manual.set_enabled(enabled && !*auto_mode);
    }

    // === Auto / manual mode ===

    pub fn is_auto_mode(&self) -> bool {
        *self.auto_mode.lock()
    }

    /// Sensor-driven (true) or touch-driven (false) pointing.
    ///
    /// The outgoing source is disabled before the model flag flips and the
    /// incoming source is enabled after, so the two are never on together.
    pub fn set_auto_mode(&self, enabled: bool) {
        let mut auto_mode = self.auto_mode.lock();
        let (outgoing, incoming): (&dyn Controller, &dyn Controller) = if enabled {
            (&self.manual, &self.sensor)
        } else {
            (&self.sensor, &self.manual)
        };
        outgoing.set_enabled(false);
        self.model.set_auto_update_pointing(enabled);
        incoming.set_enabled(true);
        *auto_mode = enabled;
    }

    // === Time travel ===

    /// Ease into time travel at `date`. See [`use_real_time`](Self::use_real_time).
    pub fn go_time_travel(&self, date: Timestamp) {
        self.clock.go_time_travel(date);
    }

    pub fn use_real_time(&self) {
        self.clock.return_to_real_time();
    }

    /// Faster into the future, or slower into the past
    pub fn accelerate_time_travel(&self) {
        self.time_travel.accelerate();
    }

    /// Slower into the future, or faster into the past
    pub fn decelerate_time_travel(&self) {
        self.time_travel.decelerate();
    }

    pub fn pause_time(&self) {
        self.time_travel.pause();
    }

    pub fn current_speed_tag(&self) -> &'static str {
        self.time_travel.current_speed_tag()
    }

    pub fn clock_mode(&self) -> ClockMode {
        self.clock.mode()
    }

    /// Sky time for the time readout
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn time_readout(&self) -> String {
        self.now().to_rfc3339()
    }

    // === Gestures ===

    pub fn change_right_left(&self, radians: f64) {
        self.manual.change_right_left(radians);
    }

    pub fn change_up_down(&self, radians: f64) {
        self.manual.change_up_down(radians);
    }

    pub fn rotate(&self, degrees: f64) {
        self.manual.rotate(degrees);
    }

    pub fn teleport(&self, target: Vector3) {
        self.teleport.teleport(target);
    }

    pub fn zoom_by(&self, ratio: f64) {
        self.zoom.zoom_by(ratio);
    }

    // === Platform input ===

    pub fn on_sensor_event(&self, event: SensorEvent) {
        self.sensor.on_sensor_event(event);
    }

    pub fn on_location_changed(&self, fix: Option<LocationFix>) {
        self.location.on_location_changed(fix);
    }

    /// Returns true when the user should be asked to calibrate the compass
    pub fn on_compass_accuracy_changed(&self, accuracy: SensorAccuracy) -> bool {
        self.compass_monitor.on_accuracy_changed(accuracy)
    }

    pub fn on_compass_reading(&self, accuracy: SensorAccuracy) -> bool {
        self.compass_monitor.on_reading(accuracy)
    }

    pub fn location(&self) -> LatLong {
        self.location.current_location()
    }

    pub fn location_controller(&self) -> &LocationController {
        &self.location
    }
}

impl PreferenceListener for ControllerGroup {
    fn on_preference_changed(&self, preferences: &SkyPreferences, key: PreferenceKey) {
        match key {
            PreferenceKey::RotateHorizon => {
                self.model.set_horizontal_rotation(preferences.rotate_horizon);
            }
            PreferenceKey::AutoMode => self.set_auto_mode(preferences.auto_mode),
            _ => {}
        }
    }
}
