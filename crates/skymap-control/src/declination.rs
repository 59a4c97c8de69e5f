//! Magnetic declination calculators and the preference-driven switcher

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use skymap_core::{
    LatLong, PreferenceKey, PreferenceListener, PreferenceStore, SkyPreferences, Timestamp,
};
use tracing::info;

use crate::{AstronomerModel, GeomagneticField};

/// Angle between true and magnetic north.
///
/// The model hands over location and time whenever it rebuilds its local
/// frame, then reads the declination back.
pub trait MagneticDeclinationCalculator: Send + Sync + fmt::Debug {
    /// Degrees, east positive
    fn declination(&self) -> f64;

    fn set_location_and_time(&self, location: &LatLong, time: Timestamp);
}

/// Declination from the geomagnetic field model
#[derive(Debug, Default)]
pub struct RealMagneticDeclinationCalculator {
    field: Mutex<Option<GeomagneticField>>,
}

impl RealMagneticDeclinationCalculator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MagneticDeclinationCalculator for RealMagneticDeclinationCalculator {
    /// Zero until a location and time have been supplied
    fn declination(&self) -> f64 {
        self.field
            .lock()
            .as_ref()
            .map(GeomagneticField::declination)
            .unwrap_or(0.0)
    }

    fn set_location_and_time(&self, location: &LatLong, time: Timestamp) {
        *self.field.lock() = Some(GeomagneticField::new(location, time));
    }
}

/// No correction: magnetic north is treated as true north
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroMagneticDeclinationCalculator;

impl MagneticDeclinationCalculator for ZeroMagneticDeclinationCalculator {
    fn declination(&self) -> f64 {
        0.0
    }

    fn set_location_and_time(&self, _location: &LatLong, _time: Timestamp) {}
}

/// Installs the real or the zero calculator into the model according to
/// `use_magnetic_correction`, at construction and on every change.
pub struct MagneticDeclinationSwitcher {
    model: Arc<AstronomerModel>,
    real: Arc<dyn MagneticDeclinationCalculator>,
    zero: Arc<dyn MagneticDeclinationCalculator>,
}

impl MagneticDeclinationSwitcher {
    /// Create, install the current choice, and subscribe to `preferences`
    pub fn new(model: Arc<AstronomerModel>, preferences: &PreferenceStore) -> Arc<Self> {
        Self::with_calculators(
            model,
            preferences,
            Arc::new(RealMagneticDeclinationCalculator::new()),
            Arc::new(ZeroMagneticDeclinationCalculator),
        )
    }

    pub fn with_calculators(
        model: Arc<AstronomerModel>,
        preferences: &PreferenceStore,
        real: Arc<dyn MagneticDeclinationCalculator>,
        zero: Arc<dyn MagneticDeclinationCalculator>,
    ) -> Arc<Self> {
        let switcher = Arc::new(MagneticDeclinationSwitcher { model, real, zero });
        preferences.with(|p| switcher.install(p.use_magnetic_correction));
        preferences.register(&switcher);
        switcher
    }

    fn install(&self, use_real: bool) {
        let calculator = if use_real { &self.real } else { &self.zero };
        self.model.set_magnetic_declination_calculator(calculator.clone());
    }
}

impl PreferenceListener for MagneticDeclinationSwitcher {
    fn on_preference_changed(&self, preferences: &SkyPreferences, key: PreferenceKey) {
        if key == PreferenceKey::UseMagneticCorrection {
            info!(
                enabled = preferences.use_magnetic_correction,
                "Magnetic declination preference changed"
            );
            self.install(preferences.use_magnetic_correction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skymap_core::PreferenceChange;
    use skymap_time::ManualClock;

    /// 2024-01-01T00:00:00Z
    const JAN_2024: Timestamp = Timestamp(1_704_067_200_000);

    fn model_in_san_francisco() -> Arc<AstronomerModel> {
        let model = Arc::new(AstronomerModel::new(Arc::new(
            ZeroMagneticDeclinationCalculator,
        )));
        model.set_clock(Arc::new(ManualClock::new(JAN_2024)));
        model.set_location(LatLong::new(37.77, -122.42));
        model
    }

    #[test]
    fn test_real_calculator_is_zero_before_location() {
        let calculator = RealMagneticDeclinationCalculator::new();
        assert_eq!(calculator.declination(), 0.0);

        calculator.set_location_and_time(&LatLong::new(37.77, -122.42), JAN_2024);
        assert!(calculator.declination() > 5.0);
    }

    #[test]
    fn test_zero_calculator_ignores_location() {
        let calculator = ZeroMagneticDeclinationCalculator;
        calculator.set_location_and_time(&LatLong::new(37.77, -122.42), JAN_2024);
        assert_eq!(calculator.declination(), 0.0);
    }

    #[test]
    fn test_switcher_installs_from_current_preference() {
        let model = model_in_san_francisco();
        let store = PreferenceStore::default();
        let _switcher = MagneticDeclinationSwitcher::new(model.clone(), &store);
        assert!(model.magnetic_correction() > 5.0);

        let off = PreferenceStore::new(SkyPreferences {
            use_magnetic_correction: false,
            ..SkyPreferences::default()
        });
        let other = model_in_san_francisco();
        let _switcher = MagneticDeclinationSwitcher::new(other.clone(), &off);
        assert_eq!(other.magnetic_correction(), 0.0);
    }

    #[test]
    fn test_toggle_takes_effect_on_next_query() {
        let model = model_in_san_francisco();
        let store = PreferenceStore::default();
        let _switcher = MagneticDeclinationSwitcher::new(model.clone(), &store);
        assert_ne!(model.magnetic_correction(), 0.0);

        store.set(PreferenceChange::UseMagneticCorrection(false));
        assert_eq!(model.magnetic_correction(), 0.0);

        store.set(PreferenceChange::UseMagneticCorrection(true));
        assert_ne!(model.magnetic_correction(), 0.0);
    }

    #[test]
    fn test_unrelated_preference_is_ignored() {
        let model = model_in_san_francisco();
        let store = PreferenceStore::default();
        let _switcher = MagneticDeclinationSwitcher::new(model.clone(), &store);
        let before = model.magnetic_correction();

        store.set(PreferenceChange::RotateHorizon(true));
        assert_eq!(model.magnetic_correction(), before);
    }
}
