//! User preferences and change notification
//!
//! [`SkyPreferences`] is the plain record; [`PreferenceStore`] owns the live
//! copy and tells registered listeners about every change before `set`
//! returns, so whatever a listener installs is visible to the very next
//! time or pointing query.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SkyMapResult;

/// How hard the classic accelerometer/magnetometer readings are smoothed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDamping {
    #[default]
    Standard,
    High,
    ExtraHigh,
    ReallyHigh,
}

impl SensorDamping {
    /// Row in the damping tables
    pub fn index(self) -> usize {
        match self {
            SensorDamping::Standard => 0,
            SensorDamping::High => 1,
            SensorDamping::ExtraHigh => 2,
            SensorDamping::ReallyHigh => 3,
        }
    }
}

/// Requested sampling speed of the classic sensors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorSpeed {
    Slow,
    #[default]
    Standard,
    High,
}

/// Every recognised preference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyPreferences {
    /// Use the phone's long side as screen-up (landscape viewing)
    pub rotate_horizon: bool,
    /// Correct compass readings for magnetic declination
    pub use_magnetic_correction: bool,
    /// Ignore the fused rotation-vector sensor, use accelerometer + compass
    pub disable_gyro: bool,
    pub sensor_damping: SensorDamping,
    pub sensor_speed: SensorSpeed,
    /// Some devices report the magnetometer z axis with the opposite sign
    pub reverse_magnetic_z: bool,
    /// Sensor-driven pointing (true) or touch-driven (false)
    pub auto_mode: bool,
    /// Take the location from `latitude`/`longitude` instead of a provider
    pub no_auto_locate: bool,
    /// Ask the location provider for fine accuracy
    pub force_gps: bool,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for SkyPreferences {
    fn default() -> Self {
        SkyPreferences {
            rotate_horizon: false,
            use_magnetic_correction: true,
            disable_gyro: false,
            sensor_damping: SensorDamping::Standard,
            sensor_speed: SensorSpeed::Standard,
            reverse_magnetic_z: false,
            auto_mode: true,
            no_auto_locate: false,
            force_gps: false,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl SkyPreferences {
    /// Parse a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> SkyMapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SkyMapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn apply(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::RotateHorizon(v) => self.rotate_horizon = v,
            PreferenceChange::UseMagneticCorrection(v) => self.use_magnetic_correction = v,
            PreferenceChange::DisableGyro(v) => self.disable_gyro = v,
            PreferenceChange::SensorDamping(v) => self.sensor_damping = v,
            PreferenceChange::SensorSpeed(v) => self.sensor_speed = v,
            PreferenceChange::ReverseMagneticZ(v) => self.reverse_magnetic_z = v,
            PreferenceChange::AutoMode(v) => self.auto_mode = v,
            PreferenceChange::NoAutoLocate(v) => self.no_auto_locate = v,
            PreferenceChange::ForceGps(v) => self.force_gps = v,
            PreferenceChange::Latitude(v) => self.latitude = v,
            PreferenceChange::Longitude(v) => self.longitude = v,
        }
    }
}

/// Preference identifiers, matching the serialized field names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    RotateHorizon,
    UseMagneticCorrection,
    DisableGyro,
    SensorDamping,
    SensorSpeed,
    ReverseMagneticZ,
    AutoMode,
    NoAutoLocate,
    ForceGps,
    Latitude,
    Longitude,
}

impl PreferenceKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::RotateHorizon => "rotate_horizon",
            PreferenceKey::UseMagneticCorrection => "use_magnetic_correction",
            PreferenceKey::DisableGyro => "disable_gyro",
            PreferenceKey::SensorDamping => "sensor_damping",
            PreferenceKey::SensorSpeed => "sensor_speed",
            PreferenceKey::ReverseMagneticZ => "reverse_magnetic_z",
            PreferenceKey::AutoMode => "auto_mode",
            PreferenceKey::NoAutoLocate => "no_auto_locate",
            PreferenceKey::ForceGps => "force_gps",
            PreferenceKey::Latitude => "latitude",
            PreferenceKey::Longitude => "longitude",
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed edit
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PreferenceChange {
    RotateHorizon(bool),
    UseMagneticCorrection(bool),
    DisableGyro(bool),
    SensorDamping(SensorDamping),
    SensorSpeed(SensorSpeed),
    ReverseMagneticZ(bool),
    AutoMode(bool),
    NoAutoLocate(bool),
    ForceGps(bool),
    Latitude(f64),
    Longitude(f64),
}

impl PreferenceChange {
    pub fn key(&self) -> PreferenceKey {
        match self {
            PreferenceChange::RotateHorizon(_) => PreferenceKey::RotateHorizon,
            PreferenceChange::UseMagneticCorrection(_) => PreferenceKey::UseMagneticCorrection,
            PreferenceChange::DisableGyro(_) => PreferenceKey::DisableGyro,
            PreferenceChange::SensorDamping(_) => PreferenceKey::SensorDamping,
            PreferenceChange::SensorSpeed(_) => PreferenceKey::SensorSpeed,
            PreferenceChange::ReverseMagneticZ(_) => PreferenceKey::ReverseMagneticZ,
            PreferenceChange::AutoMode(_) => PreferenceKey::AutoMode,
            PreferenceChange::NoAutoLocate(_) => PreferenceKey::NoAutoLocate,
            PreferenceChange::ForceGps(_) => PreferenceKey::ForceGps,
            PreferenceChange::Latitude(_) => PreferenceKey::Latitude,
            PreferenceChange::Longitude(_) => PreferenceKey::Longitude,
        }
    }
}

/// Receives preference changes.
///
/// Called on the thread that made the change, with no value lock held, so a
/// listener may read the store again or make a further change.
pub trait PreferenceListener: Send + Sync {
    fn on_preference_changed(&self, preferences: &SkyPreferences, key: PreferenceKey);
}

/// Live preferences with synchronous, ordered change delivery
#[derive(Default)]
pub struct PreferenceStore {
    values: RwLock<SkyPreferences>,
    listeners: Mutex<Vec<Weak<dyn PreferenceListener>>>,
    /// Held across apply and delivery so concurrent changes reach listeners
    /// in the order they were applied. Reentrant for listeners that `set`.
    delivery: ReentrantMutex<()>,
}

impl PreferenceStore {
    pub fn new(preferences: SkyPreferences) -> Self {
        PreferenceStore {
            values: RwLock::new(preferences),
            listeners: Mutex::new(Vec::new()),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// Snapshot of the current values
    pub fn get(&self) -> SkyPreferences {
        self.values.read().clone()
    }

    /// Read a single value without cloning the whole record
    pub fn with<R>(&self, f: impl FnOnce(&SkyPreferences) -> R) -> R {
        f(&self.values.read())
    }

    /// Apply a change and notify listeners in registration order.
    ///
    /// Listeners are told even when the value did not change; they are
    /// expected to be idempotent. The last snapshot a listener sees always
    /// matches the stored values.
    pub fn set(&self, change: PreferenceChange) {
        let _delivery = self.delivery.lock();
        let key = change.key();
        let snapshot = {
            let mut values = self.values.write();
            values.apply(change);
            values.clone()
        };
        debug!(%key, "Preference changed");

        let listeners: Vec<Arc<dyn PreferenceListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_preference_changed(&snapshot, key);
        }
    }

    /// Register a listener. The store only keeps a weak reference; dropping
    /// the last `Arc` unregisters it.
    pub fn register<L: PreferenceListener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        self.listeners.lock().push(weak);
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("values", &*self.values.read())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Mutex<Vec<(PreferenceKey, bool)>>,
    }

    impl PreferenceListener for Recorder {
        fn on_preference_changed(&self, preferences: &SkyPreferences, key: PreferenceKey) {
            self.seen
                .lock()
                .push((key, preferences.use_magnetic_correction));
        }
    }

    #[test]
    fn test_defaults_from_partial_json() {
        let prefs =
            SkyPreferences::from_json(r#"{"sensor_damping": "extra_high", "latitude": 12.5}"#)
                .unwrap();
        assert_eq!(prefs.sensor_damping, SensorDamping::ExtraHigh);
        assert_eq!(prefs.latitude, 12.5);
        assert!(prefs.use_magnetic_correction);
        assert!(prefs.auto_mode);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let err = SkyPreferences::from_json(r#"{"sensor_speed": "ludicrous"}"#).unwrap_err();
        assert!(matches!(err, crate::SkyMapError::InvalidPreferences(_)));
    }

    #[test]
    fn test_listener_sees_change_synchronously() {
        let store = PreferenceStore::new(SkyPreferences::default());
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        store.register(&recorder);

        store.set(PreferenceChange::UseMagneticCorrection(false));
        assert_eq!(
            recorder.seen.lock().as_slice(),
            &[(PreferenceKey::UseMagneticCorrection, false)]
        );
        assert!(!store.get().use_magnetic_correction);
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let store = PreferenceStore::default();
        {
            let recorder = Arc::new(Recorder {
                seen: Mutex::new(Vec::new()),
            });
            store.register(&recorder);
            assert_eq!(store.listener_count(), 1);
        }
        store.set(PreferenceChange::RotateHorizon(true));
        assert_eq!(store.listener_count(), 0);
        assert!(store.with(|p| p.rotate_horizon));
    }

    #[test]
    fn test_concurrent_changes_are_delivered_in_apply_order() {
        let store = PreferenceStore::default();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        store.register(&recorder);

        std::thread::scope(|s| {
            for enabled in [true, false] {
                let store = &store;
                s.spawn(move || {
                    for _ in 0..500 {
                        store.set(PreferenceChange::UseMagneticCorrection(enabled));
                    }
                });
            }
        });

        let seen = recorder.seen.lock();
        assert_eq!(seen.len(), 1000);
        let last = seen.last().map(|(_, enabled)| *enabled);
        assert_eq!(last, Some(store.get().use_magnetic_correction));
    }

    struct Chained {
        store: Weak<PreferenceStore>,
    }

    impl PreferenceListener for Chained {
        fn on_preference_changed(&self, preferences: &SkyPreferences, key: PreferenceKey) {
            if key == PreferenceKey::RotateHorizon && preferences.rotate_horizon {
                if let Some(store) = self.store.upgrade() {
                    store.set(PreferenceChange::AutoMode(false));
                }
            }
        }
    }

    #[test]
    fn test_listener_may_make_a_further_change() {
        let store = Arc::new(PreferenceStore::default());
        let chained = Arc::new(Chained {
            store: Arc::downgrade(&store),
        });
        store.register(&chained);

        store.set(PreferenceChange::RotateHorizon(true));
        let prefs = store.get();
        assert!(prefs.rotate_horizon);
        assert!(!prefs.auto_mode);
    }

    #[test]
    fn test_damping_indices_are_distinct() {
        let all = [
            SensorDamping::Standard,
            SensorDamping::High,
            SensorDamping::ExtraHigh,
            SensorDamping::ReallyHigh,
        ];
        for (i, d) in all.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }
}
