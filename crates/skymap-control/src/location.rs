//! Observer location: from a location provider or from preferences

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skymap_core::{LatLong, PreferenceStore};
use tracing::{debug, error, info, warn};

use crate::controller::EnabledFlag;
use crate::{AstronomerModel, Controller};

/// Moves smaller than this (degrees) are not worth telling the user about
pub const MIN_DIST_TO_SHOW_DEGS: f64 = 0.01;

pub const LOCATION_UPDATE_INTERVAL: Duration = Duration::from_secs(600);

pub const MINIMUM_DISTANCE_BEFORE_UPDATE_METRES: f64 = 2000.0;

/// Provider name reported for a location typed in by the user
pub const PREFERENCES_PROVIDER: &str = "preferences";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocationAccuracy {
    Coarse,
    Fine,
}

/// A position fix from a named provider
#[derive(Clone, Debug, PartialEq)]
pub struct LocationFix {
    pub location: LatLong,
    pub provider: String,
}

/// Platform location services.
///
/// Fixes are delivered back through
/// [`LocationController::on_location_changed`].
pub trait LocationProvider: Send + Sync {
    /// Best provider for `accuracy`, optionally considering disabled ones
    fn best_provider(&self, accuracy: LocationAccuracy, enabled_only: bool) -> Option<String>;

    fn request_updates(&self, provider: &str, min_interval: Duration, min_distance_metres: f64);

    fn remove_updates(&self);

    fn last_known_location(&self, provider: &str) -> Option<LatLong>;
}

/// Where the model's location currently comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocationStatus {
    /// Not started yet
    Unknown,
    /// Set from preferences
    Manual,
    /// Waiting for or holding a provider fix
    Automatic,
    /// A provider exists but is switched off; the user should be offered to
    /// enable it
    ProviderDisabled,
}

#[derive(Debug)]
struct LocationState {
    provider: String,
    status: LocationStatus,
}

pub struct LocationController {
    model: Arc<AstronomerModel>,
    preferences: Arc<PreferenceStore>,
    provider: Option<Arc<dyn LocationProvider>>,
    state: Mutex<LocationState>,
    enabled: EnabledFlag,
}

impl LocationController {
    pub fn new(
        model: Arc<AstronomerModel>,
        preferences: Arc<PreferenceStore>,
        provider: Option<Arc<dyn LocationProvider>>,
    ) -> Self {
        if provider.is_some() {
            debug!("Got location provider");
        } else {
            debug!("Didn't get location provider");
        }
        LocationController {
            model,
            preferences,
            provider,
            state: Mutex::new(LocationState {
                provider: "unknown".to_string(),
                status: LocationStatus::Unknown,
            }),
            enabled: EnabledFlag::default(),
        }
    }

    /// Name of the provider behind the current location
    pub fn current_provider(&self) -> String {
        self.state.lock().provider.clone()
    }

    pub fn status(&self) -> LocationStatus {
        self.state.lock().status
    }

    pub fn current_location(&self) -> LatLong {
        self.model.location()
    }

    /// A fix arrived. Only one is needed, so updates are removed afterwards.
    /// `None` means the platform reported a change without a location.
    pub fn on_location_changed(&self, fix: Option<LocationFix>) {
        let Some(fix) = fix else {
            error!("Didn't get location even though a change was reported");
            self.set_location_from_preferences();
            return;
        };
        debug!(
            latitude = fix.location.latitude,
            longitude = fix.location.longitude,
            "Location changed"
        );
        self.set_location_in_model(fix.location, &fix.provider);
        if let Some(provider) = &self.provider {
            provider.remove_updates();
        }
    }

    /// Apply the user's choice of location instead of asking a provider
    pub fn set_location_from_preferences(&self) {
        debug!("Setting location from preferences");
        let (latitude, longitude) = self.preferences.with(|p| (p.latitude, p.longitude));
        let location = LatLong::checked(latitude, longitude).unwrap_or_else(|e| {
            error!(error = %e, "Error in latitude or longitude preference");
            LatLong::default()
        });
        self.set_location_in_model(location, PREFERENCES_PROVIDER);
        self.state.lock().status = LocationStatus::Manual;
    }

    /// Returns true if the move is large enough to tell the user about
    fn set_location_in_model(&self, location: LatLong, provider: &str) -> bool {
        let moved = location.distance_from(&self.model.location()) > MIN_DIST_TO_SHOW_DEGS;
        if moved {
            info!(
                provider,
                latitude = location.latitude,
                longitude = location.longitude,
                "Location set"
            );
        } else {
            debug!("Location not changed sufficiently to tell the user");
        }
        self.state.lock().provider = provider.to_string();
        self.model.set_location(location);
        moved
    }
}

impl Controller for LocationController {
    fn name(&self) -> &'static str {
        "location"
    }

    fn start(&self) {
        let (no_auto_locate, force_gps) =
            self.preferences.with(|p| (p.no_auto_locate, p.force_gps));
        if no_auto_locate {
            debug!("User has elected to set location manually");
            self.set_location_from_preferences();
            return;
        }
        let Some(provider) = &self.provider else {
            error!("No location provider - using preferences");
            self.set_location_from_preferences();
            return;
        };

        let accuracy = if force_gps {
            LocationAccuracy::Fine
        } else {
            LocationAccuracy::Coarse
        };
        let Some(name) = provider.best_provider(accuracy, true) else {
            warn!("No location provider is enabled");
            if provider.best_provider(accuracy, false).is_none() {
                info!("No location provider is even available");
                self.set_location_from_preferences();
            } else {
                self.state.lock().status = LocationStatus::ProviderDisabled;
            }
            return;
        };

        debug!(provider = %name, "Got location provider");
        self.state.lock().status = LocationStatus::Automatic;
        provider.request_updates(
            &name,
            LOCATION_UPDATE_INTERVAL,
            MINIMUM_DISTANCE_BEFORE_UPDATE_METRES,
        );
        if let Some(location) = provider.last_known_location(&name) {
            self.set_location_in_model(location, &name);
        }
    }

    fn stop(&self) {
        debug!("Location controller stop");
        if let Some(provider) = &self.provider {
            provider.remove_updates();
        }
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(self.name(), enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}
