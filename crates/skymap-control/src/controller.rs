//! Controller lifecycle

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Something that drives the model from an input source
pub trait Controller: Send + Sync {
    fn name(&self) -> &'static str;

    /// Begin listening to the input source
    fn start(&self);

    /// Stop listening. Nothing is in flight, so this never blocks.
    fn stop(&self);

    /// A disabled controller keeps running but leaves the model alone
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;
}

/// Enabled flag shared by every controller; starts enabled
#[derive(Debug)]
pub(crate) struct EnabledFlag(AtomicBool);

impl Default for EnabledFlag {
    fn default() -> Self {
        EnabledFlag(AtomicBool::new(true))
    }
}

impl EnabledFlag {
    pub(crate) fn set(&self, name: &'static str, enabled: bool) {
        if enabled {
            debug!(controller = name, "Enabling controller");
        } else {
            debug!(controller = name, "Disabling controller");
        }
        self.0.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
