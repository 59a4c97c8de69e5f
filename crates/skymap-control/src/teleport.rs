//! Jump the view to a target

use std::sync::Arc;

use skymap_core::{normalized_or_self, Vector3};
use tracing::debug;

use crate::controller::EnabledFlag;
use crate::{AstronomerModel, Controller};

pub struct TeleportingController {
    model: Arc<AstronomerModel>,
    enabled: EnabledFlag,
}

impl TeleportingController {
    pub fn new(model: Arc<AstronomerModel>) -> Self {
        TeleportingController {
            model,
            enabled: EnabledFlag::default(),
        }
    }

    /// Point the line of sight at `target` (a celestial unit vector).
    ///
    /// Screen-up at the target is not unique; it is chosen perpendicular to
    /// both the target and the current view's horizontal axis, or to the
    /// target alone when the target lies along that axis.
    pub fn teleport(&self, target: Vector3) {
        debug!(?target, "Teleporting to target");
        let pointing = self.model.pointing();
        let here = pointing.line_of_sight;
        if target == here {
            return;
        }
        let top = normalized_or_self(pointing.perpendicular);
        let normal = here.cross(&top);
        let new_up = normal
            .cross(&target)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| any_perpendicular(&target));
        self.model.set_pointing(target, new_up);
    }
}

/// A unit vector perpendicular to `v`
fn any_perpendicular(v: &Vector3) -> Vector3 {
    let axis = if v.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    normalized_or_self(v.cross(&axis))
}

impl Controller for TeleportingController {
    fn name(&self) -> &'static str {
        "teleport"
    }

    fn start(&self) {}

    fn stop(&self) {}

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(self.name(), enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}
