//! Field-of-view control

use std::sync::Arc;

use tracing::trace;

use crate::controller::EnabledFlag;
use crate::{AstronomerModel, Controller};

/// Narrowest field of view, degrees
pub const MIN_ZOOM: f64 = 1.5;

/// Widest field of view, degrees
pub const MAX_ZOOM: f64 = 90.0;

pub struct ZoomController {
    model: Arc<AstronomerModel>,
    enabled: EnabledFlag,
}

impl ZoomController {
    pub fn new(model: Arc<AstronomerModel>) -> Self {
        ZoomController {
            model,
            enabled: EnabledFlag::default(),
        }
    }

    /// Scale the field of view by `ratio`; below 1 zooms in
    pub fn zoom_by(&self, ratio: f64) {
        let degrees = (self.model.field_of_view() * ratio).clamp(MIN_ZOOM, MAX_ZOOM);
        if self.enabled.get() {
            trace!(degrees, "Zooming");
            self.model.set_field_of_view(degrees);
        }
    }
}

impl Controller for ZoomController {
    fn name(&self) -> &'static str {
        "zoom"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZeroMagneticDeclinationCalculator;

    fn zoom() -> (Arc<AstronomerModel>, ZoomController) {
        let model = Arc::new(AstronomerModel::new(Arc::new(ZeroMagneticDeclinationCalculator)));
        model.set_field_of_view(30.0);
        let controller = ZoomController::new(model.clone());
        (model, controller)
    }

    #[test]
    fn test_zoom_scales_field_of_view() {
        let (model, controller) = zoom();
        controller.zoom_by(0.5);
        assert_eq!(model.field_of_view(), 15.0);
    }

    #[test]
    fn test_zoom_out_too_far_clamps() {
        let (model, controller) = zoom();
        controller.zoom_by(1000.0);
        assert_eq!(model.field_of_view(), MAX_ZOOM);
    }

    #[test]
    fn test_zoom_in_too_far_clamps() {
        let (model, controller) = zoom();
        controller.zoom_by(0.001);
        assert_eq!(model.field_of_view(), MIN_ZOOM);
    }

    #[test]
    fn test_model_not_updated_when_disabled() {
        let (model, controller) = zoom();
        controller.set_enabled(false);
        controller.zoom_by(0.9);
        assert_eq!(model.field_of_view(), 30.0);
    }
}
