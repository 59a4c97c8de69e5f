//! Touch-driven pointing

use std::sync::Arc;

use skymap_core::{normalized_or_self, rotation_about};

use crate::controller::EnabledFlag;
use crate::{AstronomerModel, Controller};

/// Drags and twists the pointing in manual mode.
///
/// Angles are small-step approximations: exact only as they tend to zero,
/// which is how gestures deliver them.
pub struct ManualOrientationController {
    model: Arc<AstronomerModel>,
    enabled: EnabledFlag,
}

impl ManualOrientationController {
    pub fn new(model: Arc<AstronomerModel>) -> Self {
        ManualOrientationController {
            model,
            enabled: EnabledFlag::default(),
        }
    }

    /// Pan the line of sight sideways, keeping screen-up
    pub fn change_right_left(&self, radians: f64) {
        if !self.enabled.get() {
            return;
        }
        let pointing = self.model.pointing();
        let los = pointing.line_of_sight;
        let top = pointing.perpendicular;
        let horizontal = los.cross(&top);
        let new_los = normalized_or_self(los + horizontal * radians);
        self.model.set_pointing(new_los, top);
    }

    /// Tilt the line of sight along screen-up, carrying screen-up with it
    pub fn change_up_down(&self, radians: f64) {
        if !self.enabled.get() {
            return;
        }
        let pointing = self.model.pointing();
        let los = pointing.line_of_sight;
        let top = pointing.perpendicular;
        let new_los = normalized_or_self(los - top * radians);
        let new_top = normalized_or_self(top + los * radians);
        self.model.set_pointing(new_los, new_top);
    }

    /// Roll the view about the line of sight
    pub fn rotate(&self, degrees: f64) {
        if !self.enabled.get() {
            return;
        }
        let pointing = self.model.pointing();
        let los = pointing.line_of_sight;
        let new_top = normalized_or_self(rotation_about(&los, degrees) * pointing.perpendicular);
        self.model.set_pointing(los, new_top);
    }
}

impl Controller for ManualOrientationController {
    fn name(&self) -> &'static str {
        "manual orientation"
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
    use skymap_core::Vector3;

    fn manual() -> (Arc<AstronomerModel>, ManualOrientationController) {
        let model = Arc::new(AstronomerModel::new(Arc::new(ZeroMagneticDeclinationCalculator)));
        model.set_auto_update_pointing(false);
        model.set_pointing(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let controller = ManualOrientationController::new(model.clone());
        (model, controller)
    }

    #[test]
    fn test_right_left_pans_about_up() {
        let (model, controller) = manual();
        controller.change_right_left(0.01);
        let p = model.pointing();
        // x cross z = -y
        assert!(p.line_of_sight.y < 0.0);
        assert!((p.line_of_sight.norm() - 1.0).abs() < 1e-12);
        assert_eq!(p.perpendicular, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_up_down_keeps_frame_orthogonal() {
        let (model, controller) = manual();
        controller.change_up_down(0.01);
        let p = model.pointing();
        assert!(p.line_of_sight.z < 0.0);
        assert!(p.perpendicular.x > 0.0);
        assert!(p.line_of_sight.dot(&p.perpendicular).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_rolls_about_line_of_sight() {
        let (model, controller) = manual();
        controller.rotate(90.0);
        let p = model.pointing();
        assert_eq!(p.line_of_sight, Vector3::new(1.0, 0.0, 0.0));
        assert!(p.perpendicular.x.abs() < 1e-12);
        assert!((p.perpendicular.y.abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_controller_leaves_model_alone() {
        let (model, controller) = manual();
        let before = model.pointing();
        controller.set_enabled(false);
        controller.change_right_left(0.5);
        controller.change_up_down(0.5);
        controller.rotate(45.0);
        assert_eq!(model.pointing(), before);
    }
}
