//! SkyMap Control - turning device input into a view of the sky
//!
//! This crate implements:
//! - The astronomer model: line of sight and screen-up from sensors, time and place
//! - Magnetic declination (truncated WMM) with a preference-driven switcher
//! - Sensor smoothing and the adaptor that feeds smoothed readings to the model
//! - Controllers for sensors, touch gestures, zoom, teleport and location
//! - The controller group facade that wires them to the clocks

pub mod geomagnetic;
pub mod declination;
pub mod model;
pub mod sensor;
pub mod smoothing;
pub mod controller;
pub mod manual;
pub mod zoom;
pub mod teleport;
pub mod location;
pub mod orientation;
pub mod group;

pub use geomagnetic::*;
pub use declination::*;
pub use model::*;
pub use sensor::*;
pub use smoothing::*;
pub use controller::Controller;
pub use manual::*;
pub use zoom::*;
pub use teleport::*;
pub use location::*;
pub use orientation::*;
pub use group::*;
