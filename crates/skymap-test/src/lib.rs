//! SkyMap Test Harness - simulated devices driving the real pipeline
//!
//! This crate provides:
//! - A noisy simulated phone producing accelerometer, compass and rotation-vector events
//! - A frame-loop simulator that runs a `ControllerGroup` on a manual clock
//! - Canned scenarios and jitter statistics
//! - Log setup for test runs

pub mod device;
pub mod sky_simulator;

pub use device::*;
pub use sky_simulator::*;

use tracing_subscriber::{fmt, EnvFilter};

/// Install a log subscriber for tests and tools.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,skymap_time=info,skymap_control=info")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
