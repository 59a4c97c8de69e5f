//! SkyMap Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout SkyMap:
//! - Timestamps and time constants
//! - Geographic and celestial coordinates
//! - Sidereal time and the observer's zenith
//! - User preferences and change notification
//! - The error type

pub mod time;
pub mod geo;
pub mod astro;
pub mod config;
pub mod error;

pub use time::*;
pub use geo::*;
pub use astro::*;
pub use config::*;
pub use error::*;
